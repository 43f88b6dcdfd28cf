//! The declarative workflow schema (§3, §4.2 "Declarative path").

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{ConnectorName, WorkflowId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputBinding {
    /// `selected_text` | `clipboard` | `active_field_text`.
    pub source: String,
    #[serde(default)]
    pub validation: Option<InputValidation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputValidation {
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSpec {
    pub template: String,
    #[serde(default = "RequestSpec::default_method")]
    pub method: String,
}

impl RequestSpec {
    fn default_method() -> String {
        "POST".to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSpec {
    /// output name -> JSONPath expression.
    pub mappings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSpec {
    #[serde(default)]
    pub required_fields: Vec<String>,
    #[serde(default)]
    pub icd10_format: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionMode {
    Replace,
    Append,
    Prepend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertionType {
    Text,
    Icd10,
}

impl Default for InsertionType {
    fn default() -> Self {
        InsertionType::Text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertMethod {
    Paste,
    Type,
}

impl Default for InsertMethod {
    fn default() -> Self {
        InsertMethod::Type
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub target_field: String,
    pub content: String,
    #[serde(default)]
    pub mode: InsertionMode,
    #[serde(rename = "type", default)]
    pub output_type: InsertionType,
    #[serde(default)]
    pub navigation: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub click_before: Option<ClickBefore>,
    #[serde(default)]
    pub insert_method: InsertMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickBefore {
    pub x: i32,
    pub y: i32,
}

impl Default for InsertionMode {
    fn default() -> Self {
        InsertionMode::Replace
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecuritySpec {
    #[serde(default)]
    pub allowed_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarativeWorkflow {
    pub workflow_id: WorkflowId,
    pub hotkey: String,
    #[serde(default = "DeclarativeWorkflow::default_enabled")]
    pub enabled: bool,
    pub input: InputBinding,
    pub connector: ConnectorName,
    pub request: RequestSpec,
    pub response: ResponseSpec,
    #[serde(default)]
    pub validation: Option<ValidationSpec>,
    pub output: Vec<OutputConfig>,
    #[serde(default)]
    pub security: Option<SecuritySpec>,
}

impl DeclarativeWorkflow {
    fn default_enabled() -> bool {
        true
    }

    /// Hotkey comparison is case- and whitespace-insensitive (§8).
    pub fn normalized_hotkey(&self) -> String {
        normalize_hotkey(&self.hotkey)
    }
}

pub fn normalize_hotkey(hotkey: &str) -> String {
    hotkey.to_uppercase().replace(' ', "")
}

/// Result of an insertion instruction/output being checked against a
/// workflow's field whitelist and ICD-10 format requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertionInstruction {
    pub target_field: String,
    pub content: String,
    pub mode: InsertionMode,
    #[serde(rename = "type")]
    pub insertion_type: InsertionType,
    pub navigation: Option<String>,
    pub label: Option<String>,
    pub click_before: Option<ClickBefore>,
    pub insert_method: InsertMethod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_hotkey("ctrl+alt+v"), "CTRL+ALT+V");
        assert_eq!(normalize_hotkey("CTRL + ALT + V"), "CTRL+ALT+V");
        assert_eq!(normalize_hotkey("CTRL+ALT+V"), normalize_hotkey("ctrl + alt + v"));
    }

    #[test]
    fn deserializes_full_declarative_workflow() {
        let yaml = r#"
workflow_id: voice_summary_icd10
hotkey: "CTRL+ALT+V"
input:
  source: selected_text
  validation:
    min_length: 1
    max_length: 5000
connector: voice_ai
request:
  template: '{"text": "{input_text}"}'
response:
  mappings:
    summary: "$.summary"
    icd10_code: "$.icd10.code"
    icd10_label: "$.icd10.label"
validation:
  required_fields: ["summary", "icd10_code"]
  icd10_format: true
output:
  - target_field: DiagnosisText
    content: "{summary}"
    mode: replace
  - target_field: DiagnosisCode
    content: "{icd10_code}"
    mode: replace
    type: icd10
    label: "{icd10_label}"
security:
  allowed_fields: ["DiagnosisText", "DiagnosisCode"]
"#;
        let wf: DeclarativeWorkflow = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(wf.workflow_id.as_str(), "voice_summary_icd10");
        assert_eq!(wf.output.len(), 2);
        assert_eq!(wf.output[1].output_type, InsertionType::Icd10);
        assert!(wf.enabled);
    }
}
