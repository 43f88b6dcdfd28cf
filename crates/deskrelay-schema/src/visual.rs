//! The visual workflow schema: an ordered list of heterogeneous steps,
//! modeled as a tagged union on `step_type` (§3, §4.2, §9 "Dynamic typing").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{StepId, WorkflowId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step_type", rename_all = "snake_case")]
pub enum Step {
    ReadCoords {
        id: StepId,
        #[serde(default = "Step::default_enabled")]
        enabled: bool,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        output_variable: String,
        #[serde(default)]
        extract_numbers: bool,
    },
    LookupExcel {
        id: StepId,
        #[serde(default = "Step::default_enabled")]
        enabled: bool,
        file_path: String,
        #[serde(default)]
        sheet_name: Option<String>,
        search_column: String,
        search_value_variable: String,
        return_columns: Vec<String>,
        output_variable: String,
    },
    /// Reserved: schema keeps this variant so configs referencing it still
    /// load; the interpreter rejects it with `NotImplemented` at run time.
    LookupDb {
        id: StepId,
        #[serde(default = "Step::default_enabled")]
        enabled: bool,
        #[serde(default)]
        output_variable: Option<String>,
    },
    /// Reserved, see `LookupDb`.
    LookupApi {
        id: StepId,
        #[serde(default = "Step::default_enabled")]
        enabled: bool,
        #[serde(default)]
        output_variable: Option<String>,
    },
    FormatWithLlm {
        id: StepId,
        #[serde(default = "Step::default_enabled")]
        enabled: bool,
        input_variable: String,
        fields: Vec<LlmFieldSpec>,
        output_variable: String,
    },
    WriteCoords {
        id: StepId,
        #[serde(default = "Step::default_enabled")]
        enabled: bool,
        x: i32,
        y: i32,
        content_template: String,
        #[serde(default)]
        insert_method: crate::workflow::InsertMethod,
        #[serde(default)]
        key_sequence: Vec<String>,
    },
    TranscribeAudio {
        id: StepId,
        #[serde(default = "Step::default_enabled")]
        enabled: bool,
        output_variable: String,
    },
    RecordAudio {
        id: StepId,
        #[serde(default = "Step::default_enabled")]
        enabled: bool,
        output_variable: String,
    },
}

impl Step {
    fn default_enabled() -> bool {
        true
    }

    pub fn id(&self) -> &StepId {
        match self {
            Step::ReadCoords { id, .. }
            | Step::LookupExcel { id, .. }
            | Step::LookupDb { id, .. }
            | Step::LookupApi { id, .. }
            | Step::FormatWithLlm { id, .. }
            | Step::WriteCoords { id, .. }
            | Step::TranscribeAudio { id, .. }
            | Step::RecordAudio { id, .. } => id,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            Step::ReadCoords { enabled, .. }
            | Step::LookupExcel { enabled, .. }
            | Step::LookupDb { enabled, .. }
            | Step::LookupApi { enabled, .. }
            | Step::FormatWithLlm { enabled, .. }
            | Step::WriteCoords { enabled, .. }
            | Step::TranscribeAudio { enabled, .. }
            | Step::RecordAudio { enabled, .. } => *enabled,
        }
    }

    /// Variable names this step reads before it runs — used to validate the
    /// "written by an earlier enabled step, or an initial variable" invariant.
    pub fn reads(&self) -> Vec<&str> {
        match self {
            Step::LookupExcel {
                search_value_variable,
                ..
            } => vec![search_value_variable.as_str()],
            Step::FormatWithLlm { input_variable, .. } => vec![input_variable.as_str()],
            _ => vec![],
        }
    }

    /// Variable name this step writes, if any.
    pub fn writes(&self) -> Option<&str> {
        match self {
            Step::ReadCoords { output_variable, .. }
            | Step::LookupExcel { output_variable, .. }
            | Step::FormatWithLlm { output_variable, .. }
            | Step::TranscribeAudio { output_variable, .. }
            | Step::RecordAudio { output_variable, .. } => Some(output_variable.as_str()),
            Step::LookupDb { output_variable, .. } | Step::LookupApi { output_variable, .. } => {
                output_variable.as_deref()
            }
            Step::WriteCoords { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmFieldSpec {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualWorkflow {
    pub id: WorkflowId,
    #[serde(default)]
    pub hotkey: Option<String>,
    #[serde(default = "VisualWorkflow::default_enabled")]
    pub enabled: bool,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl VisualWorkflow {
    fn default_enabled() -> bool {
        true
    }

    /// §3 invariant: every step's read variables must be satisfied by an
    /// earlier enabled step's write, or by `initial_variables`.
    pub fn validate_variable_ordering(
        &self,
        initial_variables: &[String],
    ) -> Result<(), String> {
        let mut available: Vec<&str> = initial_variables.iter().map(String::as_str).collect();
        for step in self.steps.iter().filter(|s| s.enabled()) {
            for read in step.reads() {
                if !available.contains(&read) {
                    return Err(format!(
                        "step {} reads undefined variable {read:?}",
                        step.id()
                    ));
                }
            }
            if let Some(write) = step.writes() {
                available.push(write);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wf(steps: Vec<Step>) -> VisualWorkflow {
        VisualWorkflow {
            id: WorkflowId::new("wf1").unwrap(),
            hotkey: None,
            enabled: true,
            steps,
            updated_at: None,
        }
    }

    #[test]
    fn deserializes_by_step_type_tag() {
        let json = r#"{"step_type":"read_coords","id":"s1","x":100,"y":200,"width":50,"height":20,"output_variable":"patient_id","extract_numbers":true}"#;
        let step: Step = serde_json::from_str(json).unwrap();
        assert!(matches!(step, Step::ReadCoords { .. }));
        assert_eq!(step.id().as_str(), "s1");
        assert_eq!(step.writes(), Some("patient_id"));
    }

    #[test]
    fn variable_ordering_passes_when_chained_correctly() {
        let workflow = wf(vec![
            Step::ReadCoords {
                id: StepId::new("s1").unwrap(),
                enabled: true,
                x: 0,
                y: 0,
                width: 1,
                height: 1,
                output_variable: "patient_id".into(),
                extract_numbers: true,
            },
            Step::LookupExcel {
                id: StepId::new("s2").unwrap(),
                enabled: true,
                file_path: "patients.xlsx".into(),
                sheet_name: None,
                search_column: "ID".into(),
                search_value_variable: "patient_id".into(),
                return_columns: vec!["Name".into()],
                output_variable: "data".into(),
            },
        ]);
        assert!(workflow.validate_variable_ordering(&[]).is_ok());
    }

    #[test]
    fn variable_ordering_fails_on_forward_reference() {
        let workflow = wf(vec![Step::LookupExcel {
            id: StepId::new("s2").unwrap(),
            enabled: true,
            file_path: "patients.xlsx".into(),
            sheet_name: None,
            search_column: "ID".into(),
            search_value_variable: "patient_id".into(),
            return_columns: vec!["Name".into()],
            output_variable: "data".into(),
        }]);
        assert!(workflow.validate_variable_ordering(&[]).is_err());
    }

    #[test]
    fn initial_variables_satisfy_reads() {
        let workflow = wf(vec![Step::LookupExcel {
            id: StepId::new("s2").unwrap(),
            enabled: true,
            file_path: "patients.xlsx".into(),
            sheet_name: None,
            search_column: "ID".into(),
            search_value_variable: "patient_id".into(),
            return_columns: vec!["Name".into()],
            output_variable: "data".into(),
        }]);
        assert!(workflow
            .validate_variable_ordering(&["patient_id".to_string()])
            .is_ok());
    }

    #[test]
    fn unknown_step_type_is_rejected() {
        let json = r#"{"step_type":"teleport","id":"s1"}"#;
        let result: Result<Step, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
