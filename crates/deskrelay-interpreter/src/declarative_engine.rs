//! The declarative workflow path (§4.2 "Declarative path"): hotkey match,
//! input validation, templated connector call, JSONPath extraction, response
//! validation, and output instruction building. Mirrors the source workflow
//! engine's `execute()` flow.

use std::collections::BTreeMap;

use deskrelay_connector::{response_extractor, ConnectorError, ConnectorRegistry};
use deskrelay_schema::{
    Context, DeclarativeWorkflow, FieldWhitelistValidator, Icd10Validator, InputValidator,
    InsertionInstruction, InsertionType, SecurityValidator, VariableEnv, VariableValue,
};
use thiserror::Error;

use crate::template;

/// Ceiling for a connector response body before it is rejected outright,
/// ahead of any field extraction (§4.2 "Validators" — `SecurityValidator`).
const MAX_RESPONSE_BYTES: usize = 1_048_576;

#[derive(Debug, Error)]
pub enum DeclarativeError {
    #[error("input validation failed: {0}")]
    InputInvalid(String),
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error("response extraction failed: {0}")]
    Extraction(String),
    #[error("response validation failed: {0}")]
    ResponseInvalid(String),
    #[error("response rejected by security validation: {0}")]
    SecurityRejected(String),
    #[error("output field {0:?} is not in the allowed field whitelist")]
    FieldNotAllowed(String),
}

impl DeclarativeError {
    pub fn code(&self) -> &'static str {
        match self {
            DeclarativeError::InputInvalid(_) => "INPUT_INVALID",
            DeclarativeError::Connector(e) => e.code(),
            DeclarativeError::Extraction(_) => "EXTRACTION_ERROR",
            DeclarativeError::ResponseInvalid(_) => "RESPONSE_INVALID",
            DeclarativeError::SecurityRejected(_) => "SECURITY_REJECTED",
            DeclarativeError::FieldNotAllowed(_) => "FIELD_NOT_ALLOWED",
        }
    }
}

pub struct WorkflowOutcome {
    pub instructions: Vec<InsertionInstruction>,
}

/// Finds the enabled workflow whose hotkey matches, case- and
/// whitespace-insensitively (§8).
pub fn match_hotkey<'a>(
    workflows: &'a [DeclarativeWorkflow],
    hotkey: &str,
) -> Option<&'a DeclarativeWorkflow> {
    let normalized = deskrelay_schema::workflow::normalize_hotkey(hotkey);
    workflows
        .iter()
        .find(|w| w.enabled && w.normalized_hotkey() == normalized)
}

pub async fn execute(
    workflow: &DeclarativeWorkflow,
    context: &Context,
    registry: &ConnectorRegistry,
    icd10_catalog: &BTreeMap<String, String>,
) -> Result<WorkflowOutcome, DeclarativeError> {
    let input_text = context.resolve_input_source(&workflow.input.source);
    if let Some(validation) = &workflow.input.validation {
        let outcome = InputValidator::validate_text_length(
            &input_text,
            validation.min_length,
            validation.max_length,
        );
        if !outcome.valid {
            return Err(DeclarativeError::InputInvalid(
                outcome.error.unwrap_or_default(),
            ));
        }
    }

    let mut request_env = VariableEnv::new();
    request_env.set("input_text", VariableValue::Scalar(input_text));
    let rendered = template::render(&workflow.request.template, &request_env);
    let payload: serde_json::Value = serde_json::from_str(&rendered)
        .unwrap_or_else(|_| serde_json::Value::String(rendered));

    let connector = registry.get(workflow.connector.as_str())?;
    let endpoint = connector.first_endpoint().unwrap_or_default().to_string();
    let response = connector
        .execute(&endpoint, &payload, &workflow.request.method)
        .await?;

    let security = SecurityValidator::default();
    let outcome = security.validate_response_size(&response.to_string(), MAX_RESPONSE_BYTES);
    if !outcome.valid {
        return Err(DeclarativeError::SecurityRejected(
            outcome.error.unwrap_or_default(),
        ));
    }

    let extracted = response_extractor::extract(&response, &workflow.response.mappings)
        .map_err(|e| DeclarativeError::Extraction(e.to_string()))?;

    for value in extracted.values() {
        let outcome = security.validate_no_script_injection(&scalar_to_string(value));
        if !outcome.valid {
            return Err(DeclarativeError::SecurityRejected(
                outcome.error.unwrap_or_default(),
            ));
        }
    }

    if let Some(validation) = &workflow.validation {
        let outcome = InputValidator::validate_required_fields(&extracted, &validation.required_fields);
        if !outcome.valid {
            return Err(DeclarativeError::ResponseInvalid(
                outcome.error.unwrap_or_default(),
            ));
        }
        if validation.icd10_format {
            let icd10_validator = Icd10Validator::new(icd10_catalog.clone());
            for output in &workflow.output {
                if output.output_type == InsertionType::Icd10 {
                    if let Some(code) = extracted_scalar(&extracted, &output.content) {
                        let outcome = icd10_validator.validate_format(&code);
                        if !outcome.valid {
                            return Err(DeclarativeError::ResponseInvalid(
                                outcome.error.unwrap_or_default(),
                            ));
                        }
                        if !icd10_catalog.is_empty() {
                            let outcome = icd10_validator.validate_exists(&code);
                            if !outcome.valid {
                                return Err(DeclarativeError::ResponseInvalid(
                                    outcome.error.unwrap_or_default(),
                                ));
                            }
                        }
                    }
                }
            }
        }
    }

    let whitelist = workflow
        .security
        .as_ref()
        .map(|s| FieldWhitelistValidator::new(&s.allowed_fields));

    let mut output_env = VariableEnv::new();
    for (name, value) in &extracted {
        output_env.set(name.clone(), VariableValue::Scalar(scalar_to_string(value)));
    }

    let mut instructions = Vec::with_capacity(workflow.output.len());
    for output in &workflow.output {
        if let Some(validator) = &whitelist {
            let outcome = validator.validate(&output.target_field);
            if !outcome.valid {
                return Err(DeclarativeError::FieldNotAllowed(
                    output.target_field.clone(),
                ));
            }
        }
        instructions.push(InsertionInstruction {
            target_field: output.target_field.clone(),
            content: template::render(&output.content, &output_env),
            mode: output.mode,
            insertion_type: output.output_type,
            navigation: output.navigation.clone(),
            label: output
                .label
                .as_ref()
                .map(|l| template::render(l, &output_env)),
            click_before: output.click_before.clone(),
            insert_method: output.insert_method,
        });
    }

    Ok(WorkflowOutcome { instructions })
}

/// Best-effort resolution of a `{name}`-style content template against the
/// extracted field map, for the ICD-10 format check which runs before output
/// templates are rendered against a full `VariableEnv`.
fn extracted_scalar(extracted: &BTreeMap<String, serde_json::Value>, template: &str) -> Option<String> {
    let name = template.trim_start_matches('{').trim_end_matches('}');
    extracted.get(name).map(scalar_to_string)
}

fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskrelay_schema::{InputBinding, RequestSpec, ResponseSpec, WorkflowId};

    fn workflow(hotkey: &str) -> DeclarativeWorkflow {
        DeclarativeWorkflow {
            workflow_id: WorkflowId::new("wf").unwrap(),
            hotkey: hotkey.to_string(),
            enabled: true,
            input: InputBinding {
                source: "selected_text".to_string(),
                validation: None,
            },
            connector: deskrelay_schema::ConnectorName::new("voice_ai").unwrap(),
            request: RequestSpec {
                template: "{\"text\": \"{input_text}\"}".to_string(),
                method: "POST".to_string(),
            },
            response: ResponseSpec {
                mappings: BTreeMap::new(),
            },
            validation: None,
            output: vec![],
            security: None,
        }
    }

    #[test]
    fn matches_hotkey_case_and_whitespace_insensitively() {
        let workflows = vec![workflow("CTRL+ALT+V")];
        assert!(match_hotkey(&workflows, "ctrl + alt + v").is_some());
        assert!(match_hotkey(&workflows, "ctrl+alt+x").is_none());
    }

    #[test]
    fn disabled_workflow_never_matches() {
        let mut wf = workflow("CTRL+ALT+V");
        wf.enabled = false;
        let workflows = vec![wf];
        assert!(match_hotkey(&workflows, "CTRL+ALT+V").is_none());
    }
}
