//! The visual-workflow step interpreter (§4.2 "Step kinds and contracts").

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use deskrelay_desktop::{DesktopIo, Rect};
use deskrelay_schema::{StepId, Step, VariableEnv, VariableValue, VisualWorkflow};
use thiserror::Error;

use crate::agent_callback::WriteCoordsClient;
use crate::excel::{self, ExcelLookupError};
use crate::llm::LlmClient;
use crate::template;

#[derive(Debug, Error)]
pub enum StepError {
    #[error("OCR produced no text")]
    NoTextFound,
    #[error("no digit run found in OCR text")]
    NoNumbersFound,
    #[error(transparent)]
    Excel(#[from] ExcelLookupError),
    #[error("step kind is not implemented")]
    NotImplemented,
    #[error("no transcription available; interpreter does not own the microphone")]
    NoTranscriptionAvailable,
    #[error("cannot connect to agent API. Is agent running?")]
    AgentUnreachable,
    #[error("agent API timeout")]
    AgentTimeout,
    #[error("agent error: {0}")]
    AgentError(String),
    #[error("LLM call failed: {0}")]
    Llm(String),
    #[error("desktop I/O error: {0}")]
    Desktop(String),
}

impl From<crate::agent_callback::AgentCallbackError> for StepError {
    fn from(e: crate::agent_callback::AgentCallbackError) -> Self {
        use crate::agent_callback::AgentCallbackError as E;
        match e {
            E::AgentUnreachable => StepError::AgentUnreachable,
            E::AgentTimeout => StepError::AgentTimeout,
            E::AgentError(msg) => StepError::AgentError(msg),
        }
    }
}

#[derive(Debug)]
pub struct WorkflowExecutionResult {
    pub status: ExecutionStatus,
    pub variables: VariableEnv,
    pub execution_time_ms: u64,
}

#[derive(Debug)]
pub enum ExecutionStatus {
    Success,
    Error { step_id: StepId, error: String },
}

pub struct WorkflowExecutor {
    desktop: Arc<dyn DesktopIo>,
    llm: Arc<LlmClient>,
    agent: Arc<dyn WriteCoordsClient>,
}

impl WorkflowExecutor {
    pub fn new(
        desktop: Arc<dyn DesktopIo>,
        llm: Arc<LlmClient>,
        agent: Arc<dyn WriteCoordsClient>,
    ) -> Self {
        Self { desktop, llm, agent }
    }

    /// Runs every enabled step in order, short-circuiting on the first
    /// error. Always releases modifier keys on the way out (§4.2
    /// "Post-execution").
    pub async fn execute(
        &self,
        workflow: &VisualWorkflow,
        initial_variables: BTreeMap<String, String>,
    ) -> WorkflowExecutionResult {
        let start = Instant::now();
        let mut env = VariableEnv::from_initial(initial_variables);

        let mut status = ExecutionStatus::Success;
        for step in workflow.steps.iter().filter(|s| s.enabled()) {
            match self.execute_step(step, &mut env).await {
                Ok(()) => {}
                Err(e) => {
                    status = ExecutionStatus::Error {
                        step_id: step.id().clone(),
                        error: e.to_string(),
                    };
                    break;
                }
            }
        }

        let _ = self.desktop.release_modifiers().await;

        WorkflowExecutionResult {
            status,
            variables: env,
            execution_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn execute_step(&self, step: &Step, env: &mut VariableEnv) -> Result<(), StepError> {
        match step {
            Step::ReadCoords {
                x,
                y,
                width,
                height,
                output_variable,
                extract_numbers,
                ..
            } => {
                let image = self
                    .desktop
                    .screenshot(Rect {
                        x: *x,
                        y: *y,
                        width: *width,
                        height: *height,
                    })
                    .await
                    .map_err(|e| StepError::Desktop(e.to_string()))?;
                let text = self
                    .desktop
                    .ocr(&image)
                    .await
                    .map_err(|e| StepError::Desktop(e.to_string()))?;
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(StepError::NoTextFound);
                }
                let value = if *extract_numbers {
                    extract_first_digit_run(trimmed).ok_or(StepError::NoNumbersFound)?
                } else {
                    trimmed.to_string()
                };
                env.set(output_variable, VariableValue::Scalar(value));
                Ok(())
            }

            Step::LookupExcel {
                file_path,
                sheet_name,
                search_column,
                search_value_variable,
                return_columns,
                output_variable,
                ..
            } => {
                let search_value = env.resolve_path(search_value_variable).unwrap_or_default();
                let row = excel::lookup(
                    file_path,
                    sheet_name.as_deref(),
                    search_column,
                    &search_value,
                    return_columns,
                )?;
                env.set(output_variable, VariableValue::Mapping(row));
                Ok(())
            }

            Step::LookupDb { .. } | Step::LookupApi { .. } => Err(StepError::NotImplemented),

            Step::FormatWithLlm {
                input_variable,
                fields,
                output_variable,
                ..
            } => {
                let input = match env.get(input_variable) {
                    Some(VariableValue::Mapping(m)) => m.clone(),
                    Some(VariableValue::Scalar(s)) => {
                        let mut m = BTreeMap::new();
                        m.insert(input_variable.clone(), s.clone());
                        m
                    }
                    None => BTreeMap::new(),
                };
                let formatted = self
                    .llm
                    .format(&input, fields)
                    .await
                    .map_err(|e| StepError::Llm(e.to_string()))?;
                env.set(output_variable, VariableValue::Mapping(formatted));
                Ok(())
            }

            Step::WriteCoords {
                x,
                y,
                content_template,
                insert_method,
                key_sequence,
                ..
            } => {
                let content = template::render(content_template, env);
                self.agent
                    .write_coords(*x, *y, &content, *insert_method, key_sequence)
                    .await?;
                Ok(())
            }

            Step::TranscribeAudio { output_variable, .. } => {
                let transcription = env
                    .resolve_path("transcription")
                    .ok_or(StepError::NoTranscriptionAvailable)?;
                env.set(output_variable, VariableValue::Scalar(transcription));
                Ok(())
            }

            Step::RecordAudio { output_variable, .. } => {
                env.set(
                    output_variable,
                    VariableValue::Scalar("audio_recorded".to_string()),
                );
                Ok(())
            }
        }
    }
}

fn extract_first_digit_run(text: &str) -> Option<String> {
    let mut run = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            run.push(c);
            while let Some(&next) = chars.peek() {
                if next.is_ascii_digit() {
                    run.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            return Some(run);
        }
    }
    None
}
