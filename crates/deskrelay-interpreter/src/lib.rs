//! Workflow interpretation: the visual step-graph executor and the
//! declarative hotkey/connector/template path (§4.2).

pub mod agent_callback;
pub mod declarative_engine;
pub mod excel;
pub mod llm;
pub mod template;
pub mod visual_executor;

pub use agent_callback::{AgentCallbackError, HttpWriteCoordsClient, WriteCoordsClient};
pub use declarative_engine::{DeclarativeError, WorkflowOutcome};
pub use excel::ExcelLookupError;
pub use llm::{LlmClient, LlmClientConfig, LlmError};
pub use visual_executor::{ExecutionStatus, StepError, WorkflowExecutionResult, WorkflowExecutor};
