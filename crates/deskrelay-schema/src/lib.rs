//! Shared data model for deskrelay: identifiers, workflow/connector/context
//! schemas, the variable environment, picker sessions, the audit entry
//! schema, and request/response validators.

pub mod audit;
pub mod connector_spec;
pub mod context;
pub mod ids;
pub mod picker;
pub mod validators;
pub mod variables;
pub mod workflow;
pub mod visual;

pub use audit::{AuditEntry, AuditStatus};
pub use connector_spec::{AuthClause, BackoffStrategy, ConnectorSpec, ConnectorType, RetryPolicy};
pub use context::Context;
pub use ids::{ConnectorName, IdError, SessionId, StepId, WorkflowId};
pub use picker::{Coordinates, PickerSession, PickerStatus};
pub use validators::{
    FieldWhitelistValidator, Icd10Validator, InputValidator, SecurityValidator, ValidationOutcome,
};
pub use variables::{VariableEnv, VariableValue};
pub use visual::{LlmFieldSpec, Step, VisualWorkflow};
pub use workflow::{
    ClickBefore, DeclarativeWorkflow, InputBinding, InputValidation, InsertMethod,
    InsertionInstruction, InsertionMode, InsertionType, OutputConfig, RequestSpec, ResponseSpec,
    SecuritySpec, ValidationSpec,
};
