//! Shared server state: everything bound to the process, with the
//! workflow/connector catalogs loaded once at startup and read-only after
//! (§4.3 "State lifecycle").

use std::sync::Arc;
use std::time::Instant;

use deskrelay_audit::AuditLogger;
use deskrelay_connector::ConnectorRegistry;
use deskrelay_desktop::DesktopIo;
use deskrelay_interpreter::{LlmClient, WorkflowExecutor, WriteCoordsClient};
use deskrelay_schema::DeclarativeWorkflow;

use crate::agent_supervisor::AgentSupervisor;
use crate::auth::{AsAuthState, AuthState};
use crate::picker_state::PickerRegistry;
use crate::store::VisualWorkflowStore;

#[derive(Clone)]
pub struct AppState(Arc<Inner>);

pub struct Inner {
    pub auth: AuthState,
    pub connectors: ConnectorRegistry,
    pub declarative_workflows: Vec<DeclarativeWorkflow>,
    pub icd10_catalog: std::collections::BTreeMap<String, String>,
    pub visual_workflows: VisualWorkflowStore,
    pub audit: AuditLogger,
    pub agent: AgentSupervisor,
    pub picker: PickerRegistry,
    pub executor: WorkflowExecutor,
    pub started_at: Instant,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        auth: AuthState,
        connectors: ConnectorRegistry,
        declarative_workflows: Vec<DeclarativeWorkflow>,
        icd10_catalog: std::collections::BTreeMap<String, String>,
        visual_workflows: VisualWorkflowStore,
        audit: AuditLogger,
        agent: AgentSupervisor,
        picker: PickerRegistry,
        desktop: Arc<dyn DesktopIo>,
        llm: Arc<LlmClient>,
        agent_client: Arc<dyn WriteCoordsClient>,
    ) -> Self {
        Self(Arc::new(Inner {
            auth,
            connectors,
            declarative_workflows,
            icd10_catalog,
            visual_workflows,
            audit,
            agent,
            picker,
            executor: WorkflowExecutor::new(desktop, llm, agent_client),
            started_at: Instant::now(),
        }))
    }
}

impl std::ops::Deref for AppState {
    type Target = Inner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsAuthState for AppState {
    fn auth_state(&self) -> &AuthState {
        &self.0.auth
    }
}
