//! Orchestration server entry point: loads configuration and catalogs,
//! wires up state, and serves the HTTP API (§4.3, §6).

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use deskrelay_audit::AuditLogger;
use deskrelay_connector::ConnectorRegistry;
use deskrelay_desktop::real::RealDesktopIo;
use deskrelay_desktop::DesktopIo;
use deskrelay_interpreter::{HttpWriteCoordsClient, LlmClient, LlmClientConfig, WriteCoordsClient};
use deskrelay_schema::{ConnectorSpec, DeclarativeWorkflow};
use tracing_subscriber::EnvFilter;

use deskrelay_server::agent_supervisor::AgentSupervisor;
use deskrelay_server::auth::AuthState;
use deskrelay_server::picker_state::PickerRegistry;
use deskrelay_server::state::AppState;
use deskrelay_server::store::VisualWorkflowStore;
use deskrelay_server::{config, routes, security};

#[derive(Debug, Parser)]
#[command(name = "deskrelay-server", about = "Clinical-chart desktop orchestration server")]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,

    /// Callback base URL the server reaches the agent dispatcher at.
    #[arg(long, default_value = "http://127.0.0.1:8788")]
    agent_callback_url: String,

    #[arg(long, env = "DESKRELAY_AUTH_TOKEN")]
    auth_token: String,

    #[arg(long, env = "DESKRELAY_LLM_CHAT_URL", default_value = "https://api.openai.com/v1/chat/completions")]
    llm_chat_url: String,

    #[arg(long, env = "DESKRELAY_LLM_MODEL", default_value = "gpt-4o-mini")]
    llm_model: String,

    #[arg(long, env = "DESKRELAY_LLM_API_KEY_ENV", default_value = "OPENAI_API_KEY")]
    llm_api_key_env_var: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = config::load(cli.config.as_deref())?;

    let connectors = load_connector_catalog(&settings.connector_catalog_path)?;
    let declarative_workflows = load_workflow_catalog(&settings.workflow_catalog_path)?;
    let icd10_catalog = load_icd10_catalog(settings.icd10_catalog_path.as_deref())?;

    let auth = AuthState::new(
        cli.auth_token,
        settings.rate_limit_per_minute,
        settings.rate_limit_burst,
    );
    let visual_workflows = VisualWorkflowStore::open(&settings.visual_workflow_store_path).await?;
    let audit = AuditLogger::open(&settings.audit_log_path).await?;
    let agent_supervisor = AgentSupervisor::new(settings.agent_binary_path.clone());
    let picker = PickerRegistry::default();

    let desktop: Arc<dyn DesktopIo> = Arc::new(RealDesktopIo::new()?);
    let llm = Arc::new(LlmClient::new(LlmClientConfig {
        chat_url: cli.llm_chat_url,
        model: cli.llm_model,
        api_key_env_var: cli.llm_api_key_env_var,
    }));
    let agent_client: Arc<dyn WriteCoordsClient> =
        Arc::new(HttpWriteCoordsClient::new(cli.agent_callback_url));

    let app_state = AppState::new(
        auth,
        connectors,
        declarative_workflows,
        icd10_catalog,
        visual_workflows,
        audit,
        agent_supervisor,
        picker,
        desktop,
        llm,
        agent_client,
    );

    let router = routes::build_router(app_state)
        .layer(axum::middleware::from_fn(security::csrf_guard))
        .layer(axum::middleware::from_fn(security::security_headers));

    let addr: SocketAddr = settings
        .bind_address
        .parse()
        .with_context(|| format!("invalid bind address: {}", settings.bind_address))?;
    tracing::info!(%addr, "deskrelay server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn load_connector_catalog(path: &str) -> anyhow::Result<ConnectorRegistry> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading connector catalog {path}"))?;
    let specs: Vec<ConnectorSpec> =
        serde_yaml::from_str(&text).with_context(|| format!("parsing connector catalog {path}"))?;
    ConnectorRegistry::from_specs(specs)
}

fn load_workflow_catalog(path: &str) -> anyhow::Result<Vec<DeclarativeWorkflow>> {
    if !std::path::Path::new(path).is_file() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading workflow catalog {path}"))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing workflow catalog {path}"))
}

fn load_icd10_catalog(path: Option<&str>) -> anyhow::Result<BTreeMap<String, String>> {
    let Some(path) = path else {
        return Ok(BTreeMap::new());
    };
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading ICD-10 catalog {path}"))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing ICD-10 catalog {path}"))
}
