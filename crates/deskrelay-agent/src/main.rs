mod callback_server;
mod config;
mod context;
mod hotkeys;
mod inserter;
mod middleware_client;
mod picker;
mod state;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use deskrelay_desktop::real::RealDesktopIo;
use deskrelay_desktop::DesktopIo;
use deskrelay_schema::workflow::normalize_hotkey;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::callback_server::CallbackState;
use crate::context::ContextCapture;
use crate::inserter::FieldInserter;
use crate::middleware_client::ServerClient;
use crate::state::AgentStateMachine;

#[derive(Debug, Parser)]
#[command(name = "deskrelay-agent", about = "Desktop dispatcher for clinical-chart workflows")]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = config::load(cli.config.as_deref())?;

    let desktop: Arc<dyn DesktopIo> = Arc::new(RealDesktopIo::new()?);
    let server = Arc::new(ServerClient::new(settings.server_url.clone(), settings.auth_token.clone()));
    let context_capture = Arc::new(ContextCapture::new(desktop.clone(), settings.backup_clipboard));
    let inserter = Arc::new(FieldInserter::new(desktop.clone(), settings.insert_delay_ms));
    let machine = Arc::new(AgentStateMachine::default());

    tracing::info!(server_url = %settings.server_url, "checking orchestration server");
    if server.health_check().await {
        tracing::info!("orchestration server is online");
    } else {
        tracing::warn!("orchestration server health check failed; continuing, hotkeys will error until it recovers");
    }
    machine.mark_ready();

    let declarative_hotkeys = load_declarative_hotkey_table(&server).await;
    let visual_hotkeys = load_visual_hotkey_table(&server).await;
    let visual_workflow_ids: Arc<HashMap<String, String>> = Arc::new(
        visual_hotkeys
            .iter()
            .map(|(normalized, info)| (normalized.clone(), info.workflow_id.clone()))
            .collect(),
    );
    let visual_listener_table: HashMap<String, String> = visual_hotkeys
        .into_iter()
        .map(|(normalized, info)| (normalized, info.display))
        .collect();

    let (tx, mut rx) = mpsc::channel::<HotkeyEvent>(32);

    let _declarative_listener = if declarative_hotkeys.is_empty() {
        None
    } else {
        Some(spawn_listener(declarative_hotkeys, HotkeyKind::Declarative, tx.clone())?)
    };
    let _visual_listener = if visual_listener_table.is_empty() {
        None
    } else {
        Some(spawn_listener(visual_listener_table, HotkeyKind::Visual, tx.clone())?)
    };
    let _picker_listener = spawn_listener(
        HashMap::from([(
            normalize_hotkey(&settings.picker_hotkey),
            settings.picker_hotkey.clone(),
        )]),
        HotkeyKind::Picker,
        tx.clone(),
    )?;
    drop(tx);

    let callback_state = CallbackState::new(inserter.clone());
    let callback_router = callback_server::build_router(callback_state);
    let callback_addr: SocketAddr = settings
        .callback_bind_address
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid callback bind address {}: {e}", settings.callback_bind_address))?;
    let callback_listener = tokio::net::TcpListener::bind(callback_addr).await?;
    tracing::info!(%callback_addr, "callback server listening");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(callback_listener, callback_router).await {
            tracing::error!(error = %e, "callback server exited");
        }
    });

    let pause_before_ms = settings.pause_before_ms;
    let pause_between_ms = settings.pause_between_ms;
    let user_id = settings.user_id.clone();

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                let server = server.clone();
                let context_capture = context_capture.clone();
                let inserter = inserter.clone();
                let machine = machine.clone();
                let user_id = user_id.clone();
                let visual_workflow_ids = visual_workflow_ids.clone();
                tokio::spawn(async move {
                    handle_hotkey(
                        event,
                        server,
                        context_capture,
                        inserter,
                        machine,
                        user_id,
                        pause_before_ms,
                        pause_between_ms,
                        visual_workflow_ids,
                    )
                    .await;
                });
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down on ctrl-c");
                machine.begin_shutdown();
                break;
            }
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum HotkeyKind {
    Declarative,
    Visual,
    Picker,
}

struct HotkeyEvent {
    kind: HotkeyKind,
    display: String,
}

fn spawn_listener(
    table: HashMap<String, String>,
    kind: HotkeyKind,
    tx: mpsc::Sender<HotkeyEvent>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let (inner_tx, mut inner_rx) = mpsc::channel::<String>(32);
    let join = hotkeys::spawn_hotkey_listener(table, inner_tx)?;
    tokio::spawn(async move {
        while let Some(display) = inner_rx.recv().await {
            if tx.send(HotkeyEvent { kind, display }).await.is_err() {
                return;
            }
        }
    });
    Ok(join)
}

async fn load_declarative_hotkey_table(server: &ServerClient) -> HashMap<String, String> {
    match server.list_declarative_workflows().await {
        Ok(workflows) => workflows
            .into_iter()
            .filter(|w| w.enabled)
            .map(|w| (normalize_hotkey(&w.hotkey), w.hotkey))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "could not list declarative workflows");
            HashMap::new()
        }
    }
}

/// A visual workflow's hotkey resolves to both a display string (for
/// logging/`Context`) and the workflow id `execute_visual_workflow` needs,
/// so the two can't be collapsed into the single `HashMap<String, String>`
/// the declarative and picker tables use.
struct VisualHotkeyInfo {
    display: String,
    workflow_id: String,
}

async fn load_visual_hotkey_table(server: &ServerClient) -> HashMap<String, VisualHotkeyInfo> {
    match server.list_visual_workflows().await {
        Ok(workflows) => workflows
            .into_iter()
            .filter(|w| w.enabled)
            .filter_map(|w| {
                let hotkey = w.hotkey?;
                Some((
                    normalize_hotkey(&hotkey),
                    VisualHotkeyInfo {
                        display: hotkey,
                        workflow_id: w.id,
                    },
                ))
            })
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "could not list visual workflows");
            HashMap::new()
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_hotkey(
    event: HotkeyEvent,
    server: Arc<ServerClient>,
    context_capture: Arc<ContextCapture>,
    inserter: Arc<FieldInserter>,
    machine: Arc<AgentStateMachine>,
    user_id: Option<String>,
    pause_before_ms: u64,
    pause_between_ms: u64,
    visual_workflow_ids: Arc<HashMap<String, String>>,
) {
    match event.kind {
        HotkeyKind::Picker => {
            machine.begin_picking(&event.display);
            let outcome = tokio::task::spawn_blocking(picker::pick_once).await.unwrap_or(picker::PickOutcome::Cancelled);
            if let picker::PickOutcome::Picked { x, y } = outcome {
                if let Err(e) = server.report_picked_coordinates(x, y).await {
                    tracing::warn!(error = %e, "failed to report picked coordinates");
                }
            }
            machine.finish_picking();
        }
        HotkeyKind::Declarative => {
            machine.begin_handling(&event.display);
            let context = context_capture.capture(&event.display, user_id).await;

            let result = server.trigger_workflow(&event.display, &context).await;
            match result {
                Ok(response) if response.status == "success" => {
                    if let Err(e) = inserter
                        .insert_multiple(&response.instructions, pause_before_ms, pause_between_ms)
                        .await
                    {
                        tracing::error!(error = %e, "insertion sequence failed");
                    }
                }
                Ok(response) => {
                    tracing::warn!(error = ?response.error, "workflow returned an error status");
                }
                Err(e) => {
                    tracing::error!(error = %e, "trigger request failed");
                }
            }

            context_capture.restore_clipboard().await;
            machine.finish_handling();
        }
        HotkeyKind::Visual => {
            machine.begin_handling(&event.display);

            match visual_workflow_ids.get(&normalize_hotkey(&event.display)) {
                Some(workflow_id) => match server.execute_visual_workflow(workflow_id).await {
                    Ok(response) if response.status == "success" => {
                        tracing::info!(
                            workflow_id = %workflow_id,
                            execution_time_ms = response.execution_time_ms,
                            "visual workflow executed"
                        );
                    }
                    Ok(response) => {
                        tracing::warn!(workflow_id = %workflow_id, error = ?response.error, "visual workflow returned an error status");
                    }
                    Err(e) => {
                        tracing::error!(workflow_id = %workflow_id, error = %e, "visual workflow execution request failed");
                    }
                },
                None => {
                    tracing::warn!(hotkey = %event.display, "no visual workflow id mapped to pressed hotkey");
                }
            }

            machine.finish_handling();
        }
    }
}
