//! The HTTP endpoint surface (§6).

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use deskrelay_interpreter::declarative_engine;
use deskrelay_schema::{AuditStatus, Context, SessionId, VisualWorkflow};
use serde::Deserialize;
use serde_json::json;

use crate::agent_supervisor::AgentSupervisorError;
use crate::auth::bearer_auth_mw;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/trigger", post(trigger))
        .route("/api/workflows", get(list_declarative_workflows))
        .route(
            "/api/visual-workflows",
            get(list_visual_workflows).post(create_visual_workflow),
        )
        .route(
            "/api/visual-workflows/:id",
            get(get_visual_workflow)
                .put(update_visual_workflow)
                .delete(delete_visual_workflow),
        )
        .route(
            "/api/visual-workflows/:id/execute",
            post(execute_visual_workflow),
        )
        .route("/api/picker/activate", post(picker_activate))
        .route("/api/picker/coordinates", post(picker_coordinates))
        .route("/api/picker/status/:session_id", get(picker_status))
        .route("/api/agent/start", post(agent_start))
        .route("/api/agent/stop", post(agent_stop))
        .route("/api/agent/status", get(agent_status))
        .route("/api/audit/recent", get(audit_recent))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            bearer_auth_mw::<AppState>,
        ));

    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .merge(protected)
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({"service": "deskrelay", "status": "ok"}))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "workflows_loaded": state.declarative_workflows.len() + state.visual_workflows.list().await.len(),
        "connectors_active": state.connectors.len(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

#[derive(Debug, Deserialize)]
struct TriggerRequest {
    hotkey: String,
    context: Context,
}

async fn trigger(
    State(state): State<AppState>,
    Json(req): Json<TriggerRequest>,
) -> Response {
    let start = std::time::Instant::now();
    let Some(workflow) = declarative_engine::match_hotkey(&state.declarative_workflows, &req.hotkey)
    else {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "no workflow bound to hotkey"}))).into_response();
    };

    match declarative_engine::execute(workflow, &req.context, &state.connectors, &state.icd10_catalog).await {
        Ok(outcome) => {
            state
                .audit
                .log_workflow_execution(
                    workflow.workflow_id.as_str(),
                    workflow.connector.as_str(),
                    AuditStatus::Success,
                    start.elapsed().as_millis() as u64,
                    req.context.user_id.as_deref(),
                    None,
                )
                .await;
            Json(json!({"status": "success", "instructions": outcome.instructions})).into_response()
        }
        Err(e) => {
            state
                .audit
                .log_workflow_execution(
                    workflow.workflow_id.as_str(),
                    workflow.connector.as_str(),
                    AuditStatus::Error,
                    start.elapsed().as_millis() as u64,
                    req.context.user_id.as_deref(),
                    Some(e.code()),
                )
                .await;
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"status": "error", "error": e.to_string(), "code": e.code()})),
            )
                .into_response()
        }
    }
}

async fn list_declarative_workflows(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({"workflows": state.declarative_workflows}))
}

async fn list_visual_workflows(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({"workflows": state.visual_workflows.list().await}))
}

async fn create_visual_workflow(
    State(state): State<AppState>,
    Json(workflow): Json<VisualWorkflow>,
) -> Response {
    match state.visual_workflows.create(workflow).await {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))).into_response(),
    }
}

async fn get_visual_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.visual_workflows.get(&id).await {
        Some(workflow) => Json(workflow).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn update_visual_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(workflow): Json<VisualWorkflow>,
) -> Response {
    match state.visual_workflows.update(&id, workflow).await {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()}))).into_response(),
    }
}

async fn delete_visual_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.visual_workflows.delete(&id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()}))).into_response(),
    }
}

#[derive(Debug, Deserialize, Default)]
struct ExecuteRequest {
    #[serde(default)]
    initial_variables: BTreeMap<String, String>,
}

async fn execute_visual_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ExecuteRequest>>,
) -> Response {
    let Some(workflow) = state.visual_workflows.get(&id).await else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let initial_variables = body.map(|Json(b)| b.initial_variables).unwrap_or_default();
    let result = state.executor.execute(&workflow, initial_variables).await;
    Json(json!({
        "status": match &result.status {
            deskrelay_interpreter::ExecutionStatus::Success => "success",
            deskrelay_interpreter::ExecutionStatus::Error { .. } => "error",
        },
        "error": match &result.status {
            deskrelay_interpreter::ExecutionStatus::Success => None,
            deskrelay_interpreter::ExecutionStatus::Error { step_id, error } => {
                Some(json!({"step_id": step_id.as_str(), "message": error}))
            }
        },
        "variables": result.variables,
        "execution_time_ms": result.execution_time_ms,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct PickerActivateRequest {
    session_id: String,
    field_name: String,
}

async fn picker_activate(
    State(state): State<AppState>,
    Json(req): Json<PickerActivateRequest>,
) -> Response {
    let Ok(session_id) = SessionId::new(req.session_id) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid session id"}))).into_response();
    };
    state.picker.activate(session_id, req.field_name).await;
    StatusCode::OK.into_response()
}

#[derive(Debug, Deserialize)]
struct PickerCoordinatesRequest {
    x: i32,
    y: i32,
}

async fn picker_coordinates(
    State(state): State<AppState>,
    Json(req): Json<PickerCoordinatesRequest>,
) -> Response {
    if state.picker.report_coordinates(req.x, req.y).await {
        StatusCode::OK.into_response()
    } else {
        (StatusCode::CONFLICT, Json(json!({"error": "no active picker session"}))).into_response()
    }
}

async fn picker_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.picker.status(&session_id).await {
        Some(session) => Json(session).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn agent_start(State(state): State<AppState>) -> Response {
    match state.agent.start().await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => agent_error_response(e),
    }
}

async fn agent_stop(State(state): State<AppState>) -> Response {
    match state.agent.stop().await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => agent_error_response(e),
    }
}

fn agent_error_response(e: AgentSupervisorError) -> Response {
    let status = match e {
        AgentSupervisorError::AlreadyRunning => StatusCode::CONFLICT,
        AgentSupervisorError::NotRunning => StatusCode::NOT_FOUND,
        AgentSupervisorError::SpawnFailed(_) | AgentSupervisorError::CrashedOnStart(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({"error": e.to_string()}))).into_response()
}

async fn agent_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = state.agent.status().await;
    Json(json!({
        "running": status.running,
        "pid": status.pid,
        "uptime_seconds": status.uptime_seconds,
    }))
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    limit: Option<usize>,
}

async fn audit_recent(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Response {
    match state.audit.recent(query.limit.unwrap_or(50)).await {
        Ok(entries) => Json(json!({"entries": entries})).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()}))).into_response(),
    }
}
