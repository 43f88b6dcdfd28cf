//! The local callback HTTP server (§4.4 "Callback HTTP server"): the channel
//! the visual interpreter uses to drive the desktop from the orchestration
//! server, grounded on the source agent's `AgentAPI`. No auth — it is bound
//! to loopback only, mirrored from the same liveness pattern as the
//! orchestration server's own `/api/health`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use deskrelay_schema::{ClickBefore, InsertMethod, InsertionInstruction, InsertionMode, InsertionType};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::inserter::FieldInserter;

#[derive(Clone)]
pub struct CallbackState {
    inserter: Arc<FieldInserter>,
}

impl CallbackState {
    pub fn new(inserter: Arc<FieldInserter>) -> Self {
        Self { inserter }
    }
}

#[derive(Debug, Deserialize)]
struct WriteCoordsRequest {
    x: i32,
    y: i32,
    content: String,
    #[serde(default = "default_insert_method")]
    insert_method: InsertMethod,
    #[serde(default)]
    key_sequence: String,
}

/// The `write_coords` protocol defaults to paste, unlike declarative
/// workflow outputs which default to typing (`InsertMethod::default`).
fn default_insert_method() -> InsertMethod {
    InsertMethod::Paste
}

pub fn build_router(state: CallbackState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/execute/write_coords", post(execute_write_coords))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn execute_write_coords(
    State(state): State<CallbackState>,
    Json(req): Json<WriteCoordsRequest>,
) -> Response {
    info!(x = req.x, y = req.y, "received write_coords callback");

    let instruction = InsertionInstruction {
        target_field: String::new(),
        content: req.content.clone(),
        mode: InsertionMode::Replace,
        insertion_type: InsertionType::Text,
        navigation: key_sequence_to_navigation(&req.key_sequence),
        label: None,
        click_before: Some(ClickBefore { x: req.x, y: req.y }),
        insert_method: req.insert_method,
    };

    match state.inserter.insert(&instruction, 0, 300).await {
        Ok(()) => Json(json!({
            "status": "success",
            "content": req.content,
            "coordinates": {"x": req.x, "y": req.y},
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "write_coords execution failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "error", "error": e.to_string()})),
            )
                .into_response()
        }
    }
}

/// The source protocol's `key_sequence` is a comma-separated list of single
/// key presses executed after insertion; the interpreter's navigation field
/// only models `tab_N`/`down_N`/`enter`, so a non-empty sequence of anything
/// else is dropped rather than misrepresented as one of those three shapes.
fn key_sequence_to_navigation(key_sequence: &str) -> Option<String> {
    let keys: Vec<&str> = key_sequence
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect();
    match keys.as_slice() {
        [] => None,
        ["enter"] => Some("enter".to_string()),
        ["tab"] => Some("tab_1".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_sequence_maps_single_enter() {
        assert_eq!(key_sequence_to_navigation("enter"), Some("enter".to_string()));
    }

    #[test]
    fn key_sequence_empty_is_none() {
        assert_eq!(key_sequence_to_navigation(""), None);
    }

    #[test]
    fn key_sequence_unrecognized_is_dropped() {
        assert_eq!(key_sequence_to_navigation("ctrl,shift,a"), None);
    }
}
