//! Drives the HTTP API in-process with `tower::ServiceExt::oneshot` against
//! a real `axum` router (§2 "server endpoint round trips with an in-process
//! axum app"), exercising the visual workflow store through the routes it's
//! actually reached by rather than calling `VisualWorkflowStore` directly.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::connect_info::ConnectInfo;
use axum::http::{Request, StatusCode};
use deskrelay_audit::AuditLogger;
use deskrelay_connector::ConnectorRegistry;
use deskrelay_desktop::fake::FakeDesktopIo;
use deskrelay_interpreter::{AgentCallbackError, LlmClient, LlmClientConfig, WriteCoordsClient};
use deskrelay_schema::{Step, StepId, VisualWorkflow, WorkflowId};
use deskrelay_server::agent_supervisor::AgentSupervisor;
use deskrelay_server::auth::AuthState;
use deskrelay_server::picker_state::PickerRegistry;
use deskrelay_server::routes::build_router;
use deskrelay_server::state::AppState;
use deskrelay_server::store::VisualWorkflowStore;
use tower::ServiceExt;

const TOKEN: &str = "test-token";

fn loopback_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
}

/// `bearer_auth_mw` extracts `ConnectInfo<SocketAddr>`, which `axum::serve`
/// normally supplies via `into_make_service_with_connect_info`; `oneshot`
/// bypasses that, so tests stamp it onto the request directly.
fn with_connect_info(mut req: Request<Body>) -> Request<Body> {
    req.extensions_mut().insert(ConnectInfo(loopback_addr()));
    req
}

struct NoopWriteCoordsClient;

#[async_trait::async_trait]
impl WriteCoordsClient for NoopWriteCoordsClient {
    async fn write_coords(
        &self,
        _x: i32,
        _y: i32,
        _content: &str,
        _insert_method: deskrelay_schema::InsertMethod,
        _key_sequence: &[String],
    ) -> Result<(), AgentCallbackError> {
        Ok(())
    }
}

async fn test_state() -> AppState {
    let dir = tempfile::tempdir().unwrap();
    let auth = AuthState::new(TOKEN, 1000, 1000);
    let connectors = ConnectorRegistry::from_specs(vec![]).unwrap();
    let visual_workflows = VisualWorkflowStore::open(dir.path().join("visual.json"))
        .await
        .unwrap();
    let audit = AuditLogger::open(dir.path().join("audit.log")).await.unwrap();
    let agent = AgentSupervisor::new("/bin/true");
    let picker = PickerRegistry::default();
    let desktop: Arc<dyn deskrelay_desktop::DesktopIo> = Arc::new(FakeDesktopIo::default());
    let llm = Arc::new(LlmClient::new(LlmClientConfig {
        chat_url: "http://127.0.0.1:0".to_string(),
        model: "unused".to_string(),
        api_key_env_var: "DESKRELAY_TEST_UNSET_API_KEY".to_string(),
    }));
    let agent_client: Arc<dyn WriteCoordsClient> = Arc::new(NoopWriteCoordsClient);

    AppState::new(
        auth,
        connectors,
        vec![],
        Default::default(),
        visual_workflows,
        audit,
        agent,
        picker,
        desktop,
        llm,
        agent_client,
    )
}

fn sample_workflow(id: &str) -> VisualWorkflow {
    VisualWorkflow {
        id: WorkflowId::new(id).unwrap(),
        hotkey: Some("ctrl+alt+r".to_string()),
        enabled: true,
        steps: vec![Step::ReadCoords {
            id: StepId::new("s1").unwrap(),
            enabled: true,
            x: 10,
            y: 20,
            width: 100,
            height: 30,
            output_variable: "patient_id".to_string(),
            extract_numbers: false,
        }],
        updated_at: None,
    }
}

#[tokio::test]
async fn create_then_get_round_trips_modulo_updated_at() {
    let router = build_router(test_state().await);
    let workflow = sample_workflow("wf-round-trip");

    let create_req = Request::builder()
        .method("POST")
        .uri("/api/visual-workflows")
        .header("authorization", format!("Bearer {TOKEN}"))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&workflow).unwrap()))
        .unwrap();
    let create_resp = router.clone().oneshot(with_connect_info(create_req)).await.unwrap();
    assert_eq!(create_resp.status(), StatusCode::CREATED);

    let get_req = Request::builder()
        .method("GET")
        .uri("/api/visual-workflows/wf-round-trip")
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let get_resp = router.oneshot(with_connect_info(get_req)).await.unwrap();
    assert_eq!(get_resp.status(), StatusCode::OK);

    let body = axum::body::to_bytes(get_resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let fetched: VisualWorkflow = serde_json::from_slice(&body).unwrap();

    assert_eq!(fetched.id, workflow.id);
    assert_eq!(fetched.hotkey, workflow.hotkey);
    assert_eq!(fetched.enabled, workflow.enabled);
    assert!(fetched.updated_at.is_some(), "server must stamp updated_at on create");
}

#[tokio::test]
async fn update_re_stamps_updated_at() {
    let router = build_router(test_state().await);
    let workflow = sample_workflow("wf-update");

    let create_req = Request::builder()
        .method("POST")
        .uri("/api/visual-workflows")
        .header("authorization", format!("Bearer {TOKEN}"))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&workflow).unwrap()))
        .unwrap();
    router.clone().oneshot(with_connect_info(create_req)).await.unwrap();

    let mut updated = workflow.clone();
    updated.enabled = false;
    let update_req = Request::builder()
        .method("PUT")
        .uri("/api/visual-workflows/wf-update")
        .header("authorization", format!("Bearer {TOKEN}"))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&updated).unwrap()))
        .unwrap();
    let update_resp = router.clone().oneshot(with_connect_info(update_req)).await.unwrap();
    assert_eq!(update_resp.status(), StatusCode::OK);

    let get_req = Request::builder()
        .method("GET")
        .uri("/api/visual-workflows/wf-update")
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let get_resp = router.oneshot(with_connect_info(get_req)).await.unwrap();
    let body = axum::body::to_bytes(get_resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let fetched: VisualWorkflow = serde_json::from_slice(&body).unwrap();

    assert!(!fetched.enabled);
    assert!(fetched.updated_at.is_some(), "server must stamp updated_at on update");
}

#[tokio::test]
async fn create_without_bearer_token_is_rejected() {
    let router = build_router(test_state().await);
    let workflow = sample_workflow("wf-unauthorized");

    let req = Request::builder()
        .method("POST")
        .uri("/api/visual-workflows")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&workflow).unwrap()))
        .unwrap();
    let resp = router.oneshot(with_connect_info(req)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
