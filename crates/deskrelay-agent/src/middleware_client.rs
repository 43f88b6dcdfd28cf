//! HTTP client for the orchestration server (§4.4 "Context capture and UI
//! execution"), grounded on the source agent's `MiddlewareClient`.

use std::time::Duration;

use deskrelay_schema::Context;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerClientError {
    #[error("request to the orchestration server timed out")]
    Timeout,
    #[error("cannot connect to the orchestration server at {0}")]
    ConnectionError(String),
    #[error("server returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
pub struct TriggerResponse {
    pub status: String,
    #[serde(default)]
    pub instructions: Vec<deskrelay_schema::InsertionInstruction>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VisualWorkflowSummary {
    pub id: String,
    #[serde(default)]
    pub hotkey: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeclarativeWorkflowSummary {
    pub workflow_id: String,
    pub hotkey: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteVisualWorkflowResponse {
    pub status: String,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    pub execution_time_ms: u64,
}

pub struct ServerClient {
    base_url: String,
    client: reqwest::Client,
    token: String,
}

impl ServerClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds"),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub async fn health_check(&self) -> bool {
        self.client
            .get(self.url("/api/health"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    pub async fn trigger_workflow(
        &self,
        hotkey: &str,
        context: &Context,
    ) -> Result<TriggerResponse, ServerClientError> {
        let body = serde_json::json!({ "hotkey": hotkey, "context": context });
        let response = self
            .client
            .post(self.url("/api/trigger"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        self.parse(response).await
    }

    pub async fn list_declarative_workflows(
        &self,
    ) -> Result<Vec<DeclarativeWorkflowSummary>, ServerClientError> {
        #[derive(Deserialize)]
        struct Listing {
            workflows: Vec<DeclarativeWorkflowSummary>,
        }
        let response = self
            .client
            .get(self.url("/api/workflows"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let listing: Listing = self.parse(response).await?;
        Ok(listing.workflows)
    }

    pub async fn list_visual_workflows(&self) -> Result<Vec<VisualWorkflowSummary>, ServerClientError> {
        #[derive(Deserialize)]
        struct Listing {
            workflows: Vec<VisualWorkflowSummary>,
        }
        let response = self
            .client
            .get(self.url("/api/visual-workflows"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let listing: Listing = self.parse(response).await?;
        Ok(listing.workflows)
    }

    pub async fn execute_visual_workflow(
        &self,
        workflow_id: &str,
    ) -> Result<ExecuteVisualWorkflowResponse, ServerClientError> {
        let response = self
            .client
            .post(self.url(&format!("/api/visual-workflows/{workflow_id}/execute")))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        self.parse(response).await
    }

    pub async fn report_picked_coordinates(&self, x: i32, y: i32) -> Result<(), ServerClientError> {
        let body = serde_json::json!({ "x": x, "y": y });
        let response = self
            .client
            .post(self.url("/api/picker/coordinates"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(ServerClientError::Http { status, body })
        }
    }

    async fn parse<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ServerClientError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ServerClientError::Http {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|_| ServerClientError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ServerClientError {
    if e.is_timeout() {
        ServerClientError::Timeout
    } else {
        ServerClientError::ConnectionError(e.to_string())
    }
}
