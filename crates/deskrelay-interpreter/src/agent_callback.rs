//! The `write_coords` step's channel back to the agent dispatcher's callback
//! server (§4.2, §4.4 "Callback HTTP server").

use async_trait::async_trait;
use deskrelay_schema::InsertMethod;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentCallbackError {
    #[error("cannot connect to agent API; is the agent running?")]
    AgentUnreachable,
    #[error("agent API request timed out")]
    AgentTimeout,
    #[error("agent reported an error: {0}")]
    AgentError(String),
}

#[async_trait]
pub trait WriteCoordsClient: Send + Sync {
    async fn write_coords(
        &self,
        x: i32,
        y: i32,
        content: &str,
        insert_method: InsertMethod,
        key_sequence: &[String],
    ) -> Result<(), AgentCallbackError>;
}

/// Real implementation: POSTs to the agent's `/execute/write_coords`
/// endpoint.
pub struct HttpWriteCoordsClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpWriteCoordsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("reqwest client builds"),
        }
    }
}

#[async_trait]
impl WriteCoordsClient for HttpWriteCoordsClient {
    async fn write_coords(
        &self,
        x: i32,
        y: i32,
        content: &str,
        insert_method: InsertMethod,
        key_sequence: &[String],
    ) -> Result<(), AgentCallbackError> {
        let url = format!("{}/execute/write_coords", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "x": x,
            "y": y,
            "content": content,
            "insert_method": insert_method,
            "key_sequence": key_sequence,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentCallbackError::AgentTimeout
                } else {
                    AgentCallbackError::AgentUnreachable
                }
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            let error_text = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or_else(|| "unknown agent error".to_string());
            Err(AgentCallbackError::AgentError(error_text))
        }
    }
}
