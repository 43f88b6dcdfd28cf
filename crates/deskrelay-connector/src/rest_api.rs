//! REST API connector: auth setup, endpoint resolution, and the retry loop
//! (§4.1). Grounded on the source connector's `_make_request` retry
//! semantics, re-expressed as an async Rust retry loop.

use std::time::Duration;

use deskrelay_schema::{AuthClause, BackoffStrategy, ConnectorSpec};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::ConnectorError;

#[derive(Debug)]
pub struct RestApiConnector {
    spec: ConnectorSpec,
    client: reqwest::Client,
}

impl RestApiConnector {
    pub fn new(spec: ConnectorSpec) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(spec.timeout_ms))
            .build()?;
        Ok(Self { spec, client })
    }

    pub fn name(&self) -> &str {
        self.spec.name.as_str()
    }

    /// First configured endpoint, used by the declarative path which always
    /// calls a connector's sole endpoint.
    pub fn first_endpoint(&self) -> Option<&str> {
        self.spec.endpoints.keys().next().map(String::as_str)
    }

    fn resolve_url(&self, endpoint: &str) -> Result<String, ConnectorError> {
        let path = self
            .spec
            .endpoints
            .get(endpoint)
            .ok_or_else(|| ConnectorError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
            })?;
        Ok(format!(
            "{}{}",
            self.spec.base_url.trim_end_matches('/'),
            path
        ))
    }

    fn apply_auth(
        &self,
        mut builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ConnectorError> {
        match &self.spec.auth {
            AuthClause::None => Ok(builder),
            AuthClause::BearerToken { env_var } => {
                let token = std::env::var(env_var).map_err(|_| ConnectorError::AuthError {
                    env_var: env_var.clone(),
                })?;
                Ok(builder.bearer_auth(token))
            }
            AuthClause::ApiKey {
                env_var,
                header_name,
            } => {
                let key = std::env::var(env_var).map_err(|_| ConnectorError::AuthError {
                    env_var: env_var.clone(),
                })?;
                builder = builder.header(header_name, key);
                Ok(builder)
            }
            AuthClause::Basic {
                username_env_var,
                password_env_var,
            } => {
                let user =
                    std::env::var(username_env_var).map_err(|_| ConnectorError::AuthError {
                        env_var: username_env_var.clone(),
                    })?;
                let pass =
                    std::env::var(password_env_var).map_err(|_| ConnectorError::AuthError {
                        env_var: password_env_var.clone(),
                    })?;
                Ok(builder.basic_auth(user, Some(pass)))
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        match self.spec.retry.backoff {
            BackoffStrategy::Fixed => Duration::from_millis(self.spec.retry.initial_delay_ms),
            BackoffStrategy::Exponential => {
                Duration::from_millis(self.spec.retry.initial_delay_ms * 2u64.pow(attempt))
            }
        }
    }

    /// Execute one request against `endpoint`, retrying per the connector's
    /// retry policy. `method` defaults to `POST` if empty.
    pub async fn execute(
        &self,
        endpoint: &str,
        payload: &serde_json::Value,
        method: &str,
    ) -> Result<serde_json::Value, ConnectorError> {
        let url = self.resolve_url(endpoint)?;
        let method = if method.is_empty() { "POST" } else { method };
        let max_retries = self.spec.retry.max_retries;

        let mut last_error: Option<ConnectorError> = None;
        for attempt in 0..=max_retries {
            let request = self
                .client
                .request(method.parse().unwrap_or(reqwest::Method::POST), &url)
                .json(payload);
            let request = self.apply_auth(request)?;

            let outcome = request.send().await;
            match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json::<serde_json::Value>().await.map_err(|_| {
                            ConnectorError::InvalidResponse {
                                endpoint: endpoint.to_string(),
                            }
                        });
                    }
                    if status.is_client_error() {
                        return Err(ConnectorError::HttpError {
                            endpoint: endpoint.to_string(),
                            code: status.as_u16(),
                        });
                    }
                    if status.is_server_error() || status == StatusCode::SERVICE_UNAVAILABLE {
                        last_error = Some(ConnectorError::ServerError {
                            endpoint: endpoint.to_string(),
                            code: status.as_u16(),
                        });
                    } else {
                        return Err(ConnectorError::HttpError {
                            endpoint: endpoint.to_string(),
                            code: status.as_u16(),
                        });
                    }
                }
                Err(e) if e.is_timeout() => {
                    last_error = Some(ConnectorError::Timeout {
                        endpoint: endpoint.to_string(),
                    });
                }
                Err(e) => {
                    last_error = Some(ConnectorError::ConnectionError {
                        endpoint: endpoint.to_string(),
                        detail: e.to_string(),
                    });
                }
            }

            if attempt < max_retries {
                let delay = self.backoff_delay(attempt);
                warn!(
                    connector = self.name(),
                    attempt, delay_ms = %delay.as_millis(), "retrying connector call"
                );
                tokio::time::sleep(delay).await;
            }
        }

        debug!(connector = self.name(), "connector call exhausted retries");
        Err(last_error.expect("at least one attempt runs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn spec(max_retries: u32, backoff: BackoffStrategy, initial_delay_ms: u64) -> ConnectorSpec {
        let mut endpoints = BTreeMap::new();
        endpoints.insert("chat".to_string(), "/chat".to_string());
        ConnectorSpec {
            name: deskrelay_schema::ConnectorName::new("voice_ai").unwrap(),
            connector_type: deskrelay_schema::ConnectorType::RestApi,
            base_url: "http://127.0.0.1:1".to_string(),
            auth: AuthClause::None,
            endpoints,
            timeout_ms: 50,
            retry: deskrelay_schema::RetryPolicy {
                max_retries,
                backoff,
                initial_delay_ms,
            },
        }
    }

    #[test]
    fn backoff_delay_fixed_is_constant() {
        let connector = RestApiConnector::new(spec(3, BackoffStrategy::Fixed, 100)).unwrap();
        assert_eq!(connector.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(connector.backoff_delay(2), Duration::from_millis(100));
    }

    #[test]
    fn backoff_delay_exponential_doubles() {
        let connector = RestApiConnector::new(spec(3, BackoffStrategy::Exponential, 100)).unwrap();
        assert_eq!(connector.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(connector.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(connector.backoff_delay(2), Duration::from_millis(400));
    }

    #[test]
    fn unknown_endpoint_fails_closed() {
        let connector = RestApiConnector::new(spec(0, BackoffStrategy::Fixed, 1)).unwrap();
        let err = connector.resolve_url("nonexistent").unwrap_err();
        assert_eq!(err.code(), "INVALID_ENDPOINT");
    }

    #[tokio::test]
    async fn bearer_auth_without_env_var_fails_with_auth_error() {
        let mut endpoints = BTreeMap::new();
        endpoints.insert("chat".to_string(), "/chat".to_string());
        let s = ConnectorSpec {
            auth: AuthClause::BearerToken {
                env_var: "DESKRELAY_TEST_MISSING_TOKEN_VAR".to_string(),
            },
            ..spec(0, BackoffStrategy::Fixed, 1)
        };
        let connector = RestApiConnector::new(s).unwrap();
        let err = connector
            .execute("chat", &serde_json::json!({}), "POST")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AUTH_ERROR");
    }
}
