//! Connector configuration schema, loaded from the connector catalog file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::ConnectorName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorType {
    RestApi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "RetryPolicy::default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub backoff: BackoffStrategy,
    #[serde(default = "RetryPolicy::default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Fixed
    }
}

impl RetryPolicy {
    fn default_max_retries() -> u32 {
        0
    }

    fn default_initial_delay_ms() -> u64 {
        1000
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: Self::default_max_retries(),
            backoff: BackoffStrategy::default(),
            initial_delay_ms: Self::default_initial_delay_ms(),
        }
    }
}

/// Where the connector's credential comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthClause {
    BearerToken {
        /// Name of the environment variable holding the token.
        env_var: String,
    },
    ApiKey {
        env_var: String,
        #[serde(default = "AuthClause::default_header_name")]
        header_name: String,
    },
    Basic {
        username_env_var: String,
        password_env_var: String,
    },
    None,
}

impl AuthClause {
    fn default_header_name() -> String {
        "X-API-Key".to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorSpec {
    pub name: ConnectorName,
    #[serde(rename = "type")]
    pub connector_type: ConnectorType,
    pub base_url: String,
    #[serde(default = "AuthClause::default_none")]
    pub auth: AuthClause,
    pub endpoints: BTreeMap<String, String>,
    #[serde(default = "ConnectorSpec::default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl AuthClause {
    fn default_none() -> Self {
        AuthClause::None
    }
}

impl ConnectorSpec {
    fn default_timeout_ms() -> u64 {
        30_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_connector() {
        let yaml = r#"
name: voice_ai
type: rest_api
base_url: "https://api.example.com"
auth:
  type: bearer_token
  env_var: GROQ_API_KEY
endpoints:
  chat: /v1/chat/completions
"#;
        let spec: ConnectorSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.name.as_str(), "voice_ai");
        assert_eq!(spec.timeout_ms, 30_000);
        assert_eq!(spec.retry.max_retries, 0);
        assert!(matches!(spec.auth, AuthClause::BearerToken { .. }));
    }

    #[test]
    fn deserializes_retry_policy() {
        let yaml = r#"
name: voice_ai
type: rest_api
base_url: "https://api.example.com"
auth: { type: none }
endpoints: { chat: /chat }
retry:
  max_retries: 2
  backoff: exponential
  initial_delay_ms: 100
"#;
        let spec: ConnectorSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.retry.max_retries, 2);
        assert_eq!(spec.retry.backoff, BackoffStrategy::Exponential);
    }
}
