//! Connector error taxonomy (§4.1). Every variant carries a stable
//! machine-readable code so the server boundary and the audit log never have
//! to pattern-match on display text.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("connection error calling {endpoint}: {detail}")]
    ConnectionError { endpoint: String, detail: String },

    #[error("{endpoint} returned HTTP {code}")]
    HttpError { endpoint: String, code: u16 },

    #[error("{endpoint} returned server error HTTP {code}")]
    ServerError { endpoint: String, code: u16 },

    #[error("{endpoint} returned a body that was not valid JSON")]
    InvalidResponse { endpoint: String },

    #[error("missing credential environment variable {env_var}")]
    AuthError { env_var: String },

    #[error("connector has no endpoint named {endpoint}")]
    InvalidEndpoint { endpoint: String },

    #[error("connector {name} is not registered")]
    UnknownConnector { name: String },
}

impl ConnectorError {
    /// Stable machine-readable code, used by the audit log and the HTTP
    /// boundary — never the `Display` text, which may change wording.
    pub fn code(&self) -> &'static str {
        match self {
            ConnectorError::Timeout { .. } => "TIMEOUT",
            ConnectorError::ConnectionError { .. } => "CONNECTION_ERROR",
            ConnectorError::HttpError { .. } => "HTTP_ERROR",
            ConnectorError::ServerError { .. } => "SERVER_ERROR",
            ConnectorError::InvalidResponse { .. } => "INVALID_RESPONSE",
            ConnectorError::AuthError { .. } => "AUTH_ERROR",
            ConnectorError::InvalidEndpoint { .. } => "INVALID_ENDPOINT",
            ConnectorError::UnknownConnector { .. } => "UNKNOWN_CONNECTOR",
        }
    }

    /// Whether the retry loop should attempt again after this error.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ConnectorError::Timeout { .. }
                | ConnectorError::ConnectionError { .. }
                | ConnectorError::ServerError { .. }
        )
    }
}
