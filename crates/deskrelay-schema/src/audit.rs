//! The audit entry schema. Deliberately admits no free-text field other than
//! already-sanitized identifiers — enforced at the type layer per §9.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Error,
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub workflow_id: String,
    /// Opaque string only — never a patient identifier.
    #[serde(default)]
    pub user_id: Option<String>,
    pub connector: String,
    pub status: AuditStatus,
    pub execution_time_ms: u64,
    #[serde(default)]
    pub error_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_without_free_text_fields() {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            workflow_id: "voice_summary_icd10".into(),
            user_id: Some("u1".into()),
            connector: "voice_ai".into(),
            status: AuditStatus::Success,
            execution_time_ms: 42,
            error_code: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        for forbidden in ["content", "payload", "text", "body"] {
            assert!(!keys.contains(&forbidden));
        }
    }
}
