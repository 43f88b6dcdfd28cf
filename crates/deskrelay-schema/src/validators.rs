//! Request/response validators. Supplemented from the original reference
//! implementation's `validators` module (not excluded by any Non-goal).

use std::collections::{BTreeMap, HashSet};

use regex::Regex;

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub error: Option<String>,
}

impl ValidationOutcome {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn fail(msg: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(msg.into()),
        }
    }
}

/// Validates ICD-10 code format, and optionally existence in a loaded
/// catalog.
pub struct Icd10Validator {
    catalog: BTreeMap<String, String>,
    pattern: Regex,
}

impl Icd10Validator {
    pub fn new(catalog: BTreeMap<String, String>) -> Self {
        Self {
            catalog,
            pattern: Regex::new(r"^[A-Z][0-9]{2}(\.[0-9A-Z]{1,4})?$").unwrap(),
        }
    }

    pub fn validate_format(&self, code: &str) -> ValidationOutcome {
        if self.pattern.is_match(code) {
            ValidationOutcome::ok()
        } else {
            ValidationOutcome::fail(format!("invalid ICD-10 code format: {code:?}"))
        }
    }

    pub fn validate_exists(&self, code: &str) -> ValidationOutcome {
        if self.catalog.contains_key(code) {
            ValidationOutcome::ok()
        } else {
            ValidationOutcome::fail(format!("unknown ICD-10 code: {code:?}"))
        }
    }
}

/// Case-insensitive field-name whitelist.
pub struct FieldWhitelistValidator {
    allowed: HashSet<String>,
}

impl FieldWhitelistValidator {
    pub fn new(allowed_fields: &[String]) -> Self {
        Self {
            allowed: allowed_fields.iter().map(|f| f.to_lowercase()).collect(),
        }
    }

    pub fn validate(&self, field: &str) -> ValidationOutcome {
        if self.allowed.contains(&field.to_lowercase()) {
            ValidationOutcome::ok()
        } else {
            ValidationOutcome::fail(format!("field {field:?} is not in whitelist"))
        }
    }
}

pub struct InputValidator;

impl InputValidator {
    pub fn validate_text_length(
        text: &str,
        min_length: Option<usize>,
        max_length: Option<usize>,
    ) -> ValidationOutcome {
        let len = text.chars().count();
        if let Some(min) = min_length {
            if len < min {
                return ValidationOutcome::fail(format!(
                    "input text too short: {len} chars, minimum {min}"
                ));
            }
        }
        if let Some(max) = max_length {
            if len > max {
                return ValidationOutcome::fail(format!(
                    "input text too long: {len} chars, maximum {max}"
                ));
            }
        }
        ValidationOutcome::ok()
    }

    pub fn validate_required_fields(
        extracted: &BTreeMap<String, serde_json::Value>,
        required: &[String],
    ) -> ValidationOutcome {
        let missing: Vec<&str> = required
            .iter()
            .filter(|f| !extracted.contains_key(f.as_str()))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            ValidationOutcome::ok()
        } else {
            ValidationOutcome::fail(format!("missing required fields: {}", missing.join(", ")))
        }
    }
}

/// Response size and script-injection checks, a defense-in-depth layer
/// alongside the field whitelist.
pub struct SecurityValidator {
    dangerous: Vec<Regex>,
}

impl Default for SecurityValidator {
    fn default() -> Self {
        Self {
            dangerous: vec![
                Regex::new(r"(?i)<script[^>]*>").unwrap(),
                Regex::new(r"(?i)javascript:").unwrap(),
                Regex::new(r"(?i)on\w+\s*=").unwrap(),
            ],
        }
    }
}

impl SecurityValidator {
    pub fn validate_response_size(&self, body: &str, max_bytes: usize) -> ValidationOutcome {
        if body.len() <= max_bytes {
            ValidationOutcome::ok()
        } else {
            ValidationOutcome::fail(format!(
                "response body too large: {} bytes, maximum {max_bytes}",
                body.len()
            ))
        }
    }

    pub fn validate_no_script_injection(&self, value: &str) -> ValidationOutcome {
        for pattern in &self.dangerous {
            if pattern.is_match(value) {
                return ValidationOutcome::fail("value contains disallowed script content");
            }
        }
        ValidationOutcome::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icd10_format_accepts_valid_codes() {
        let v = Icd10Validator::new(BTreeMap::new());
        assert!(v.validate_format("J18.9").valid);
        assert!(v.validate_format("A00").valid);
    }

    #[test]
    fn icd10_format_rejects_invalid_codes() {
        let v = Icd10Validator::new(BTreeMap::new());
        assert!(!v.validate_format("j18.9").valid);
        assert!(!v.validate_format("1234").valid);
    }

    #[test]
    fn whitelist_is_case_insensitive() {
        let v = FieldWhitelistValidator::new(&["DiagnosisText".to_string()]);
        assert!(v.validate("diagnosistext").valid);
        assert!(!v.validate("SocialSecurityNumber").valid);
    }

    #[test]
    fn text_length_bounds_are_enforced() {
        assert!(!InputValidator::validate_text_length("", Some(1), None).valid);
        assert!(InputValidator::validate_text_length("ok", Some(1), Some(10)).valid);
        assert!(!InputValidator::validate_text_length("too long text", None, Some(5)).valid);
    }

    #[test]
    fn security_validator_flags_script_tags() {
        let v = SecurityValidator::default();
        assert!(!v.validate_no_script_injection("<script>alert(1)</script>").valid);
        assert!(v.validate_no_script_injection("Pneumonia, unspecified").valid);
    }
}
