//! Validated newtype identifiers.
//!
//! Every identifier that crosses an API or storage boundary in this crate is
//! one of these, never a bare `String` — a typo'd workflow id and a typo'd
//! session id should not be able to compile-time swap places.

use std::borrow::Borrow;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
                let raw = raw.into();
                if is_valid_identifier(&raw) {
                    Ok(Self(raw))
                } else {
                    Err(IdError::Invalid {
                        kind: stringify!($name),
                        value: raw,
                    })
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Self::new(raw).map_err(D::Error::custom)
            }
        }
    };
}

#[derive(Debug, thiserror::Error)]
pub enum IdError {
    #[error("invalid {kind}: {value:?} (must be non-empty ASCII alphanumeric, '-', or '_')")]
    Invalid { kind: &'static str, value: String },
}

define_id_type!(WorkflowId);
define_id_type!(StepId);
define_id_type!(SessionId);
define_id_type!(ConnectorName);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_alphanumeric_dash_underscore() {
        assert!(WorkflowId::new("voice_summary-icd10").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert!(WorkflowId::new("").is_err());
    }

    #[test]
    fn rejects_whitespace_and_punctuation() {
        assert!(StepId::new("step one").is_err());
        assert!(StepId::new("step/one").is_err());
    }

    #[test]
    fn display_round_trips_the_raw_value() {
        let id = SessionId::new("s1").unwrap();
        assert_eq!(id.to_string(), "s1");
        assert_eq!(id.as_str(), "s1");
    }

    #[test]
    fn deserializes_from_json_string() {
        let id: ConnectorName = serde_json::from_str("\"voice_ai\"").unwrap();
        assert_eq!(id.as_str(), "voice_ai");
    }

    #[test]
    fn rejects_invalid_value_on_deserialize() {
        let result: Result<ConnectorName, _> = serde_json::from_str("\"bad value!\"");
        assert!(result.is_err());
    }
}
