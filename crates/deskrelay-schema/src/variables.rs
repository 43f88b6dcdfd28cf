//! The per-execution variable environment threaded through a visual
//! workflow's steps and read by template expansion.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A value written by a step: either a scalar string or a flat string→string
/// mapping (the shape `lookup_excel` and `format_with_llm` produce).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Scalar(String),
    Mapping(BTreeMap<String, String>),
}

impl VariableValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            VariableValue::Scalar(s) => Some(s.as_str()),
            VariableValue::Mapping(_) => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            VariableValue::Mapping(m) => m.get(key).map(String::as_str),
            VariableValue::Scalar(_) => None,
        }
    }
}

/// The environment a single workflow execution threads through its steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableEnv(BTreeMap<String, VariableValue>);

impl VariableEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the environment from caller-supplied initial variables (plain
    /// strings only — this is the `initial_variables` the interpreter's
    /// caller passes in, e.g. a pre-existing transcription).
    pub fn from_initial(initial: BTreeMap<String, String>) -> Self {
        Self(
            initial
                .into_iter()
                .map(|(k, v)| (k, VariableValue::Scalar(v)))
                .collect(),
        )
    }

    pub fn set(&mut self, name: impl Into<String>, value: VariableValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&VariableValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Resolve a dotted path (`name` or `name.sub`) against the environment,
    /// per the template language's traversal rule.
    pub fn resolve_path(&self, path: &str) -> Option<String> {
        let mut parts = path.split('.').map(str::trim);
        let head = parts.next()?;
        let value = self.0.get(head)?;
        match parts.next() {
            None => match value {
                VariableValue::Scalar(s) => Some(s.clone()),
                VariableValue::Mapping(_) => None,
            },
            Some(sub) => value.get(sub).map(str::to_owned),
        }
    }

    pub fn as_map(&self) -> &BTreeMap<String, VariableValue> {
        &self.0
    }
}
