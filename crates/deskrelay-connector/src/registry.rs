//! Process-wide connector registry: write-once at startup, read-only after.

use std::collections::HashMap;

use deskrelay_schema::ConnectorSpec;

use crate::error::ConnectorError;
use crate::rest_api::RestApiConnector;

pub struct ConnectorRegistry {
    connectors: HashMap<String, RestApiConnector>,
}

impl ConnectorRegistry {
    pub fn from_specs(specs: Vec<ConnectorSpec>) -> anyhow::Result<Self> {
        let mut connectors = HashMap::new();
        for spec in specs {
            let name = spec.name.as_str().to_string();
            connectors.insert(name, RestApiConnector::new(spec)?);
        }
        Ok(Self { connectors })
    }

    pub fn get(&self, name: &str) -> Result<&RestApiConnector, ConnectorError> {
        self.connectors
            .get(name)
            .ok_or_else(|| ConnectorError::UnknownConnector {
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connectors.keys().map(String::as_str)
    }
}
