//! Server settings, layered the way the source config loader layers search
//! paths: workspace-local file, then environment variables, then CLI flags
//! (§6 "Configuration files").

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_bind_address")]
    pub bind_address: String,
    #[serde(default = "ServerSettings::default_agent_binary_path")]
    pub agent_binary_path: String,
    #[serde(default = "ServerSettings::default_audit_log_path")]
    pub audit_log_path: String,
    #[serde(default = "ServerSettings::default_visual_workflow_store_path")]
    pub visual_workflow_store_path: String,
    #[serde(default = "ServerSettings::default_workflow_catalog_path")]
    pub workflow_catalog_path: String,
    #[serde(default = "ServerSettings::default_connector_catalog_path")]
    pub connector_catalog_path: String,
    #[serde(default)]
    pub icd10_catalog_path: Option<String>,
    #[serde(default = "ServerSettings::default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
    #[serde(default = "ServerSettings::default_rate_limit_burst")]
    pub rate_limit_burst: u32,
}

impl ServerSettings {
    fn default_bind_address() -> String {
        "127.0.0.1:8787".to_string()
    }
    fn default_agent_binary_path() -> String {
        "deskrelay-agent".to_string()
    }
    fn default_audit_log_path() -> String {
        "logs/audit.log".to_string()
    }
    fn default_visual_workflow_store_path() -> String {
        "data/visual_workflows.json".to_string()
    }
    fn default_workflow_catalog_path() -> String {
        "config/workflows.yaml".to_string()
    }
    fn default_connector_catalog_path() -> String {
        "config/connectors.yaml".to_string()
    }
    fn default_rate_limit_per_minute() -> u32 {
        5
    }
    fn default_rate_limit_burst() -> u32 {
        2
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: Self::default_bind_address(),
            agent_binary_path: Self::default_agent_binary_path(),
            audit_log_path: Self::default_audit_log_path(),
            visual_workflow_store_path: Self::default_visual_workflow_store_path(),
            workflow_catalog_path: Self::default_workflow_catalog_path(),
            connector_catalog_path: Self::default_connector_catalog_path(),
            icd10_catalog_path: None,
            rate_limit_per_minute: Self::default_rate_limit_per_minute(),
            rate_limit_burst: Self::default_rate_limit_burst(),
        }
    }
}

fn config_search_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from(".deskrelay/config.yaml"),
        PathBuf::from("deskrelay.yaml"),
    ]
}

/// Loads settings by merging the discovered YAML layer (if any), an explicit
/// `--config` path, and `MIDDLEWARE_TOKEN`-adjacent environment overrides.
/// Later layers win.
pub fn load(extra: Option<&Path>) -> anyhow::Result<ServerSettings> {
    let mut merged = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());

    for path in config_search_paths() {
        if path.is_file() {
            debug!(path = %path.display(), "loading config layer");
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let layer: serde_yaml::Value = serde_yaml::from_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            merge_yaml(&mut merged, layer);
        }
    }

    if let Some(p) = extra {
        debug!(path = %p.display(), "loading explicit config");
        let text =
            std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
        let layer: serde_yaml::Value =
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", p.display()))?;
        merge_yaml(&mut merged, layer);
    }

    let mut settings: ServerSettings = if matches!(merged, serde_yaml::Value::Mapping(ref m) if m.is_empty())
    {
        ServerSettings::default()
    } else {
        serde_yaml::from_value(merged).context("deserializing merged server settings")?
    };

    if let Ok(bind) = std::env::var("DESKRELAY_BIND_ADDRESS") {
        settings.bind_address = bind;
    }
    if let Ok(path) = std::env::var("AUDIT_LOG_PATH") {
        settings.audit_log_path = path;
    }

    Ok(settings)
}

fn merge_yaml(dst: &mut serde_yaml::Value, src: serde_yaml::Value) {
    match (dst, src) {
        (serde_yaml::Value::Mapping(d), serde_yaml::Value::Mapping(s)) => {
            for (k, v) in s {
                let entry = d
                    .entry(k)
                    .or_insert(serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
                merge_yaml(entry, v);
            }
        }
        (dst, src) => *dst = src,
    }
}
