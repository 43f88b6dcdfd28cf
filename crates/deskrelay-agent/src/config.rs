//! Agent settings, layered the same way the server's are (§6 "Configuration
//! files"): a workspace-local YAML file, then environment variables.

use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "AgentSettings::default_server_url")]
    pub server_url: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default = "AgentSettings::default_callback_bind_address")]
    pub callback_bind_address: String,
    #[serde(default = "AgentSettings::default_picker_hotkey")]
    pub picker_hotkey: String,
    #[serde(default = "AgentSettings::default_insert_delay_ms")]
    pub insert_delay_ms: u64,
    #[serde(default = "AgentSettings::default_pause_before_ms")]
    pub pause_before_ms: u64,
    #[serde(default = "AgentSettings::default_pause_between_ms")]
    pub pause_between_ms: u64,
    #[serde(default = "AgentSettings::default_true")]
    pub backup_clipboard: bool,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "AgentSettings::default_window_keywords")]
    pub target_window_keywords: Vec<String>,
}

impl AgentSettings {
    fn default_server_url() -> String {
        "http://127.0.0.1:8787".to_string()
    }
    fn default_callback_bind_address() -> String {
        "127.0.0.1:8788".to_string()
    }
    fn default_picker_hotkey() -> String {
        "CTRL+ALT+P".to_string()
    }
    fn default_insert_delay_ms() -> u64 {
        10
    }
    fn default_pause_before_ms() -> u64 {
        500
    }
    fn default_pause_between_ms() -> u64 {
        200
    }
    fn default_true() -> bool {
        true
    }
    fn default_window_keywords() -> Vec<String> {
        vec!["DXCare".to_string(), "Patient Chart".to_string(), "Epic".to_string()]
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            server_url: Self::default_server_url(),
            auth_token: String::new(),
            callback_bind_address: Self::default_callback_bind_address(),
            picker_hotkey: Self::default_picker_hotkey(),
            insert_delay_ms: Self::default_insert_delay_ms(),
            pause_before_ms: Self::default_pause_before_ms(),
            pause_between_ms: Self::default_pause_between_ms(),
            backup_clipboard: Self::default_true(),
            user_id: None,
            target_window_keywords: Self::default_window_keywords(),
        }
    }
}

/// Loads settings from an explicit `--config` path if given, falling back to
/// `.deskrelay/agent.yaml`, then applies environment overrides.
pub fn load(extra: Option<&Path>) -> anyhow::Result<AgentSettings> {
    let candidate = extra
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from(".deskrelay/agent.yaml"));

    let mut settings = if candidate.is_file() {
        let text = std::fs::read_to_string(&candidate)
            .with_context(|| format!("reading {}", candidate.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", candidate.display()))?
    } else {
        AgentSettings::default()
    };

    if let Ok(url) = std::env::var("DESKRELAY_SERVER_URL") {
        settings.server_url = url;
    }
    if let Ok(token) = std::env::var("DESKRELAY_AUTH_TOKEN") {
        settings.auth_token = token;
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_with_no_config_file() {
        let settings = AgentSettings::default();
        assert_eq!(settings.server_url, "http://127.0.0.1:8787");
        assert!(settings.backup_clipboard);
    }

    #[test]
    fn explicit_path_overrides_defaults() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "server_url: \"http://10.0.0.5:8787\"").unwrap();
        let settings = load(Some(f.path())).unwrap();
        assert_eq!(settings.server_url, "http://10.0.0.5:8787");
    }
}
