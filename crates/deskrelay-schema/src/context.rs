//! The snapshot captured by the agent at hotkey time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State captured by the agent when a hotkey fires and handed to the server
/// as the basis for a declarative workflow's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub hotkey: String,
    #[serde(default)]
    pub selected_text: Option<String>,
    #[serde(default)]
    pub clipboard_text: Option<String>,
    #[serde(default)]
    pub window_title: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub active_field: Option<String>,
}

impl Context {
    /// The text a declarative workflow's `input.source` binding resolves to.
    ///
    /// `active_field_text` falls back to selected text, matching the source
    /// behavior: the agent never actually reads a field's live contents, it
    /// only has whatever was captured via selection or clipboard.
    pub fn resolve_input_source(&self, source: &str) -> String {
        match source {
            "selected_text" => self.selected_text.clone().unwrap_or_default(),
            "clipboard" => self.clipboard_text.clone().unwrap_or_default(),
            "active_field_text" => self.selected_text.clone().unwrap_or_default(),
            _ => String::new(),
        }
    }

    /// Input text used when no explicit source binding narrows the choice.
    pub fn best_effort_text(&self) -> String {
        self.selected_text
            .clone()
            .or_else(|| self.clipboard_text.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Context {
        Context {
            hotkey: "CTRL+ALT+V".into(),
            selected_text: Some("cough, fever".into()),
            clipboard_text: Some("clipboard value".into()),
            window_title: Some("DXCare".into()),
            user_id: Some("u1".into()),
            timestamp: Utc::now(),
            active_field: None,
        }
    }

    #[test]
    fn resolves_selected_text_source() {
        let ctx = sample();
        assert_eq!(ctx.resolve_input_source("selected_text"), "cough, fever");
    }

    #[test]
    fn resolves_clipboard_source() {
        let ctx = sample();
        assert_eq!(ctx.resolve_input_source("clipboard"), "clipboard value");
    }

    #[test]
    fn unknown_source_resolves_empty() {
        let ctx = sample();
        assert_eq!(ctx.resolve_input_source("nonsense"), "");
    }

    #[test]
    fn best_effort_falls_back_to_clipboard() {
        let mut ctx = sample();
        ctx.selected_text = None;
        assert_eq!(ctx.best_effort_text(), "clipboard value");
    }
}
