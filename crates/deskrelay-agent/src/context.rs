//! Context capture: active window title, clipboard backup/restore, and
//! `Context` assembly (§4.4 "Context capture"), grounded on the source
//! agent's `ContextCapture`.

use std::sync::Arc;

use deskrelay_desktop::DesktopIo;
use deskrelay_schema::Context;

pub struct ContextCapture {
    desktop: Arc<dyn DesktopIo>,
    backup_clipboard: bool,
    clipboard_backup: tokio::sync::Mutex<Option<String>>,
}

impl ContextCapture {
    pub fn new(desktop: Arc<dyn DesktopIo>, backup_clipboard: bool) -> Self {
        Self {
            desktop,
            backup_clipboard,
            clipboard_backup: tokio::sync::Mutex::new(None),
        }
    }

    /// Best-effort active window title. `xcap` exposes window enumeration
    /// but not a portable "focused" predicate, so this returns the frontmost
    /// entry of the platform's z-order when available and `None` otherwise —
    /// matching the source capture's "null elsewhere" fallback.
    pub fn active_window_title(&self) -> Option<String> {
        xcap::Window::all()
            .ok()
            .and_then(|windows| windows.into_iter().next())
            .and_then(|w| w.title().ok())
    }

    pub async fn capture(&self, hotkey: &str, user_id: Option<String>) -> Context {
        let window_title = self.active_window_title();
        let clipboard_text = self.desktop.read_clipboard().await.ok();

        if self.backup_clipboard {
            *self.clipboard_backup.lock().await = clipboard_text.clone();
        }

        Context {
            hotkey: hotkey.to_string(),
            selected_text: clipboard_text.clone(),
            clipboard_text,
            window_title,
            user_id,
            timestamp: chrono::Utc::now(),
            active_field: None,
        }
    }

    /// Restores the clipboard to what it held before `capture` ran, so the
    /// hotkey's own read doesn't leave the user's clipboard polluted.
    pub async fn restore_clipboard(&self) {
        if let Some(text) = self.clipboard_backup.lock().await.take() {
            let _ = self.desktop.write_clipboard(&text).await;
        }
    }

    pub fn target_window_active(&self, keywords: &[String]) -> bool {
        match self.active_window_title() {
            Some(title) => keywords
                .iter()
                .any(|k| title.to_lowercase().contains(&k.to_lowercase())),
            None => false,
        }
    }
}
