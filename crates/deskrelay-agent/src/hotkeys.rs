//! Global hotkey registration and dispatch (§4.4 "Hotkey listener pool").
//!
//! Three independent listener tables (declarative, visual-workflow, picker)
//! each get their own `GlobalHotKeyManager`, mirroring the source agent's
//! three separate `HotkeyListener` instances so one table's registration
//! failure never disables another.

use std::collections::HashMap;

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Parses a hotkey string like `"CTRL+ALT+V"` into a `global_hotkey::HotKey`.
/// Case- and whitespace-insensitive, matching `normalize_hotkey` (§8).
fn parse_hotkey(raw: &str) -> anyhow::Result<HotKey> {
    let mut modifiers = Modifiers::empty();
    let mut code = None;

    for part in raw.split('+') {
        let part = part.trim().to_lowercase();
        match part.as_str() {
            "ctrl" | "control" => modifiers |= Modifiers::CONTROL,
            "alt" => modifiers |= Modifiers::ALT,
            "shift" => modifiers |= Modifiers::SHIFT,
            "super" | "meta" | "win" => modifiers |= Modifiers::SUPER,
            "" => {}
            key => {
                code = Some(key_to_code(key)?);
            }
        }
    }

    let code = code.ok_or_else(|| anyhow::anyhow!("hotkey {raw:?} has no non-modifier key"))?;
    Ok(HotKey::new(Some(modifiers), code))
}

fn key_to_code(key: &str) -> anyhow::Result<Code> {
    if key.len() == 1 && key.chars().all(|c| c.is_ascii_alphabetic()) {
        let letter = key.to_uppercase();
        return format!("Key{letter}")
            .parse::<Code>()
            .map_err(|_| anyhow::anyhow!("unrecognized key {key:?}"));
    }
    if key.len() == 1 && key.chars().all(|c| c.is_ascii_digit()) {
        return format!("Digit{key}")
            .parse::<Code>()
            .map_err(|_| anyhow::anyhow!("unrecognized key {key:?}"));
    }
    match key {
        "escape" | "esc" => Ok(Code::Escape),
        "enter" | "return" => Ok(Code::Enter),
        "tab" => Ok(Code::Tab),
        "space" => Ok(Code::Space),
        other => anyhow::bail!("unrecognized key {other:?}"),
    }
}

/// Registers every hotkey in `table` (normalized string -> display string)
/// against a dedicated manager and forwards matches on `tx`. The manager is
/// leaked into the returned task's closure so it lives as long as the
/// listener does; dropping it would unregister every hotkey.
pub fn spawn_hotkey_listener(
    table: HashMap<String, String>,
    tx: mpsc::Sender<String>,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let manager = GlobalHotKeyManager::new()?;
    let mut id_to_hotkey = HashMap::new();

    for (normalized, display) in table {
        match parse_hotkey(&normalized) {
            Ok(hotkey) => {
                if let Err(e) = manager.register(hotkey) {
                    warn!(hotkey = %display, error = %e, "failed to register hotkey");
                    continue;
                }
                id_to_hotkey.insert(hotkey.id(), display);
            }
            Err(e) => warn!(hotkey = %display, error = %e, "failed to parse hotkey"),
        }
    }

    let handle = tokio::task::spawn_blocking(move || {
        // Keep the manager alive for the lifetime of the listener; it
        // unregisters all its hotkeys on drop.
        let _manager = manager;
        let receiver = GlobalHotKeyEvent::receiver();
        loop {
            match receiver.recv() {
                Ok(event) => {
                    if event.state != HotKeyState::Pressed {
                        continue;
                    }
                    if let Some(display) = id_to_hotkey.get(&event.id) {
                        if tx.blocking_send(display.clone()).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "hotkey event channel closed");
                    return;
                }
            }
        }
    });

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modifier_and_letter() {
        assert!(parse_hotkey("ctrl+alt+v").is_ok());
    }

    #[test]
    fn rejects_hotkey_with_no_key() {
        assert!(parse_hotkey("ctrl+alt").is_err());
    }

    #[test]
    fn key_to_code_maps_digits_and_letters() {
        assert!(key_to_code("v").is_ok());
        assert!(key_to_code("3").is_ok());
        assert!(key_to_code("enter").is_ok());
    }
}
