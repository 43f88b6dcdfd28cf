//! Real `DesktopIo` backed by the desktop-automation crates sourced from the
//! retrieval pack's `other_examples/` manifests (see `DESIGN.md`): `xcap`
//! for screenshots, `uni-ocr` for text recognition, `arboard` for the
//! clipboard, `enigo` for mouse/keyboard simulation.

use std::sync::Mutex;

use async_trait::async_trait;
use enigo::{Button, Direction, Enigo, Keyboard, Mouse, Settings};

use crate::{CapturedImage, DesktopError, DesktopIo, Rect};

pub struct RealDesktopIo {
    // enigo's `Enigo` is not `Sync`; a mutex lets `RealDesktopIo` remain
    // `Sync` for use behind a shared `Arc` in server/agent state.
    enigo: Mutex<Enigo>,
}

impl RealDesktopIo {
    pub fn new() -> Result<Self, DesktopError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| DesktopError::Automation(e.to_string()))?;
        Ok(Self {
            enigo: Mutex::new(enigo),
        })
    }
}

#[async_trait]
impl DesktopIo for RealDesktopIo {
    async fn screenshot(&self, rect: Rect) -> Result<CapturedImage, DesktopError> {
        let monitors = xcap::Monitor::all().map_err(|e| DesktopError::Capture(e.to_string()))?;
        let monitor = monitors.first().ok_or(DesktopError::NoDisplay)?;
        let full = monitor
            .capture_image()
            .map_err(|e| DesktopError::Capture(e.to_string()))?;

        if rect.width <= 0 || rect.height <= 0 {
            return Ok(CapturedImage {
                width: 0,
                height: 0,
                rgba: Vec::new(),
            });
        }

        let cropped = image::imageops::crop_imm(
            &full,
            rect.x.max(0) as u32,
            rect.y.max(0) as u32,
            rect.width as u32,
            rect.height as u32,
        )
        .to_image();

        Ok(CapturedImage {
            width: cropped.width(),
            height: cropped.height(),
            rgba: cropped.into_raw(),
        })
    }

    async fn ocr(&self, image: &CapturedImage) -> Result<String, DesktopError> {
        if image.width == 0 || image.height == 0 {
            return Ok(String::new());
        }
        let engine =
            uni_ocr::OcrEngine::new(uni_ocr::OcrProvider::default()).map_err(|e| DesktopError::Ocr(e.to_string()))?;
        let dynamic = image::DynamicImage::ImageRgba8(
            image::RgbaImage::from_raw(image.width, image.height, image.rgba.clone())
                .ok_or_else(|| DesktopError::Ocr("invalid captured image buffer".to_string()))?,
        );
        engine
            .recognize_image(&dynamic)
            .map_err(|e| DesktopError::Ocr(e.to_string()))
    }

    async fn read_clipboard(&self) -> Result<String, DesktopError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| DesktopError::Clipboard(e.to_string()))?;
        clipboard
            .get_text()
            .map_err(|e| DesktopError::Clipboard(e.to_string()))
    }

    async fn write_clipboard(&self, text: &str) -> Result<(), DesktopError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| DesktopError::Clipboard(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| DesktopError::Clipboard(e.to_string()))
    }

    async fn click(&self, x: i32, y: i32) -> Result<(), DesktopError> {
        let mut enigo = self.enigo.lock().expect("enigo mutex poisoned");
        enigo
            .move_mouse(x, y, enigo::Coordinate::Abs)
            .map_err(|e| DesktopError::Automation(e.to_string()))?;
        enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| DesktopError::Automation(e.to_string()))
    }

    async fn type_text(&self, text: &str, per_char_delay_ms: u64) -> Result<(), DesktopError> {
        let mut enigo = self.enigo.lock().expect("enigo mutex poisoned");
        for ch in text.chars() {
            enigo
                .text(&ch.to_string())
                .map_err(|e| DesktopError::Automation(e.to_string()))?;
            if per_char_delay_ms > 0 {
                std::thread::sleep(std::time::Duration::from_millis(per_char_delay_ms));
            }
        }
        Ok(())
    }

    async fn key_combo(&self, seq: &[String]) -> Result<(), DesktopError> {
        let mut enigo = self.enigo.lock().expect("enigo mutex poisoned");
        let keys: Vec<enigo::Key> = seq.iter().map(|s| named_key(s)).collect();
        for key in &keys {
            enigo
                .key(*key, Direction::Press)
                .map_err(|e| DesktopError::Automation(e.to_string()))?;
        }
        for key in keys.iter().rev() {
            enigo
                .key(*key, Direction::Release)
                .map_err(|e| DesktopError::Automation(e.to_string()))?;
        }
        Ok(())
    }

    async fn release_modifiers(&self) -> Result<(), DesktopError> {
        let mut enigo = self.enigo.lock().expect("enigo mutex poisoned");
        for key in [enigo::Key::Control, enigo::Key::Alt, enigo::Key::Shift] {
            let _ = enigo.key(key, Direction::Release);
        }
        Ok(())
    }
}

fn named_key(name: &str) -> enigo::Key {
    match name.to_lowercase().as_str() {
        "ctrl" | "control" => enigo::Key::Control,
        "alt" => enigo::Key::Alt,
        "shift" => enigo::Key::Shift,
        "tab" => enigo::Key::Tab,
        "enter" | "return" => enigo::Key::Return,
        "delete" => enigo::Key::Delete,
        "down" | "arrowdown" => enigo::Key::DownArrow,
        "home" => enigo::Key::Home,
        "end" => enigo::Key::End,
        "escape" | "esc" => enigo::Key::Escape,
        other => enigo::Key::Unicode(other.chars().next().unwrap_or(' ')),
    }
}
