//! In-memory `DesktopIo` test double (§9: "Test doubles simulate all of
//! these").

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{CapturedImage, DesktopError, DesktopIo, Rect};

#[derive(Default)]
struct State {
    clipboard: String,
    clicks: Vec<(i32, i32)>,
    typed: Vec<String>,
    key_combos: Vec<Vec<String>>,
    modifiers_released: u32,
}

/// A scriptable `DesktopIo`: OCR results are queued per-call by rect, and
/// every UI action is recorded for assertions.
pub struct FakeDesktopIo {
    ocr_results: Mutex<std::collections::VecDeque<String>>,
    state: Mutex<State>,
}

impl Default for FakeDesktopIo {
    fn default() -> Self {
        Self {
            ocr_results: Mutex::new(std::collections::VecDeque::new()),
            state: Mutex::new(State::default()),
        }
    }
}

impl FakeDesktopIo {
    pub fn with_clipboard(text: impl Into<String>) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().clipboard = text.into();
        fake
    }

    /// Queues the next OCR result to return.
    pub fn push_ocr_result(&self, text: impl Into<String>) {
        self.ocr_results.lock().unwrap().push_back(text.into());
    }

    pub fn clicks(&self) -> Vec<(i32, i32)> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn typed(&self) -> Vec<String> {
        self.state.lock().unwrap().typed.clone()
    }

    pub fn key_combos(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().key_combos.clone()
    }

    pub fn modifiers_released(&self) -> u32 {
        self.state.lock().unwrap().modifiers_released
    }

    pub fn clipboard(&self) -> String {
        self.state.lock().unwrap().clipboard.clone()
    }
}

#[async_trait]
impl DesktopIo for FakeDesktopIo {
    async fn screenshot(&self, rect: Rect) -> Result<CapturedImage, DesktopError> {
        if rect.width <= 0 || rect.height <= 0 {
            return Ok(CapturedImage {
                width: 0,
                height: 0,
                rgba: Vec::new(),
            });
        }
        Ok(CapturedImage {
            width: rect.width as u32,
            height: rect.height as u32,
            rgba: vec![0; (rect.width * rect.height * 4) as usize],
        })
    }

    async fn ocr(&self, image: &CapturedImage) -> Result<String, DesktopError> {
        if image.width == 0 || image.height == 0 {
            return Ok(String::new());
        }
        Ok(self
            .ocr_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn read_clipboard(&self) -> Result<String, DesktopError> {
        Ok(self.state.lock().unwrap().clipboard.clone())
    }

    async fn write_clipboard(&self, text: &str) -> Result<(), DesktopError> {
        self.state.lock().unwrap().clipboard = text.to_string();
        Ok(())
    }

    async fn click(&self, x: i32, y: i32) -> Result<(), DesktopError> {
        self.state.lock().unwrap().clicks.push((x, y));
        Ok(())
    }

    async fn type_text(&self, text: &str, _per_char_delay_ms: u64) -> Result<(), DesktopError> {
        self.state.lock().unwrap().typed.push(text.to_string());
        Ok(())
    }

    async fn key_combo(&self, seq: &[String]) -> Result<(), DesktopError> {
        self.state.lock().unwrap().key_combos.push(seq.to_vec());
        Ok(())
    }

    async fn release_modifiers(&self) -> Result<(), DesktopError> {
        self.state.lock().unwrap().modifiers_released += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_area_screenshot_yields_empty_image() {
        let fake = FakeDesktopIo::default();
        let image = fake
            .screenshot(Rect {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
            })
            .await
            .unwrap();
        assert_eq!(image.width, 0);
        assert_eq!(fake.ocr(&image).await.unwrap(), "");
    }

    #[tokio::test]
    async fn records_clicks_and_typed_text() {
        let fake = FakeDesktopIo::default();
        fake.click(100, 200).await.unwrap();
        fake.type_text("hello", 0).await.unwrap();
        assert_eq!(fake.clicks(), vec![(100, 200)]);
        assert_eq!(fake.typed(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn clipboard_round_trips() {
        let fake = FakeDesktopIo::with_clipboard("original");
        assert_eq!(fake.read_clipboard().await.unwrap(), "original");
        fake.write_clipboard("new").await.unwrap();
        assert_eq!(fake.read_clipboard().await.unwrap(), "new");
    }
}
