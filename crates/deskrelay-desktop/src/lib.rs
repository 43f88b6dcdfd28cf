//! The `DesktopIO` capability (§9 "UI automation substitution").
//!
//! The source implementation couples screenshot, OCR, clipboard, keyboard,
//! and mouse through a single ecosystem library. Here the same surface is a
//! trait, so the visual interpreter and the agent's insertion logic depend
//! on a capability rather than a concrete backend; tests substitute
//! `FakeDesktopIO`.

pub mod fake;
pub mod real;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Copy)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Error)]
pub enum DesktopError {
    #[error("no primary display available")]
    NoDisplay,
    #[error("screenshot capture failed: {0}")]
    Capture(String),
    #[error("OCR failed: {0}")]
    Ocr(String),
    #[error("clipboard error: {0}")]
    Clipboard(String),
    #[error("UI automation error: {0}")]
    Automation(String),
}

/// An opaque captured image, carried as RGBA8 pixels plus dimensions so the
/// OCR step doesn't need to know which screenshot backend produced it.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[async_trait]
pub trait DesktopIo: Send + Sync {
    async fn screenshot(&self, rect: Rect) -> Result<CapturedImage, DesktopError>;
    async fn ocr(&self, image: &CapturedImage) -> Result<String, DesktopError>;
    async fn read_clipboard(&self) -> Result<String, DesktopError>;
    async fn write_clipboard(&self, text: &str) -> Result<(), DesktopError>;
    async fn click(&self, x: i32, y: i32) -> Result<(), DesktopError>;
    async fn type_text(&self, text: &str, per_char_delay_ms: u64) -> Result<(), DesktopError>;
    /// `seq` is e.g. `["ctrl", "a"]` for a chord, or a bare key for a single
    /// press; `key_combo(["tab"])` is a single Tab press.
    async fn key_combo(&self, seq: &[String]) -> Result<(), DesktopError>;
    /// Releases ctrl/alt/shift if they are currently held — the interpreter's
    /// required post-execution cleanup (§4.2).
    async fn release_modifiers(&self) -> Result<(), DesktopError>;
}
