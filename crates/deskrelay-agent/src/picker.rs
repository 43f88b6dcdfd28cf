//! The coordinate picker: a one-shot raw click listener armed on the picker
//! hotkey (§4.4 "Coordinate picker"), re-expressed from the source's
//! fullscreen Tk overlay as a headless-capable raw input grab — the overlay
//! itself is platform-specific UI chrome this behavior doesn't depend on.

use tokio::sync::oneshot;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickOutcome {
    Picked { x: i32, y: i32 },
    Cancelled,
}

/// Arms a one-shot listener: the next left click reports its absolute screen
/// coordinates, `Escape` cancels. Blocks the calling blocking-pool thread
/// until one of those happens.
pub fn pick_once() -> PickOutcome {
    let (tx, rx) = std::sync::mpsc::channel();
    let tx_click = tx.clone();
    let last_position = std::sync::Arc::new(std::sync::Mutex::new((0.0_f64, 0.0_f64)));
    let last_position_writer = last_position.clone();

    let result = rdev::listen(move |event| match event.event_type {
        rdev::EventType::MouseMove { x, y } => {
            *last_position_writer.lock().unwrap() = (x, y);
        }
        rdev::EventType::ButtonPress(rdev::Button::Left) => {
            let (x, y) = *last_position.lock().unwrap();
            let _ = tx_click.send(PickOutcome::Picked {
                x: x as i32,
                y: y as i32,
            });
        }
        rdev::EventType::KeyPress(rdev::Key::Escape) => {
            let _ = tx.send(PickOutcome::Cancelled);
        }
        _ => {}
    });

    if let Err(e) = result {
        warn!(error = ?e, "raw input listener failed to start");
        return PickOutcome::Cancelled;
    }

    rx.recv().unwrap_or(PickOutcome::Cancelled)
}

/// Spawns `pick_once` on the blocking pool and reports the outcome through
/// the returned receiver, so callers don't block the async runtime.
pub fn spawn_pick() -> oneshot::Receiver<PickOutcome> {
    let (tx, rx) = oneshot::channel();
    tokio::task::spawn_blocking(move || {
        let outcome = pick_once();
        let _ = tx.send(outcome);
    });
    rx
}
