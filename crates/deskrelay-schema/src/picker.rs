//! Coordinate-picker session state (§3, §4.3 "Picker coordination").

use serde::{Deserialize, Serialize};

use crate::ids::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickerStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickerSession {
    pub session_id: SessionId,
    pub field_name: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

impl PickerSession {
    pub fn new(session_id: SessionId, field_name: String) -> Self {
        Self {
            session_id,
            field_name,
            coordinates: None,
        }
    }

    pub fn status(&self) -> PickerStatus {
        if self.coordinates.is_some() {
            PickerStatus::Completed
        } else {
            PickerStatus::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_pending() {
        let session = PickerSession::new(SessionId::new("s1").unwrap(), "patient_coords".into());
        assert_eq!(session.status(), PickerStatus::Pending);
    }

    #[test]
    fn completes_once_coordinates_arrive() {
        let mut session = PickerSession::new(SessionId::new("s1").unwrap(), "patient_coords".into());
        session.coordinates = Some(Coordinates { x: 400, y: 650 });
        assert_eq!(session.status(), PickerStatus::Completed);
    }
}
