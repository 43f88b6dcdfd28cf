//! Picker session coordination (§4.3 "Picker coordination"): a single
//! global "current" pointer, single-writer, tolerant of lost intermediate
//! state because the dashboard drives the choreography.

use std::collections::HashMap;

use deskrelay_schema::{Coordinates, PickerSession, SessionId};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct PickerRegistry {
    sessions: Mutex<HashMap<String, PickerSession>>,
    current: Mutex<Option<String>>,
}

impl PickerRegistry {
    pub async fn activate(&self, session_id: SessionId, field_name: String) {
        let key = session_id.as_str().to_string();
        let session = PickerSession::new(session_id, field_name);
        self.sessions.lock().await.insert(key.clone(), session);
        *self.current.lock().await = Some(key);
    }

    /// Binds the next coordinate report to whichever session is marked
    /// current. Returns `false` if there is no current session.
    pub async fn report_coordinates(&self, x: i32, y: i32) -> bool {
        let current = self.current.lock().await.clone();
        let Some(session_id) = current else {
            return false;
        };
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(&session_id) {
            session.coordinates = Some(Coordinates { x, y });
            true
        } else {
            false
        }
    }

    pub async fn status(&self, session_id: &str) -> Option<PickerSession> {
        self.sessions.lock().await.get(session_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskrelay_schema::PickerStatus;

    #[tokio::test]
    async fn activation_then_report_binds_to_current_session() {
        let registry = PickerRegistry::default();
        registry
            .activate(SessionId::new("s1").unwrap(), "DiagnosisText".into())
            .await;
        assert!(registry.report_coordinates(100, 200).await);

        let session = registry.status("s1").await.unwrap();
        assert_eq!(session.status(), PickerStatus::Completed);
        assert_eq!(session.coordinates, Some(Coordinates { x: 100, y: 200 }));
    }

    #[tokio::test]
    async fn second_activation_moves_the_current_pointer() {
        let registry = PickerRegistry::default();
        registry.activate(SessionId::new("s1").unwrap(), "A".into()).await;
        registry.activate(SessionId::new("s2").unwrap(), "B".into()).await;
        registry.report_coordinates(1, 2).await;

        assert!(registry.status("s1").await.unwrap().coordinates.is_none());
        assert!(registry.status("s2").await.unwrap().coordinates.is_some());
    }

    #[tokio::test]
    async fn report_without_any_activation_is_a_no_op() {
        let registry = PickerRegistry::default();
        assert!(!registry.report_coordinates(1, 2).await);
    }
}
