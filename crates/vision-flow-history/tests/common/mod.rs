//! Shared fixtures for history integration tests.

use std::sync::Mutex;

use vision_flow_core::{HistoryEntry, Identity, TransportError};
use vision_flow_history::{Confirmer, HistoryTransport};
use vision_flow_session::SessionContext;

/// In-memory backend keyed by email.
#[derive(Debug, Default)]
pub struct FakeHistoryBackend {
    pub rows: Mutex<Vec<(String, HistoryEntry)>>,
    pub fetch_failure: Mutex<Option<TransportError>>,
    pub delete_failure: Mutex<Option<TransportError>>,
    pub fetch_calls: Mutex<u32>,
    pub delete_calls: Mutex<u32>,
}

impl HistoryTransport for FakeHistoryBackend {
    fn fetch_history(&self, email: &str) -> Result<String, TransportError> {
        *self.fetch_calls.lock().expect("counter lock") += 1;
        if let Some(error) = self.fetch_failure.lock().expect("failure lock").clone() {
            return Err(error);
        }

        let rows = self.rows.lock().expect("rows lock");
        let visible: Vec<&HistoryEntry> = rows
            .iter()
            .filter(|(owner, _)| owner == email)
            .map(|(_, entry)| entry)
            .collect();
        serde_json::to_string(&visible).map_err(|error| TransportError::Decode(error.to_string()))
    }

    fn delete_entry(&self, id: i64) -> Result<(), TransportError> {
        *self.delete_calls.lock().expect("counter lock") += 1;
        if let Some(error) = self.delete_failure.lock().expect("failure lock").clone() {
            return Err(error);
        }

        self.rows
            .lock()
            .expect("rows lock")
            .retain(|(_, entry)| entry.id != id);
        Ok(())
    }
}

/// Confirmer with a fixed answer.
#[allow(dead_code)]
pub struct FixedAnswer(pub bool);

impl Confirmer for FixedAnswer {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

/// Creates a history row fixture.
#[allow(dead_code)]
pub fn entry(id: i64, object_name: &str) -> HistoryEntry {
    HistoryEntry {
        id,
        object_name: object_name.to_string(),
        advice: format!("advice for {object_name}"),
        image_path: format!("uploads/img{id}.jpg"),
        heatmap_path: format!("uploads\\hm{id}.jpg"),
    }
}

/// Creates an active session for `email`.
#[allow(dead_code)]
pub fn session_for(email: &str) -> SessionContext {
    let mut session = SessionContext::new();
    session.establish(Identity::new("User", email).expect("identity should build"));
    session
}
