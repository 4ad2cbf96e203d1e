//! Shared fixtures for app integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use vision_flow_analysis_contract::{AnalyzeRequest, AnalyzeTransport};
use vision_flow_app::{AnalyzeController, Dashboard};
use vision_flow_assets::AssetLocator;
use vision_flow_core::{HistoryEntry, Identity, TransportError};
use vision_flow_history::{Confirmer, HistoryTransport};
use vision_flow_session::SessionContext;

/// In-memory backend serving analyze and history endpoints.
///
/// Every successful analyze call persists a row for the request's email,
/// mirroring the real backend.
#[derive(Debug, Default)]
pub struct FakeBackend {
    pub rows: Mutex<Vec<(String, HistoryEntry)>>,
    pub labels: Mutex<VecDeque<String>>,
    pub raw_bodies: Mutex<VecDeque<String>>,
    pub next_id: Mutex<i64>,
    pub analyze_failure: Mutex<Option<TransportError>>,
    pub fetch_failure: Mutex<Option<TransportError>>,
    pub delete_failure: Mutex<Option<TransportError>>,
    pub analyze_calls: Mutex<u32>,
    pub fetch_calls: Mutex<u32>,
    pub delete_calls: Mutex<u32>,
}

#[allow(dead_code)]
impl FakeBackend {
    /// Backend pre-seeded with `rows` owned by `email`.
    pub fn seeded(email: &str, rows: Vec<HistoryEntry>) -> Arc<Self> {
        let next_id = rows.iter().map(|entry| entry.id).max().unwrap_or(0);
        let backend = Self::default();
        *backend.rows.lock().expect("rows lock") = rows
            .into_iter()
            .map(|entry| (email.to_string(), entry))
            .collect();
        *backend.next_id.lock().expect("id lock") = next_id;
        Arc::new(backend)
    }

    /// Queues the label returned by the next analyze call.
    pub fn queue_label(&self, label: &str) {
        self.labels
            .lock()
            .expect("labels lock")
            .push_back(label.to_string());
    }

    /// Queues a verbatim analyze response body; the row is still persisted.
    pub fn queue_raw_body(&self, body: &str) {
        self.raw_bodies
            .lock()
            .expect("bodies lock")
            .push_back(body.to_string());
    }

    pub fn fail_analyze(&self, error: Option<TransportError>) {
        *self.analyze_failure.lock().expect("failure lock") = error;
    }

    pub fn fail_fetch(&self, error: Option<TransportError>) {
        *self.fetch_failure.lock().expect("failure lock") = error;
    }

    pub fn fail_delete(&self, error: Option<TransportError>) {
        *self.delete_failure.lock().expect("failure lock") = error;
    }

    pub fn analyze_calls(&self) -> u32 {
        *self.analyze_calls.lock().expect("counter lock")
    }

    pub fn fetch_calls(&self) -> u32 {
        *self.fetch_calls.lock().expect("counter lock")
    }

    pub fn delete_calls(&self) -> u32 {
        *self.delete_calls.lock().expect("counter lock")
    }
}

impl AnalyzeTransport for FakeBackend {
    fn analyze(&self, request: &AnalyzeRequest) -> Result<String, TransportError> {
        *self.analyze_calls.lock().expect("counter lock") += 1;
        if let Some(error) = self.analyze_failure.lock().expect("failure lock").clone() {
            return Err(error);
        }

        let label = self
            .labels
            .lock()
            .expect("labels lock")
            .pop_front()
            .unwrap_or_else(|| "can".to_string());
        let id = {
            let mut next_id = self.next_id.lock().expect("id lock");
            *next_id += 1;
            *next_id
        };
        let row = entry(id, &label);
        let body = serde_json::json!({
            "id": id,
            "detected": label,
            "advice": row.advice,
            "heatmap_url": row.heatmap_path,
            "original_url": row.image_path,
        });
        self.rows
            .lock()
            .expect("rows lock")
            .insert(0, (request.email.clone(), row));
        match self.raw_bodies.lock().expect("bodies lock").pop_front() {
            Some(raw) => Ok(raw),
            None => Ok(body.to_string()),
        }
    }
}

impl HistoryTransport for FakeBackend {
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

/// Creates a history row fixture with server-native paths.
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

/// Locator rooted at the default local backend.
#[allow(dead_code)]
pub fn locator() -> AssetLocator {
    AssetLocator::from_api_base("http://127.0.0.1:8000", "static_uploads")
        .expect("locator should build")
}

/// Creates a valid identity for `email`.
#[allow(dead_code)]
pub fn identity(email: &str) -> Identity {
    Identity::new("Ada", email).expect("identity should build")
}

/// Creates an active session for `email`.
#[allow(dead_code)]
pub fn session_for(email: &str) -> SessionContext {
    let mut session = SessionContext::new();
    session.establish(identity(email));
    session
}

/// Anonymous dashboard wired to `backend`.
#[allow(dead_code)]
pub fn dashboard(backend: Arc<FakeBackend>) -> Dashboard {
    Dashboard::with_backend(
        SessionContext::new(),
        AnalyzeController::new(locator()),
        backend,
    )
}
