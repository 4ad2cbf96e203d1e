#![warn(missing_docs)]
//! # vision-flow-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `vision-flow` workspace.
//!
//! ## Responsibilities
//! - Represent identities, history rows, pending uploads, and presented
//!   analysis results.
//! - Issue and revoke transient preview handles for locally selected files.
//! - Classify backend/transport failures into the workflow error taxonomy.
//!
//! ## Data flow
//! File selection creates a [`PendingFile`] holding a [`PreviewHandle`] issued
//! by [`PreviewRegistry`]. Backend rows arrive as [`HistoryEntry`] values and
//! both live and historical detections end up as [`AnalysisResult`].
//!
//! ## Ownership and lifetimes
//! Preview handles are deliberately not `Clone`: the only way to release one
//! is to hand it back to [`PreviewRegistry::revoke`], so a superseded handle
//! cannot silently outlive its pending file.
//!
//! ## Error model
//! Local validation failures return [`CoreError`]. Transport failures are
//! described by [`TransportError`] and mapped to [`ErrorKind`] with
//! [`classify_transport_error`].
//!
//! ## Security and privacy notes
//! File bytes are never logged; [`content_digest`] provides a stable
//! identifier for log lines instead.
//!
//! ## Example
//! ```rust
//! use vision_flow_core::{PendingFile, PreviewRegistry};
//!
//! let mut previews = PreviewRegistry::new();
//! let file = PendingFile::new("cat.jpg", vec![1, 2, 3], &mut previews).unwrap();
//! assert_eq!(previews.live_count(), 1);
//! previews.revoke(file.into_preview());
//! assert_eq!(previews.live_count(), 0);
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

/// Number of hex characters of the content digest embedded in preview ids.
pub const PREVIEW_DIGEST_CHARS: usize = 12;

/// Authenticated user context scoping history visibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Name shown in the dashboard header.
    pub display_name: String,
    /// Unique key used to scope history and attribute uploads.
    pub email: String,
}

impl Identity {
    /// Creates a validated identity.
    ///
    /// # Errors
    /// Returns [`CoreError::BlankEmail`] when `email` is blank.
    pub fn new(display_name: impl Into<String>, email: impl Into<String>) -> Result<Self, CoreError> {
        let email = email.into().trim().to_string();
        if email.is_empty() {
            return Err(CoreError::BlankEmail);
        }

        Ok(Self {
            display_name: display_name.into(),
            email,
        })
    }

    /// Returns the anonymous sentinel used when no session is established.
    pub fn anonymous() -> Self {
        Self {
            display_name: "User".to_string(),
            email: String::new(),
        }
    }

    /// Returns `true` for the anonymous sentinel.
    pub fn is_anonymous(&self) -> bool {
        self.email.is_empty()
    }
}

/// One persisted detection as returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Server-assigned, stable identifier.
    pub id: i64,
    /// Detected object label.
    pub object_name: String,
    /// Advice text stored with the detection.
    pub advice: String,
    /// Server-native path of the uploaded image.
    pub image_path: String,
    /// Server-native path of the generated heatmap.
    pub heatmap_path: String,
}

/// Canonical, presentation-ready outcome of a live or historical detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    /// History row id; absent for ephemeral live results.
    pub id: Option<i64>,
    /// Detected object label.
    pub detected_label: String,
    /// Human-readable recommendation.
    pub advice: String,
    /// Retrievable URL of the analysed image; a live response may omit it.
    pub original_image_ref: Option<Url>,
    /// Retrievable URL of the explainability heatmap; a live response may
    /// omit it.
    pub heatmap_ref: Option<Url>,
}

/// Transient, revocable display handle for a locally selected file.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "preview handles must be revoked through PreviewRegistry"]
pub struct PreviewHandle {
    id: String,
}

impl PreviewHandle {
    /// Returns the opaque handle id used by rendering layers.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Issues preview handles and tracks which ones are still live.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    next_sequence: u64,
    live: BTreeSet<String>,
}

impl PreviewRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new handle for `content`.
    pub fn issue(&mut self, content: &[u8]) -> PreviewHandle {
        self.next_sequence += 1;
        let digest = content_digest(content);
        let id = format!(
            "preview-{}-{}",
            self.next_sequence,
            &digest[..PREVIEW_DIGEST_CHARS]
        );
        self.live.insert(id.clone());
        PreviewHandle { id }
    }

    /// Releases `handle`. Returns `false` if it was not live.
    pub fn revoke(&mut self, handle: PreviewHandle) -> bool {
        let released = self.live.remove(&handle.id);
        if released {
            log::debug!("stage=preview action=revoke handle={}", handle.id);
        } else {
            log::warn!("stage=preview action=revoke_unknown handle={}", handle.id);
        }
        released
    }

    /// Returns `true` when `id` belongs to a live handle.
    pub fn is_live(&self, id: &str) -> bool {
        self.live.contains(id)
    }

    /// Number of handles issued and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

/// File chosen by the user and not yet analysed.
#[derive(Debug, PartialEq, Eq)]
pub struct PendingFile {
    file_name: String,
    content: Vec<u8>,
    preview: PreviewHandle,
}

impl PendingFile {
    /// Creates a pending file and issues its preview handle.
    ///
    /// # Errors
    /// Returns [`CoreError::EmptyFile`] for zero-length content and
    /// [`CoreError::BlankFileName`] when `file_name` is blank. No handle is
    /// issued on error.
    pub fn new(
        file_name: impl Into<String>,
        content: Vec<u8>,
        previews: &mut PreviewRegistry,
    ) -> Result<Self, CoreError> {
        let file_name = file_name.into();
        if file_name.trim().is_empty() {
            return Err(CoreError::BlankFileName);
        }
        if content.is_empty() {
            return Err(CoreError::EmptyFile);
        }

        let preview = previews.issue(&content);
        Ok(Self {
            file_name,
            content,
            preview,
        })
    }

    /// Original file name as chosen by the user.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Raw file bytes.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Preview handle currently owned by this file.
    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    /// Hex SHA-256 digest of the content, for log correlation.
    pub fn digest(&self) -> String {
        content_digest(&self.content)
    }

    /// Drops the content and returns the preview handle for revocation.
    pub fn into_preview(self) -> PreviewHandle {
        self.preview
    }
}

/// Returns the lowercase hex SHA-256 digest of `content`.
pub fn content_digest(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Workflow error taxonomy shared by every component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connectivity/timeout/server trouble; retry by re-invoking.
    Network,
    /// Identity rejected; the session must end.
    Auth,
    /// Local or payload validation failure; never retried over the network.
    Validation,
}

/// Failure reported by a backend transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Request did not complete in time.
    #[error("request timed out")]
    Timeout,
    /// Backend could not be reached.
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    /// Backend answered with a non-2xx status.
    #[error("backend returned status {0}")]
    Status(u16),
    /// Response body could not be decoded.
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Shorthand for [`classify_transport_error`].
    pub fn kind(&self) -> ErrorKind {
        classify_transport_error(self)
    }
}

/// Maps transport failures onto [`ErrorKind`].
///
/// 401/403 end the session, 408/429/5xx are transient, any other status is
/// a contract violation.
pub fn classify_transport_error(error: &TransportError) -> ErrorKind {
    match error {
        TransportError::Timeout | TransportError::Unreachable(_) => ErrorKind::Network,
        TransportError::Status(401 | 403) => ErrorKind::Auth,
        TransportError::Status(408 | 429) => ErrorKind::Network,
        TransportError::Status(status) if *status >= 500 => ErrorKind::Network,
        TransportError::Status(_) => ErrorKind::Validation,
        TransportError::Decode(_) => ErrorKind::Validation,
    }
}

/// Error type for core data model validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Identity email must be non-blank.
    #[error("identity email is empty")]
    BlankEmail,
    /// Selected file has no content.
    #[error("selected file is empty")]
    EmptyFile,
    /// Selected file has no usable name.
    #[error("selected file name is empty")]
    BlankFileName,
}

impl CoreError {
    /// All core errors are local validation failures.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
