#![warn(missing_docs)]
//! # vision-flow-analysis-contract
//!
//! ## Purpose
//! Defines the analyze/history wire contract and the single presentation
//! shape both live and historical detections are merged into.
//!
//! ## Responsibilities
//! - Parse and validate analyze responses and history listings.
//! - Describe the analyze request and the transport seam that carries it.
//! - Merge a live response or a stored history row into one
//!   [`AnalysisResult`] through the asset locator.
//!
//! ## Data flow
//! Raw JSON body -> [`parse_analyze_response`] / [`parse_history`] ->
//! [`ResultSource`] -> [`present`] -> [`AnalysisResult`].
//!
//! ## Ownership and lifetimes
//! [`ResultSource`] borrows its input, so presenting never mutates or consumes
//! the response or history row it came from.
//!
//! ## Error model
//! Invalid JSON, blank mandatory fields, and unresolvable references return
//! [`AnalysisContractError`]; every variant is a validation failure
//! (malformed response).
//!
//! ## Security and privacy notes
//! Request bodies carry raw image bytes; [`AnalyzeRequest`]'s `Debug` output
//! prints only their length.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use vision_flow_assets::{AssetError, AssetLocator};
use vision_flow_core::{AnalysisResult, ErrorKind, HistoryEntry, TransportError};

/// Multipart field carrying the image bytes.
pub const ANALYZE_FILE_FIELD: &str = "file";
/// Multipart field carrying the identity email.
pub const ANALYZE_EMAIL_FIELD: &str = "email";

/// Analyze response body as emitted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    /// History row id when the backend persisted the detection.
    #[serde(default)]
    pub id: Option<i64>,
    /// Detected object label.
    pub detected: String,
    /// Advice text.
    #[serde(default)]
    pub advice: String,
    /// Heatmap URL or server-native path.
    #[serde(default, alias = "heatmap_path")]
    pub heatmap_url: Option<String>,
    /// Original image URL or server-native path.
    #[serde(default, alias = "image_path")]
    pub original_url: Option<String>,
}

/// Analyze submission handed to an [`AnalyzeTransport`].
#[derive(Clone, PartialEq, Eq)]
pub struct AnalyzeRequest {
    /// File name sent with the multipart file part.
    pub file_name: String,
    /// Raw image bytes.
    pub content: Vec<u8>,
    /// Identity email attributing the upload.
    pub email: String,
}

impl fmt::Debug for AnalyzeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzeRequest")
            .field("file_name", &self.file_name)
            .field("content_len", &self.content.len())
            .finish_non_exhaustive()
    }
}

/// Abstract transport that performs `POST /analyze`.
pub trait AnalyzeTransport: Send + Sync {
    /// Sends the request and returns the raw response body.
    fn analyze(&self, request: &AnalyzeRequest) -> Result<String, TransportError>;
}

/// Origin-tagged input to the presentation merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource<'a> {
    /// Result of a live analyze call.
    Live(&'a AnalyzeResponse),
    /// Stored detection selected from history.
    Historical(&'a HistoryEntry),
}

/// Parses and validates an analyze response body.
///
/// # Errors
/// Returns [`AnalysisContractError::Decode`] for invalid JSON and
/// [`AnalysisContractError::InvalidContract`] when the detected label is
/// missing or blank. Image references are optional.
pub fn parse_analyze_response(raw: &str) -> Result<AnalyzeResponse, AnalysisContractError> {
    let parsed: AnalyzeResponse =
        serde_json::from_str(raw).map_err(AnalysisContractError::Decode)?;

    if parsed.detected.trim().is_empty() {
        return Err(AnalysisContractError::InvalidContract(
            "detected label is empty".to_string(),
        ));
    }
    Ok(parsed)
}

/// Parses a history listing, preserving backend order.
///
/// # Errors
/// Returns [`AnalysisContractError::Decode`] for invalid JSON and
/// [`AnalysisContractError::InvalidContract`] for duplicate ids.
pub fn parse_history(raw: &str) -> Result<Vec<HistoryEntry>, AnalysisContractError> {
    let entries: Vec<HistoryEntry> =
        serde_json::from_str(raw).map_err(AnalysisContractError::Decode)?;

    let mut seen = HashSet::with_capacity(entries.len());
    for entry in &entries {
        if !seen.insert(entry.id) {
            return Err(AnalysisContractError::InvalidContract(format!(
                "duplicate history id {}",
                entry.id
            )));
        }
    }

    Ok(entries)
}

/// Merges a live or historical detection into the canonical result shape.
///
/// # Errors
/// Returns [`AnalysisContractError::Asset`] when a reference cannot be
/// resolved. Blank or absent live references become `None`.
pub fn present(
    source: ResultSource<'_>,
    locator: &AssetLocator,
) -> Result<AnalysisResult, AnalysisContractError> {
    match source {
        ResultSource::Live(response) => Ok(AnalysisResult {
            id: response.id,
            detected_label: response.detected.clone(),
            advice: response.advice.clone(),
            original_image_ref: resolve_optional(locator, response.original_url.as_deref())?,
            heatmap_ref: resolve_optional(locator, response.heatmap_url.as_deref())?,
        }),
        ResultSource::Historical(entry) => Ok(AnalysisResult {
            id: Some(entry.id),
            detected_label: entry.object_name.clone(),
            advice: entry.advice.clone(),
            original_image_ref: Some(locator.resolve(&entry.image_path)?),
            heatmap_ref: Some(locator.resolve(&entry.heatmap_path)?),
        }),
    }
}

fn resolve_optional(
    locator: &AssetLocator,
    reference: Option<&str>,
) -> Result<Option<Url>, AnalysisContractError> {
    match reference.map(str::trim) {
        Some(reference) if !reference.is_empty() => Ok(Some(locator.resolve_reference(reference)?)),
        _ => Ok(None),
    }
}

/// Analysis contract errors.
#[derive(Debug, Error)]
pub enum AnalysisContractError {
    /// JSON decode failure.
    #[error("response decode failure: {0}")]
    Decode(#[source] serde_json::Error),
    /// Parsed payload violates contract invariants.
    #[error("response contract violation: {0}")]
    InvalidContract(String),
    /// A reference could not be turned into a retrievable URL.
    #[error("unresolvable asset reference: {0}")]
    Asset(#[from] AssetError),
}

impl AnalysisContractError {
    /// Every contract failure is a malformed-response validation error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
