#![warn(missing_docs)]
//! # vision-flow-ui
//!
//! ## Purpose
//! Defines the UI-facing state model for the detection dashboard.
//!
//! ## Responsibilities
//! - Name the workflow phases rendered by the upload panel.
//! - Collect user-visible notices so no failure goes unsignalled.
//! - Project controller and history state into a flat, read-only view.
//!
//! ## Data flow
//! Controller/history writers -> [`DashboardView::project`] -> rendering
//! shell. Failures and confirmations -> [`NoticeBoard::push`].
//!
//! ## Ownership and lifetimes
//! Views own cloned strings and results so rendering never holds borrows into
//! the writers' state.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors.
//!
//! ## Security and privacy notes
//! Views carry display names only; emails and file bytes are never projected.

use vision_flow_core::{AnalysisResult, HistoryEntry};

/// Maximum notices retained before the oldest are dropped.
pub const NOTICE_CAPACITY: usize = 32;

/// Upload/analyze workflow phase.
///
/// There is no resting failed phase. A failed submission is reported once as
/// the transition outcome, its classification stays readable as the last
/// failure, and the phase falls back to [`WorkflowPhase::FileSelected`] with
/// the file kept for a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPhase {
    /// Nothing selected; any displayed result came from history.
    Idle,
    /// A file is selected and can be submitted.
    FileSelected,
    /// An analyze request is in flight.
    Submitting,
    /// The latest submission produced the displayed result.
    Succeeded,
}

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Informational confirmation.
    Info,
    /// Recoverable failure; the user may retry.
    Warning,
    /// Failure that changed session state.
    Error,
}

/// One user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Display text.
    pub message: String,
}

/// Bounded queue of notices awaiting display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoticeBoard {
    notices: Vec<Notice>,
}

impl NoticeBoard {
    /// Creates an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a notice, dropping the oldest past [`NOTICE_CAPACITY`].
    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        if self.notices.len() == NOTICE_CAPACITY {
            self.notices.remove(0);
        }
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    /// Most recent notice.
    pub fn latest(&self) -> Option<&Notice> {
        self.notices.last()
    }

    /// All pending notices, oldest first.
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Removes and returns every pending notice.
    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

/// One row of the history sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    /// History entry id.
    pub id: i64,
    /// Detected object label.
    pub label: String,
    /// Whether this entry is the displayed result.
    pub selected: bool,
}

/// Inputs borrowed from the state writers for one projection.
#[derive(Debug, Clone, Copy)]
pub struct ViewInputs<'a> {
    /// Display name of the current identity.
    pub display_name: &'a str,
    /// Whether an identity is established.
    pub signed_in: bool,
    /// Controller phase.
    pub phase: WorkflowPhase,
    /// Selected file name, if any.
    pub pending_file_name: Option<&'a str>,
    /// Live preview handle id, if any.
    pub preview: Option<&'a str>,
    /// Displayed result, if any.
    pub result: Option<&'a AnalysisResult>,
    /// Cached history in backend order.
    pub history: &'a [HistoryEntry],
    /// Most recent notice.
    pub latest_notice: Option<&'a Notice>,
}

/// Flat read-only dashboard snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    /// Display name shown in the sidebar header.
    pub display_name: String,
    /// Whether an identity is established.
    pub signed_in: bool,
    /// Controller phase.
    pub phase: WorkflowPhase,
    /// `true` while an analyze call is in flight.
    pub busy: bool,
    /// Selected file name, if any.
    pub pending_file_name: Option<String>,
    /// Live preview handle id, if any.
    pub preview: Option<String>,
    /// Headline for the main panel.
    pub headline: String,
    /// Displayed result, if any.
    pub result: Option<AnalysisResult>,
    /// Sidebar rows.
    pub history: Vec<HistoryRow>,
    /// Sidebar status line.
    pub history_status: String,
    /// Most recent notice.
    pub latest_notice: Option<Notice>,
}

impl DashboardView {
    /// Projects writer state into a snapshot.
    pub fn project(inputs: ViewInputs<'_>) -> Self {
        let selected_id = inputs.result.and_then(|result| result.id);
        let history = inputs
            .history
            .iter()
            .map(|entry| HistoryRow {
                id: entry.id,
                label: entry.object_name.clone(),
                selected: selected_id == Some(entry.id),
            })
            .collect();

        Self {
            display_name: inputs.display_name.to_string(),
            signed_in: inputs.signed_in,
            phase: inputs.phase,
            busy: inputs.phase == WorkflowPhase::Submitting,
            pending_file_name: inputs.pending_file_name.map(str::to_string),
            preview: inputs.preview.map(str::to_string),
            headline: headline(inputs.phase, inputs.result),
            result: inputs.result.cloned(),
            history,
            history_status: history_status(inputs.history.len()),
            latest_notice: inputs.latest_notice.cloned(),
        }
    }
}

fn headline(phase: WorkflowPhase, result: Option<&AnalysisResult>) -> String {
    match (phase, result) {
        (WorkflowPhase::Submitting, _) => "Analyzing...".to_string(),
        (_, Some(result)) => format!("Result: {}", result.detected_label),
        (WorkflowPhase::FileSelected, None) => "Analyze Image".to_string(),
        (WorkflowPhase::Idle | WorkflowPhase::Succeeded, None) => {
            "Ready for Analysis".to_string()
        }
    }
}

fn history_status(count: usize) -> String {
    match count {
        0 => "No history found".to_string(),
        1 => "1 detection".to_string(),
        count => format!("{count} detections"),
    }
}
