//! Upload/analyze state machine.
//!
//! The controller is the single writer of the pending file, its preview
//! handle, and the displayed result. Network work is split into
//! [`AnalyzeController::submit`] (issues a ticket) and
//! [`AnalyzeController::complete_submission`] (applies whatever arrives), so
//! a response can be dropped when a newer selection, a newer submission, or a
//! session change got there first.

use thiserror::Error;
use vision_flow_analysis_contract::{
    AnalysisContractError, AnalyzeRequest, ResultSource, parse_analyze_response, present,
};
use vision_flow_assets::AssetLocator;
use vision_flow_core::{
    AnalysisResult, CoreError, ErrorKind, HistoryEntry, PendingFile, PreviewRegistry,
    TransportError,
};
use vision_flow_history::DiscardReason;
use vision_flow_session::{SessionContext, SessionStamp};
use vision_flow_ui::WorkflowPhase;

/// Outstanding analyze submission.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a submission must be completed or it stays in flight"]
pub struct AnalyzeTicket {
    token: u64,
    stamp: SessionStamp,
    request: AnalyzeRequest,
}

impl AnalyzeTicket {
    /// Monotonic submission token.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Request to hand to the analyze transport.
    pub fn request(&self) -> &AnalyzeRequest {
        &self.request
    }
}

/// What happened when a submission result arrived.
#[derive(Debug)]
pub enum AnalyzeOutcome {
    /// Result adopted as the displayed result; history must be refreshed.
    Succeeded(AnalysisResult),
    /// Submission failed; the file is kept for a retry.
    Failed(ControllerError),
    /// Result ignored because something newer superseded it.
    Discarded {
        /// Why it was ignored.
        reason: DiscardReason,
        /// Whether a history refresh is still worthwhile.
        refresh_history: bool,
    },
}

impl AnalyzeOutcome {
    /// Returns `true` when the caller should re-list history.
    pub fn wants_history_refresh(&self) -> bool {
        match self {
            AnalyzeOutcome::Succeeded(_) => true,
            AnalyzeOutcome::Failed(_) => false,
            AnalyzeOutcome::Discarded {
                refresh_history, ..
            } => *refresh_history,
        }
    }
}

/// File-selection -> upload -> result controller.
#[derive(Debug)]
pub struct AnalyzeController {
    locator: AssetLocator,
    phase: WorkflowPhase,
    pending: Option<PendingFile>,
    previews: PreviewRegistry,
    current: Option<AnalysisResult>,
    next_token: u64,
    in_flight: Option<u64>,
    last_failure: Option<ErrorKind>,
}

impl AnalyzeController {
    /// Creates an idle controller resolving assets through `locator`.
    pub fn new(locator: AssetLocator) -> Self {
        Self {
            locator,
            phase: WorkflowPhase::Idle,
            pending: None,
            previews: PreviewRegistry::new(),
            current: None,
            next_token: 0,
            in_flight: None,
            last_failure: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    /// Selected file, if any.
    pub fn pending_file(&self) -> Option<&PendingFile> {
        self.pending.as_ref()
    }

    /// Live preview handle id of the selected file.
    pub fn preview_id(&self) -> Option<&str> {
        self.pending.as_ref().map(|file| file.preview().id())
    }

    /// Number of preview handles not yet released.
    pub fn live_previews(&self) -> usize {
        self.previews.live_count()
    }

    /// Displayed result, if any.
    pub fn current_result(&self) -> Option<&AnalysisResult> {
        self.current.as_ref()
    }

    /// Token of the submission whose response is still awaited.
    pub fn in_flight_token(&self) -> Option<u64> {
        self.in_flight
    }

    /// Classification of the most recent failed submission.
    pub fn last_failure(&self) -> Option<ErrorKind> {
        self.last_failure
    }

    /// Asset locator used for result construction.
    pub fn locator(&self) -> &AssetLocator {
        &self.locator
    }

    /// Selects a new file, replacing any previous selection and result.
    ///
    /// Allowed in every phase. Selecting while `Submitting` stops tracking
    /// the in-flight submission; its response will be discarded.
    ///
    /// # Errors
    /// Returns [`ControllerError::File`] for empty content or a blank name;
    /// the previous state is kept.
    pub fn select_file(
        &mut self,
        file_name: impl Into<String>,
        content: Vec<u8>,
    ) -> Result<(), ControllerError> {
        let file = PendingFile::new(file_name, content, &mut self.previews)?;

        if let Some(token) = self.in_flight.take() {
            log::info!("stage=controller action=abandon_submission token={token}");
        }
        self.release_pending();
        self.current = None;
        self.last_failure = None;

        log::info!(
            "stage=controller action=file_selected bytes={} digest={}",
            file.content().len(),
            &file.digest()[..12]
        );
        self.pending = Some(file);
        self.phase = WorkflowPhase::FileSelected;
        Ok(())
    }

    /// Starts an analyze submission for the selected file.
    ///
    /// # Errors
    /// - [`ControllerError::AlreadySubmitting`] while a submission is tracked.
    /// - [`ControllerError::NoFileSelected`] without a pending file.
    /// - [`ControllerError::Unauthenticated`] without an identity.
    ///
    /// None of these reach the network.
    pub fn submit(&mut self, session: &SessionContext) -> Result<AnalyzeTicket, ControllerError> {
        if self.phase == WorkflowPhase::Submitting {
            return Err(ControllerError::AlreadySubmitting);
        }
        let file = self.pending.as_ref().ok_or(ControllerError::NoFileSelected)?;
        let stamp = session
            .stamp()
            .map_err(|_| ControllerError::Unauthenticated)?;

        self.next_token += 1;
        let request = AnalyzeRequest {
            file_name: file.file_name().to_string(),
            content: file.content().to_vec(),
            email: stamp.email().to_string(),
        };

        self.in_flight = Some(self.next_token);
        self.phase = WorkflowPhase::Submitting;
        log::info!("stage=controller action=submit token={}", self.next_token);

        Ok(AnalyzeTicket {
            token: self.next_token,
            stamp,
            request,
        })
    }

    /// Applies the raw analyze response for `ticket`.
    pub fn complete_submission(
        &mut self,
        ticket: AnalyzeTicket,
        response: Result<String, TransportError>,
        session: &SessionContext,
    ) -> AnalyzeOutcome {
        if !session.is_current(&ticket.stamp) {
            log::info!(
                "stage=controller action=discard token={} reason=stale_session",
                ticket.token
            );
            return AnalyzeOutcome::Discarded {
                reason: DiscardReason::StaleSession,
                refresh_history: false,
            };
        }
        if self.in_flight != Some(ticket.token) {
            log::info!(
                "stage=controller action=discard token={} reason=superseded",
                ticket.token
            );
            return AnalyzeOutcome::Discarded {
                reason: DiscardReason::Superseded,
                refresh_history: response.is_ok(),
            };
        }

        self.in_flight = None;
        match self.adopt(response) {
            Ok(result) => {
                self.release_pending();
                self.current = Some(result.clone());
                self.last_failure = None;
                self.phase = WorkflowPhase::Succeeded;
                log::info!("stage=controller action=succeeded token={}", ticket.token);
                AnalyzeOutcome::Succeeded(result)
            }
            Err(error) => {
                self.last_failure = Some(error.kind());
                self.phase = WorkflowPhase::FileSelected;
                log::warn!(
                    "stage=controller action=failed token={} error={error}",
                    ticket.token
                );
                AnalyzeOutcome::Failed(error)
            }
        }
    }

    /// Displays a stored history entry.
    ///
    /// Discards any pending file; never touches the history list or the
    /// network.
    ///
    /// # Errors
    /// Returns [`ControllerError::Busy`] while `Submitting`, or
    /// [`ControllerError::Contract`] when the entry's paths cannot be
    /// resolved (state unchanged).
    pub fn view_history_entry(
        &mut self,
        entry: &HistoryEntry,
    ) -> Result<&AnalysisResult, ControllerError> {
        if self.phase == WorkflowPhase::Submitting {
            return Err(ControllerError::Busy);
        }
        let result = present(ResultSource::Historical(entry), &self.locator)?;

        self.release_pending();
        self.last_failure = None;
        self.phase = WorkflowPhase::Idle;
        log::debug!("stage=controller action=view_history id={}", entry.id);
        Ok(self.current.insert(result))
    }

    /// Clears the displayed result if it is history entry `id`.
    pub fn clear_if_displayed(&mut self, id: i64) -> bool {
        if self
            .current
            .as_ref()
            .is_some_and(|result| result.id == Some(id))
        {
            self.current = None;
            if self.phase == WorkflowPhase::Succeeded {
                self.phase = WorkflowPhase::Idle;
            }
            return true;
        }
        false
    }

    /// Drops every identity-scoped value; used on session end.
    pub fn reset(&mut self) {
        self.release_pending();
        self.current = None;
        self.in_flight = None;
        self.last_failure = None;
        self.phase = WorkflowPhase::Idle;
    }

    fn adopt(
        &self,
        response: Result<String, TransportError>,
    ) -> Result<AnalysisResult, ControllerError> {
        let body = response?;
        let parsed = parse_analyze_response(&body)?;
        Ok(present(ResultSource::Live(&parsed), &self.locator)?)
    }

    fn release_pending(&mut self) {
        if let Some(file) = self.pending.take() {
            self.previews.revoke(file.into_preview());
        }
    }
}

/// Controller errors.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Submit without a selected file.
    #[error("no file selected")]
    NoFileSelected,
    /// Submit while a submission is already tracked.
    #[error("an analysis is already in progress")]
    AlreadySubmitting,
    /// History viewing is blocked while submitting.
    #[error("cannot switch results while an analysis is in progress")]
    Busy,
    /// Submit without an identity.
    #[error("analysis requires a signed-in identity")]
    Unauthenticated,
    /// Selected file failed validation.
    #[error("invalid file: {0}")]
    File(#[from] CoreError),
    /// Analyze call failed.
    #[error("analysis request failed: {0}")]
    Transport(#[from] TransportError),
    /// Analyze response or history row was malformed.
    #[error("analysis response invalid: {0}")]
    Contract(#[from] AnalysisContractError),
}

impl ControllerError {
    /// Maps the error onto the workflow taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ControllerError::NoFileSelected
            | ControllerError::AlreadySubmitting
            | ControllerError::Busy => ErrorKind::Validation,
            ControllerError::Unauthenticated => ErrorKind::Auth,
            ControllerError::File(error) => error.kind(),
            ControllerError::Transport(error) => error.kind(),
            ControllerError::Contract(error) => error.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for controller transitions.

    use super::*;
    use vision_flow_core::Identity;

    fn controller() -> AnalyzeController {
        AnalyzeController::new(
            AssetLocator::from_api_base("http://127.0.0.1:8000", "static_uploads")
                .expect("locator should build"),
        )
    }

    fn session() -> SessionContext {
        let mut session = SessionContext::new();
        session.establish(Identity::new("Ada", "a@x.com").expect("identity should build"));
        session
    }

    const CAN: &str = r#"{"detected":"can","advice":"Crush and recycle","heatmap_url":"uploads/hm2.jpg","original_url":"uploads/img2.jpg"}"#;

    #[test]
    fn resubmit_while_submitting_is_rejected() {
        let mut controller = controller();
        let session = session();
        controller
            .select_file("scene.jpg", vec![1, 2, 3])
            .expect("file should be accepted");
        let _ticket = controller.submit(&session).expect("first submit");
        assert!(matches!(
            controller.submit(&session),
            Err(ControllerError::AlreadySubmitting)
        ));
    }

    #[test]
    fn submit_without_file_is_validation_error() {
        let mut controller = controller();
        let error = controller.submit(&session()).expect_err("nothing selected");
        assert!(matches!(error, ControllerError::NoFileSelected));
        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(controller.phase(), WorkflowPhase::Idle);
    }

    #[test]
    fn success_releases_preview_and_adopts_result() {
        let mut controller = controller();
        let session = session();
        controller
            .select_file("scene.jpg", vec![1, 2, 3])
            .expect("file should be accepted");
        let ticket = controller.submit(&session).expect("submit");

        let outcome = controller.complete_submission(ticket, Ok(CAN.to_string()), &session);
        assert!(matches!(outcome, AnalyzeOutcome::Succeeded(_)));
        assert_eq!(controller.phase(), WorkflowPhase::Succeeded);
        assert_eq!(controller.live_previews(), 0);
        assert_eq!(
            controller.current_result().map(|result| result.detected_label.as_str()),
            Some("can")
        );
    }

    #[test]
    fn failure_falls_back_to_file_selected() {
        let mut controller = controller();
        let session = session();
        controller
            .select_file("scene.jpg", vec![1, 2, 3])
            .expect("file should be accepted");
        let ticket = controller.submit(&session).expect("submit");

        let outcome = controller.complete_submission(ticket, Err(TransportError::Timeout), &session);
        assert!(matches!(outcome, AnalyzeOutcome::Failed(_)));
        assert_eq!(controller.phase(), WorkflowPhase::FileSelected);
        assert_eq!(controller.last_failure(), Some(ErrorKind::Network));
        assert!(controller.submit(&session).is_ok());
    }

    #[test]
    fn viewing_history_is_blocked_while_submitting() {
        let mut controller = controller();
        let session = session();
        controller
            .select_file("scene.jpg", vec![1])
            .expect("file should be accepted");
        let _ticket = controller.submit(&session).expect("submit");

        let entry = HistoryEntry {
            id: 1,
            object_name: "bottle".to_string(),
            advice: "Recycle it".to_string(),
            image_path: "uploads/img1.jpg".to_string(),
            heatmap_path: "uploads/hm1.jpg".to_string(),
        };
        assert!(matches!(
            controller.view_history_entry(&entry),
            Err(ControllerError::Busy)
        ));
    }
}
