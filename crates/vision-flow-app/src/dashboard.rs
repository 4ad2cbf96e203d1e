//! Blocking dashboard driver.
//!
//! Wires the session context, history store, and analyze controller to
//! concrete transports and turns every failure into a notice. Calls run to
//! completion one at a time, so ticket bookkeeping is only exercised for
//! ordering, never for concurrency.

use std::sync::Arc;

use vision_flow_analysis_contract::AnalyzeTransport;
use vision_flow_core::{AnalysisResult, ErrorKind, HistoryEntry, Identity};
use vision_flow_history::{
    Confirmer, HistoryClient, HistoryError, HistoryStore, HistoryTransport, ListOutcome,
    RemoveOutcome,
};
use vision_flow_session::SessionContext;
use vision_flow_ui::{DashboardView, Notice, NoticeBoard, NoticeLevel, ViewInputs};

use crate::controller::{AnalyzeController, AnalyzeOutcome, ControllerError};
use crate::{AppError, redact_email};

/// Session-scoped dashboard state plus the transports that feed it.
pub struct Dashboard {
    session: SessionContext,
    store: HistoryStore,
    history: HistoryClient,
    analyzer: Arc<dyn AnalyzeTransport>,
    controller: AnalyzeController,
    notices: NoticeBoard,
}

impl Dashboard {
    /// Creates a dashboard over separate analyze and history transports.
    pub fn new(
        session: SessionContext,
        controller: AnalyzeController,
        analyzer: Arc<dyn AnalyzeTransport>,
        history: Arc<dyn HistoryTransport>,
    ) -> Self {
        Self {
            session,
            store: HistoryStore::new(),
            history: HistoryClient::new(history),
            analyzer,
            controller,
            notices: NoticeBoard::new(),
        }
    }

    /// Creates a dashboard over one backend serving every endpoint.
    pub fn with_backend<B>(
        session: SessionContext,
        controller: AnalyzeController,
        backend: Arc<B>,
    ) -> Self
    where
        B: AnalyzeTransport + HistoryTransport + 'static,
    {
        let analyzer: Arc<dyn AnalyzeTransport> = backend.clone();
        let history: Arc<dyn HistoryTransport> = backend;
        Self::new(session, controller, analyzer, history)
    }

    /// Session context.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Analyze controller.
    pub fn controller(&self) -> &AnalyzeController {
        &self.controller
    }

    /// Cached history in backend order.
    pub fn history(&self) -> &[HistoryEntry] {
        self.store.entries()
    }

    /// Pending notices.
    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    /// Removes and returns pending notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    /// Starts a session for `identity` and loads its history.
    ///
    /// # Errors
    /// Propagates the initial listing failure (already posted as a notice).
    pub fn sign_in(&mut self, identity: Identity) -> Result<ListOutcome, AppError> {
        log::info!(
            "stage=dashboard action=sign_in email={}",
            redact_email(&identity.email)
        );
        self.store.clear();
        self.controller.reset();
        self.session.establish(identity);
        self.mount()
    }

    /// Initial load: lists history for the current identity.
    ///
    /// # Errors
    /// See [`Dashboard::refresh_history`].
    pub fn mount(&mut self) -> Result<ListOutcome, AppError> {
        self.refresh_history()
    }

    /// Re-lists history for the current identity.
    ///
    /// # Errors
    /// Returns the listing error after posting a notice. The previous list
    /// stays displayed; backend auth rejections end the session.
    pub fn refresh_history(&mut self) -> Result<ListOutcome, AppError> {
        match self.history.list(&mut self.store, &self.session) {
            Ok(outcome) => Ok(outcome),
            Err(HistoryError::Unauthenticated) => {
                self.notices
                    .push(NoticeLevel::Info, "Sign in to see your detections.");
                Err(HistoryError::Unauthenticated.into())
            }
            Err(error) => {
                self.notices.push(
                    NoticeLevel::Warning,
                    format!("Failed to fetch history: {error}"),
                );
                if error.kind() == ErrorKind::Auth {
                    self.expire_session();
                }
                Err(error.into())
            }
        }
    }

    /// Selects a file for analysis.
    ///
    /// # Errors
    /// Returns [`ControllerError::File`] (posted as a notice) for empty or
    /// unnamed files.
    pub fn select_file(
        &mut self,
        file_name: impl Into<String>,
        content: Vec<u8>,
    ) -> Result<(), AppError> {
        self.controller
            .select_file(file_name, content)
            .map_err(|error| self.report_controller_error(error))
    }

    /// Submits the selected file and waits for the result.
    ///
    /// On success the result is displayed and history is re-listed once.
    ///
    /// # Errors
    /// Returns errors raised before the request is sent (no file, already
    /// submitting, no identity). Failures of the call itself are returned as
    /// [`AnalyzeOutcome::Failed`] after posting a notice.
    pub fn analyze(&mut self) -> Result<AnalyzeOutcome, AppError> {
        let ticket = self
            .controller
            .submit(&self.session)
            .map_err(|error| self.report_controller_error(error))?;

        let response = self.analyzer.analyze(ticket.request());
        let outcome = self
            .controller
            .complete_submission(ticket, response, &self.session);

        match &outcome {
            AnalyzeOutcome::Succeeded(result) => {
                self.notices.push(
                    NoticeLevel::Info,
                    format!("Detected: {}", result.detected_label),
                );
            }
            AnalyzeOutcome::Failed(error) => {
                self.notices
                    .push(NoticeLevel::Warning, format!("Analysis failed: {error}"));
                if error.kind() == ErrorKind::Auth {
                    self.expire_session();
                }
            }
            AnalyzeOutcome::Discarded { reason, .. } => {
                log::debug!("stage=dashboard action=analyze_discarded reason={reason:?}");
            }
        }

        if outcome.wants_history_refresh()
            && let Err(error) = self.refresh_history()
        {
            log::warn!("stage=dashboard action=post_analyze_refresh_failed error={error}");
        }

        Ok(outcome)
    }

    /// Displays cached history entry `id`.
    ///
    /// # Errors
    /// Returns [`HistoryError::UnknownEntry`] for ids not in the list, or the
    /// controller's rejection while submitting.
    pub fn view_history(&mut self, id: i64) -> Result<AnalysisResult, AppError> {
        let Some(entry) = self.store.find(id).cloned() else {
            self.notices
                .push(NoticeLevel::Warning, format!("Detection #{id} is not listed."));
            return Err(HistoryError::UnknownEntry(id).into());
        };

        let viewed = self
            .controller
            .view_history_entry(&entry)
            .map(AnalysisResult::clone);
        viewed.map_err(|error| self.report_controller_error(error))
    }

    /// Deletes history entry `id` after user confirmation.
    ///
    /// A successful delete clears the displayed result when it is that entry
    /// and re-lists history.
    ///
    /// # Errors
    /// Returns the removal error after posting a notice; the list is left
    /// unchanged.
    pub fn delete_history(
        &mut self,
        id: i64,
        confirmer: &dyn Confirmer,
    ) -> Result<RemoveOutcome, AppError> {
        let outcome = match self
            .history
            .remove(&mut self.store, id, confirmer, &self.session)
        {
            Ok(outcome) => outcome,
            Err(error) => {
                self.notices
                    .push(NoticeLevel::Warning, format!("Delete failed: {error}"));
                if error.kind() == ErrorKind::Auth && !matches!(error, HistoryError::Unauthenticated)
                {
                    self.expire_session();
                }
                return Err(error.into());
            }
        };

        if let RemoveOutcome::Removed { id } = outcome {
            self.controller.clear_if_displayed(id);
            self.notices
                .push(NoticeLevel::Info, format!("Detection #{id} deleted."));
            if let Err(error) = self.refresh_history() {
                log::warn!("stage=dashboard action=post_delete_refresh_failed error={error}");
            }
        }

        Ok(outcome)
    }

    /// Logs out and drops every identity-scoped value.
    pub fn end_session(&mut self) {
        self.teardown();
        self.notices.push(NoticeLevel::Info, "Signed out.");
    }

    /// Read-only projection for rendering.
    pub fn view(&self) -> DashboardView {
        let identity = self.session.current_identity();
        DashboardView::project(ViewInputs {
            display_name: &identity.display_name,
            signed_in: self.session.is_active(),
            phase: self.controller.phase(),
            pending_file_name: self.controller.pending_file().map(|file| file.file_name()),
            preview: self.controller.preview_id(),
            result: self.controller.current_result(),
            history: self.store.entries(),
            latest_notice: self.notices.latest(),
        })
    }

    fn expire_session(&mut self) {
        log::warn!("stage=dashboard action=session_rejected");
        self.teardown();
        self.notices
            .push(NoticeLevel::Error, "Session expired. Please sign in again.");
    }

    fn teardown(&mut self) {
        self.session.end_session();
        self.store.clear();
        self.controller.reset();
    }

    fn report_controller_error(&mut self, error: ControllerError) -> AppError {
        let message = match &error {
            ControllerError::NoFileSelected => "Select an image first.".to_string(),
            ControllerError::AlreadySubmitting => "Analysis already in progress.".to_string(),
            ControllerError::Unauthenticated => "Sign in to analyze images.".to_string(),
            other => other.to_string(),
        };
        self.notices.push(NoticeLevel::Warning, message);
        error.into()
    }
}
