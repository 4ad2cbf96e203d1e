#![warn(missing_docs)]
//! # vision-flow-history
//!
//! ## Purpose
//! Fetches, deletes, and caches the signed-in identity's detection history.
//!
//! ## Responsibilities
//! - Scope every listing to the current session identity.
//! - Gate deletion behind an explicit, cancelable confirmation step.
//! - Discard listing/deletion results that arrive after a newer listing or a
//!   session change.
//! - Preserve backend order and never apply optimistic removals.
//!
//! ## Data flow
//! [`HistoryStore::begin_list`] issues a [`ListTicket`] -> transport performs
//! `GET /history?email=` -> [`HistoryStore::complete_list`] replaces the cached
//! list. Deletion goes [`HistoryStore::request_removal`] ->
//! [`PendingRemoval::confirm`] -> [`HistoryStore::begin_remove`] -> transport
//! `DELETE /history/{id}` -> [`HistoryStore::complete_remove`].
//!
//! ## Ownership and lifetimes
//! The store is the only writer of the history list. Tickets own their
//! session stamp so they can be completed after arbitrary delays.
//!
//! ## Error model
//! Read failures leave the last good list in place and return
//! [`HistoryError`]; write failures leave the list untouched. Callers map
//! [`HistoryError::kind`] to notices or session teardown.
//!
//! ## Security and privacy notes
//! Emails are passed to the transport only; log lines carry counts and ids.

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use vision_flow_analysis_contract::{AnalysisContractError, parse_history};
use vision_flow_core::{ErrorKind, HistoryEntry, TransportError};
use vision_flow_session::{SessionContext, SessionStamp};

/// Prompt shown before a destructive delete.
pub const DELETE_PROMPT: &str = "Delete this detection?";

/// Abstract transport for the history endpoints.
pub trait HistoryTransport: Send + Sync {
    /// Performs `GET /history?email=<email>` and returns the raw body.
    fn fetch_history(&self, email: &str) -> Result<String, TransportError>;

    /// Performs `DELETE /history/{id}`; any 2xx is success.
    fn delete_entry(&self, id: i64) -> Result<(), TransportError>;
}

/// User confirmation step required before deletion.
pub trait Confirmer {
    /// Returns `true` when the user accepts `prompt`.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Why a late result was dropped instead of applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Session ended or switched identity after the request was issued.
    StaleSession,
    /// A newer listing was issued after this one.
    Superseded,
}

/// Outstanding history listing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct ListTicket {
    token: u64,
    stamp: SessionStamp,
}

impl ListTicket {
    /// Email the listing is scoped to.
    pub fn email(&self) -> &str {
        self.stamp.email()
    }

    /// Monotonic listing token.
    pub fn token(&self) -> u64 {
        self.token
    }
}

/// Result of completing a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    /// Cached list was replaced.
    Applied {
        /// Number of entries now cached.
        count: usize,
    },
    /// Result arrived too late and was ignored.
    Discarded(DiscardReason),
}

/// Removal awaiting user confirmation.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a removal does nothing until it is confirmed"]
pub struct PendingRemoval {
    id: i64,
}

impl PendingRemoval {
    /// Entry the removal targets.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Asks the user; returns `None` when they cancel.
    pub fn confirm(self, confirmer: &dyn Confirmer) -> Option<ConfirmedRemoval> {
        if confirmer.confirm(DELETE_PROMPT) {
            Some(ConfirmedRemoval { id: self.id })
        } else {
            log::info!("stage=history action=remove_cancelled id={}", self.id);
            None
        }
    }
}

/// Removal the user explicitly confirmed. Only obtainable from
/// [`PendingRemoval::confirm`].
#[derive(Debug, PartialEq, Eq)]
pub struct ConfirmedRemoval {
    id: i64,
}

impl ConfirmedRemoval {
    /// Entry the removal targets.
    pub fn id(&self) -> i64 {
        self.id
    }
}

/// Outstanding delete request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct RemoveTicket {
    id: i64,
    stamp: SessionStamp,
}

impl RemoveTicket {
    /// Entry being deleted.
    pub fn id(&self) -> i64 {
        self.id
    }
}

/// Result of a removal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Entry was deleted and dropped from the cached list.
    Removed {
        /// Deleted entry id.
        id: i64,
    },
    /// User declined the confirmation; nothing was sent.
    Cancelled,
    /// Result arrived after the session changed and was ignored.
    Discarded(DiscardReason),
}

/// Identity-scoped history cache with ticketed updates.
#[derive(Debug, Default)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
    owner_epoch: Option<u64>,
    next_token: u64,
    latest_list_token: Option<u64>,
    removals_in_flight: BTreeSet<i64>,
}

impl HistoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entries in backend order.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Looks up a cached entry.
    pub fn find(&self, id: i64) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Drops every identity-scoped value; outstanding tickets go stale.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.owner_epoch = None;
        self.latest_list_token = None;
        self.removals_in_flight.clear();
    }

    /// Issues a listing for the current identity.
    ///
    /// A cache belonging to an earlier session is cleared first so another
    /// identity's rows are never shown.
    ///
    /// # Errors
    /// Returns [`HistoryError::Unauthenticated`] when no identity is active.
    pub fn begin_list(&mut self, session: &SessionContext) -> Result<ListTicket, HistoryError> {
        let stamp = session
            .stamp()
            .map_err(|_| HistoryError::Unauthenticated)?;

        if self
            .owner_epoch
            .is_some_and(|epoch| epoch != stamp.epoch())
        {
            log::info!("stage=history action=drop_foreign_cache");
            self.clear();
        }

        self.next_token += 1;
        self.latest_list_token = Some(self.next_token);
        Ok(ListTicket {
            token: self.next_token,
            stamp,
        })
    }

    /// Applies a listing result.
    ///
    /// # Errors
    /// Returns [`HistoryError::Transport`] or [`HistoryError::Contract`]; the
    /// previous list stays cached in both cases.
    pub fn complete_list(
        &mut self,
        ticket: ListTicket,
        result: Result<String, TransportError>,
        session: &SessionContext,
    ) -> Result<ListOutcome, HistoryError> {
        if !session.is_current(&ticket.stamp) {
            log::debug!("stage=history action=list_discarded reason=stale_session");
            return Ok(ListOutcome::Discarded(DiscardReason::StaleSession));
        }
        if self.latest_list_token != Some(ticket.token) {
            log::debug!(
                "stage=history action=list_discarded reason=superseded token={}",
                ticket.token
            );
            return Ok(ListOutcome::Discarded(DiscardReason::Superseded));
        }

        let body = result.map_err(|error| {
            log::warn!("stage=history action=list_failed error={error}");
            HistoryError::Transport(error)
        })?;
        let entries = parse_history(&body)?;

        let count = entries.len();
        self.entries = entries;
        self.owner_epoch = Some(ticket.stamp.epoch());
        log::info!("stage=history action=list_applied entries={count}");
        Ok(ListOutcome::Applied { count })
    }

    /// Starts the confirmation step for deleting `id`.
    ///
    /// # Errors
    /// Returns [`HistoryError::UnknownEntry`] when `id` is not cached.
    pub fn request_removal(&self, id: i64) -> Result<PendingRemoval, HistoryError> {
        if self.find(id).is_none() {
            return Err(HistoryError::UnknownEntry(id));
        }
        Ok(PendingRemoval { id })
    }

    /// Issues the delete call for a confirmed removal.
    ///
    /// # Errors
    /// Returns [`HistoryError::Unauthenticated`] without an identity and
    /// [`HistoryError::RemovalInFlight`] when the same id is already being
    /// deleted.
    pub fn begin_remove(
        &mut self,
        removal: ConfirmedRemoval,
        session: &SessionContext,
    ) -> Result<RemoveTicket, HistoryError> {
        let stamp = session
            .stamp()
            .map_err(|_| HistoryError::Unauthenticated)?;
        if !self.removals_in_flight.insert(removal.id) {
            return Err(HistoryError::RemovalInFlight(removal.id));
        }

        Ok(RemoveTicket {
            id: removal.id,
            stamp,
        })
    }

    /// Applies a delete result.
    ///
    /// A successful delete supersedes every outstanding listing, since those
    /// may still contain the removed row.
    ///
    /// # Errors
    /// Returns [`HistoryError::Transport`] on failure; the list is unchanged.
    pub fn complete_remove(
        &mut self,
        ticket: RemoveTicket,
        result: Result<(), TransportError>,
        session: &SessionContext,
    ) -> Result<RemoveOutcome, HistoryError> {
        self.removals_in_flight.remove(&ticket.id);
        if !session.is_current(&ticket.stamp) {
            return Ok(RemoveOutcome::Discarded(DiscardReason::StaleSession));
        }

        result.map_err(|error| {
            log::warn!("stage=history action=remove_failed id={} error={error}", ticket.id);
            HistoryError::Transport(error)
        })?;

        self.entries.retain(|entry| entry.id != ticket.id);
        self.latest_list_token = None;
        log::info!("stage=history action=removed id={}", ticket.id);
        Ok(RemoveOutcome::Removed { id: ticket.id })
    }
}

/// Blocking client that drives [`HistoryStore`] through a transport.
#[derive(Clone)]
pub struct HistoryClient {
    transport: Arc<dyn HistoryTransport>,
}

impl HistoryClient {
    /// Creates a client over `transport`.
    pub fn new(transport: Arc<dyn HistoryTransport>) -> Self {
        Self { transport }
    }

    /// Lists history for the current identity into `store`.
    ///
    /// # Errors
    /// See [`HistoryStore::begin_list`] and [`HistoryStore::complete_list`].
    pub fn list(
        &self,
        store: &mut HistoryStore,
        session: &SessionContext,
    ) -> Result<ListOutcome, HistoryError> {
        let ticket = store.begin_list(session)?;
        let result = self.transport.fetch_history(ticket.email());
        store.complete_list(ticket, result, session)
    }

    /// Confirms and deletes `id`.
    ///
    /// # Errors
    /// See [`HistoryStore::request_removal`], [`HistoryStore::begin_remove`],
    /// and [`HistoryStore::complete_remove`].
    pub fn remove(
        &self,
        store: &mut HistoryStore,
        id: i64,
        confirmer: &dyn Confirmer,
        session: &SessionContext,
    ) -> Result<RemoveOutcome, HistoryError> {
        let pending = store.request_removal(id)?;
        let Some(confirmed) = pending.confirm(confirmer) else {
            return Ok(RemoveOutcome::Cancelled);
        };

        let ticket = store.begin_remove(confirmed, session)?;
        let result = self.transport.delete_entry(ticket.id());
        store.complete_remove(ticket, result, session)
    }
}

/// History client errors.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// No identity is established.
    #[error("history requires a signed-in identity")]
    Unauthenticated,
    /// Entry id is not in the cached list.
    #[error("history entry {0} is not listed")]
    UnknownEntry(i64),
    /// A delete for this id is already outstanding.
    #[error("history entry {0} is already being deleted")]
    RemovalInFlight(i64),
    /// Backend call failed.
    #[error("history request failed: {0}")]
    Transport(#[source] TransportError),
    /// Backend answered with a malformed listing.
    #[error("history response invalid: {0}")]
    Contract(#[from] AnalysisContractError),
}

impl HistoryError {
    /// Maps the error onto the workflow taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HistoryError::Unauthenticated => ErrorKind::Auth,
            HistoryError::UnknownEntry(_) | HistoryError::RemovalInFlight(_) => {
                ErrorKind::Validation
            }
            HistoryError::Transport(error) => error.kind(),
            HistoryError::Contract(error) => error.kind(),
        }
    }
}
