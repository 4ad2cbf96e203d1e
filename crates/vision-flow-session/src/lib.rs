#![warn(missing_docs)]
//! # vision-flow-session
//!
//! ## Purpose
//! Owns the identity context that scopes history and attributes uploads.
//!
//! ## Responsibilities
//! - Model session transitions (anonymous, active, ended) explicitly.
//! - Stamp identity-scoped requests so late results can be recognised as
//!   stale after logout or an identity switch.
//! - Restore an identity from the stored login record.
//!
//! ## Data flow
//! Login shell -> [`SessionContext::establish`] -> controller and history
//! client take a [`SessionStamp`] per request -> on arrival they ask
//! [`SessionContext::is_current`] before applying the result.
//!
//! ## Ownership and lifetimes
//! The context is a plain owned value handed to dependents by reference; there
//! is no ambient global identity.
//!
//! ## Error model
//! Requests that need an identity fail with [`SessionError::Unauthenticated`]
//! while anonymous. Corrupt stored records surface as
//! [`SessionError::Decode`].
//!
//! ## Security and privacy notes
//! This crate never logs raw email addresses; callers should use the app
//! crate's redaction helpers for any identity text they emit.
//!
//! ## Example
//! ```rust
//! use vision_flow_core::Identity;
//! use vision_flow_session::SessionContext;
//!
//! let mut session = SessionContext::new();
//! session.establish(Identity::new("Ada", "a@x.com").unwrap());
//! let stamp = session.stamp().unwrap();
//! session.end_session();
//! assert!(!session.is_current(&stamp));
//! ```

use serde::Deserialize;
use thiserror::Error;
use vision_flow_core::{ErrorKind, Identity};

/// Session lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No identity has been established yet.
    Anonymous,
    /// Identity is established and may scope requests.
    Active(Identity),
    /// Session was ended by logout or an auth rejection.
    Ended,
}

/// Epoch-tagged identity captured when an identity-scoped request is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStamp {
    epoch: u64,
    email: String,
}

impl SessionStamp {
    /// Session epoch at issue time.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Email the request was scoped to.
    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Lifecycle-scoped identity context with explicit teardown.
#[derive(Debug, Clone)]
pub struct SessionContext {
    state: SessionState,
    epoch: u64,
}

impl SessionContext {
    /// Creates an anonymous context at epoch 0.
    pub fn new() -> Self {
        Self {
            state: SessionState::Anonymous,
            epoch: 0,
        }
    }

    /// Creates a context from the stored login record, if any.
    ///
    /// # Errors
    /// Returns [`SessionError::Decode`] when the record is not valid JSON.
    pub fn from_stored(raw: Option<&str>) -> Result<Self, SessionError> {
        let mut context = Self::new();
        let identity = restore_identity(raw)?;
        if !identity.is_anonymous() {
            context.establish(identity);
        }
        Ok(context)
    }

    /// Returns current state snapshot.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current epoch; advances on every establish/end.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Starts a session for `identity`, replacing any previous one.
    ///
    /// The anonymous sentinel is never treated as an active identity.
    pub fn establish(&mut self, identity: Identity) {
        self.epoch += 1;
        if identity.is_anonymous() {
            log::warn!("stage=session action=establish_rejected reason=anonymous_identity");
            self.state = SessionState::Anonymous;
            return;
        }

        log::info!("stage=session action=establish epoch={}", self.epoch);
        self.state = SessionState::Active(identity);
    }

    /// Ends the session and invalidates every outstanding stamp.
    pub fn end_session(&mut self) {
        self.epoch += 1;
        self.state = SessionState::Ended;
        log::info!("stage=session action=end epoch={}", self.epoch);
    }

    /// Returns the identity or the anonymous sentinel.
    pub fn current_identity(&self) -> Identity {
        match &self.state {
            SessionState::Active(identity) => identity.clone(),
            SessionState::Anonymous | SessionState::Ended => Identity::anonymous(),
        }
    }

    /// Returns `true` while an identity is established.
    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    /// Captures the current identity for an identity-scoped request.
    ///
    /// # Errors
    /// Returns [`SessionError::Unauthenticated`] when no identity is active.
    pub fn stamp(&self) -> Result<SessionStamp, SessionError> {
        match &self.state {
            SessionState::Active(identity) => Ok(SessionStamp {
                epoch: self.epoch,
                email: identity.email.clone(),
            }),
            SessionState::Anonymous | SessionState::Ended => Err(SessionError::Unauthenticated),
        }
    }

    /// Returns `true` when `stamp` was issued by the current session.
    pub fn is_current(&self, stamp: &SessionStamp) -> bool {
        match &self.state {
            SessionState::Active(identity) => {
                stamp.epoch == self.epoch && stamp.email == identity.email
            }
            SessionState::Anonymous | SessionState::Ended => false,
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct StoredIdentity {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Restores an identity from the stored login record.
///
/// A missing record, or one with a blank email, yields
/// [`Identity::anonymous`].
///
/// # Errors
/// Returns [`SessionError::Decode`] when the record is not valid JSON.
pub fn restore_identity(raw: Option<&str>) -> Result<Identity, SessionError> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Ok(Identity::anonymous());
    };

    let stored: StoredIdentity = serde_json::from_str(raw).map_err(SessionError::Decode)?;
    let email = stored.email.unwrap_or_default();
    let display_name = stored
        .first_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| Identity::anonymous().display_name);

    Ok(Identity::new(display_name, email).unwrap_or_else(|_| Identity::anonymous()))
}

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Operation needs an established identity.
    #[error("no identity is established")]
    Unauthenticated,
    /// Stored identity record is not valid JSON.
    #[error("stored identity record is invalid: {0}")]
    Decode(#[source] serde_json::Error),
}

impl SessionError {
    /// Maps the error onto the workflow taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Unauthenticated => ErrorKind::Auth,
            SessionError::Decode(_) => ErrorKind::Validation,
        }
    }
}
