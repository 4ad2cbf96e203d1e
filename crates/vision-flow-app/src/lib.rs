#![warn(missing_docs)]
//! # vision-flow-app
//!
//! ## Purpose
//! Orchestrates session, history, and upload/analyze state for `vision-flow`.
//!
//! ## Responsibilities
//! - Drive the upload/analyze state machine ([`controller`]).
//! - Tie session, history, controller, and notices together ([`dashboard`]).
//! - Load client configuration from the environment ([`config`]).
//! - Talk to the detection backend over HTTP ([`http`]).
//! - Ask for delete confirmation on the terminal ([`prompt`]).
//!
//! ## Data flow
//! Stored identity -> session context -> history listing. File selection ->
//! analyze request -> response parsing -> asset resolution -> displayed
//! result -> history refresh.
//!
//! ## Ownership and lifetimes
//! The [`dashboard::Dashboard`] owns every identity-scoped value so session
//! teardown is a single call. Transports are shared via `Arc<dyn ...>`.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`] and classified through
//! [`AppError::kind`] for notices and logs.
//!
//! ## Security and privacy notes
//! - Emails and credentials are redacted before they reach logs.
//! - File bytes are never logged; only sizes and digests are.
//! - Plain-http backends on non-loopback hosts are flagged at startup.

pub mod config;
pub mod controller;
pub mod dashboard;
pub mod http;
pub mod prompt;

use thiserror::Error;
use url::Url;
use vision_flow_assets::AssetError;
use vision_flow_core::{CoreError, ErrorKind};
use vision_flow_history::HistoryError;
use vision_flow_session::SessionError;

pub use config::{ClientConfig, ConfigError, ConfigOverrides};
pub use controller::{AnalyzeController, AnalyzeOutcome, AnalyzeTicket, ControllerError};
pub use dashboard::Dashboard;
pub use http::HttpBackend;
pub use prompt::{AssumeYes, PromptConfirmer};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("VISION_FLOW_VERSION");

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Returns `true` when endpoint URL is HTTPS.
pub fn is_https_endpoint(endpoint: &str) -> bool {
    Url::parse(endpoint)
        .map(|url| url.scheme() == "https")
        .unwrap_or(false)
}

/// Masks the local part of an email for log-safe output.
///
/// Keeps the first character and the domain: `ada@x.com` -> `a***@x.com`.
/// Values without `@` are masked entirely.
pub fn redact_email(email: &str) -> String {
    let email = email.trim();
    if email.is_empty() {
        return "<none>".to_string();
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "<redacted>".to_string(),
    }
}

/// Masks values of identity and credential parameters in log-safe output.
///
/// Every `key=value` occurrence of `email`, `password`, `token`, or
/// `authorization` (case-insensitive) has its value replaced up to the next
/// `&`, whitespace, or end of input.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for key in ["email", "password", "token", "authorization"] {
        redacted = redact_key_value(&redacted, key);
    }
    redacted
}

fn redact_key_value(input: &str, key: &str) -> String {
    let marker = format!("{key}=");
    let lower = input.to_ascii_lowercase();
    let mut output = String::with_capacity(input.len());
    let mut cursor = 0;

    while let Some(offset) = lower[cursor..].find(&marker) {
        let value_start = cursor + offset + marker.len();
        let value_end = input[value_start..]
            .find(|ch: char| ch == '&' || ch.is_whitespace())
            .map_or(input.len(), |end| value_start + end);
        output.push_str(&input[cursor..value_start]);
        output.push_str("<redacted>");
        cursor = value_end;
    }
    output.push_str(&input[cursor..]);
    output
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Upload/analyze controller error.
    #[error("analyze error: {0}")]
    Controller(#[from] ControllerError),
    /// History listing or removal error.
    #[error("history error: {0}")]
    History(#[from] HistoryError),
    /// Identity validation error.
    #[error("identity error: {0}")]
    Core(#[from] CoreError),
    /// Session restore error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    /// Asset locator error.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// HTTP client construction error.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    /// Local file read error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Maps the error onto the workflow taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Controller(error) => error.kind(),
            AppError::History(error) => error.kind(),
            AppError::Core(error) => error.kind(),
            AppError::Session(error) => error.kind(),
            AppError::Http(_) => ErrorKind::Network,
            AppError::Asset(_) | AppError::Config(_) | AppError::Io(_) => ErrorKind::Validation,
        }
    }
}
