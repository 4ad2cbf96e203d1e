//! Blocking HTTP backend for the analyze and history endpoints.

use reqwest::blocking::{Client, Response, multipart};
use url::Url;
use vision_flow_analysis_contract::{
    ANALYZE_EMAIL_FIELD, ANALYZE_FILE_FIELD, AnalyzeRequest, AnalyzeTransport,
};
use vision_flow_core::TransportError;
use vision_flow_history::HistoryTransport;

use crate::{APP_VERSION, AppError, ClientConfig, redact_email};

/// Backend client over `reqwest`'s blocking API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    api_base: Url,
}

impl HttpBackend {
    /// Builds a client with the configured timeout and a versioned user agent.
    ///
    /// # Errors
    /// Returns [`AppError::Http`] when the TLS backend cannot initialize.
    pub fn new(config: &ClientConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("vision-flow/{APP_VERSION}"))
            .build()?;
        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    /// API origin requests are sent to.
    pub fn api_base(&self) -> &Url {
        &self.api_base
    }
}

impl HistoryTransport for HttpBackend {
    fn fetch_history(&self, email: &str) -> Result<String, TransportError> {
        let mut url = endpoint(&self.api_base, &["history"])?;
        url.query_pairs_mut().append_pair("email", email);

        log::debug!(
            "stage=http action=fetch_history email={}",
            redact_email(email)
        );
        let response = self.client.get(url).send().map_err(map_send_error)?;
        read_body(check_status(response)?)
    }

    fn delete_entry(&self, id: i64) -> Result<(), TransportError> {
        let url = endpoint(&self.api_base, &["history", &id.to_string()])?;

        log::debug!("stage=http action=delete_entry id={id}");
        let response = self.client.delete(url).send().map_err(map_send_error)?;
        check_status(response).map(|_| ())
    }
}

impl AnalyzeTransport for HttpBackend {
    fn analyze(&self, request: &AnalyzeRequest) -> Result<String, TransportError> {
        let url = endpoint(&self.api_base, &["analyze"])?;
        let file = multipart::Part::bytes(request.content.clone())
            .file_name(request.file_name.clone());
        let form = multipart::Form::new()
            .part(ANALYZE_FILE_FIELD, file)
            .text(ANALYZE_EMAIL_FIELD, request.email.clone());

        log::debug!(
            "stage=http action=analyze bytes={} email={}",
            request.content.len(),
            redact_email(&request.email)
        );
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .map_err(map_send_error)?;
        read_body(check_status(response)?)
    }
}

/// Appends path segments to `base`, tolerating a trailing slash.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, TransportError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| TransportError::Unreachable(format!("{base} cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

// Request URLs carry the identity email, so they are stripped from messages.
fn map_send_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Unreachable(error.without_url().to_string())
    }
}

fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        log::warn!("stage=http action=status_rejected status={}", status.as_u16());
        Err(TransportError::Status(status.as_u16()))
    }
}

fn read_body(response: Response) -> Result<String, TransportError> {
    response.text().map_err(|error| {
        if error.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Decode(error.without_url().to_string())
        }
    })
}
