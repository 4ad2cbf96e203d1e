//! Client configuration sourced from the environment.

use std::time::Duration;

use thiserror::Error;
use url::Url;
use vision_flow_assets::{AssetError, AssetLocator, DEFAULT_STATIC_PREFIX};

/// Env var naming the backend origin.
pub const API_BASE_ENV: &str = "VISION_FLOW_API_BASE";
/// Env var naming the static-asset path segment.
pub const STATIC_PREFIX_ENV: &str = "VISION_FLOW_STATIC_PREFIX";
/// Env var holding the request timeout in seconds.
pub const TIMEOUT_SECS_ENV: &str = "VISION_FLOW_TIMEOUT_SECS";

/// Backend origin used when nothing is configured.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";
/// Request timeout used when nothing is configured. Inference can be slow.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API origin; also the origin static assets are served from.
    pub api_base: Url,
    /// Path segment under `api_base` holding uploads and heatmaps.
    pub static_prefix: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Optional values that take precedence over the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Replacement API origin.
    pub api_base: Option<String>,
    /// Replacement static prefix.
    pub static_prefix: Option<String>,
    /// Replacement timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Builds a validated configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for a non-http(s) base, a blank prefix, or a
    /// zero timeout.
    pub fn new(api_base: &str, static_prefix: &str, timeout_secs: u64) -> Result<Self, ConfigError> {
        let api_base = parse_api_base(api_base)?;
        let static_prefix = static_prefix.trim().trim_matches('/').to_string();
        if static_prefix.is_empty() {
            return Err(ConfigError::InvalidStaticPrefix);
        }
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("timeout must be positive".to_string()));
        }

        if api_base.scheme() != "https" && !is_loopback(&api_base) {
            log::warn!(
                "stage=config action=insecure_transport host={}",
                api_base.host_str().unwrap_or_default()
            );
        }

        Ok(Self {
            api_base,
            static_prefix,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Reads configuration from process environment variables.
    ///
    /// # Errors
    /// See [`ClientConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, falling back to defaults for
    /// unset or blank keys.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for unparsable or invalid values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_base = read(API_BASE_ENV).unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let static_prefix =
            read(STATIC_PREFIX_ENV).unwrap_or_else(|| DEFAULT_STATIC_PREFIX.to_string());
        let timeout_secs = match read(TIMEOUT_SECS_ENV) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|error| {
                ConfigError::InvalidTimeout(format!("{TIMEOUT_SECS_ENV}={raw}: {error}"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Self::new(&api_base, &static_prefix, timeout_secs)
    }

    /// Applies explicit overrides on top of this configuration.
    ///
    /// # Errors
    /// Same validation as [`ClientConfig::new`].
    pub fn with_overrides(self, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let api_base = overrides
            .api_base
            .unwrap_or_else(|| self.api_base.to_string());
        let static_prefix = overrides.static_prefix.unwrap_or(self.static_prefix);
        let timeout_secs = overrides.timeout_secs.unwrap_or(self.timeout.as_secs());
        Self::new(&api_base, &static_prefix, timeout_secs)
    }

    /// Builds the asset locator rooted at `<api_base>/<static_prefix>/`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Asset`] when the root cannot be formed.
    pub fn locator(&self) -> Result<AssetLocator, ConfigError> {
        Ok(AssetLocator::from_api_base(
            self.api_base.as_str(),
            &self.static_prefix,
        )?)
    }
}

fn parse_api_base(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|error| ConfigError::InvalidApiBase(format!("{raw}: {error}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidApiBase(format!(
            "{raw}: expected an http(s) origin"
        )));
    }
    Ok(url)
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Ipv4(address)) => address.is_loopback(),
        Some(url::Host::Ipv6(address)) => address.is_loopback(),
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        None => false,
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// API base is not a usable http(s) origin.
    #[error("invalid api base: {0}")]
    InvalidApiBase(String),
    /// Static prefix is blank.
    #[error("static prefix must not be empty")]
    InvalidStaticPrefix,
    /// Timeout is zero or not a number.
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Asset root could not be formed.
    #[error("invalid asset root: {0}")]
    Asset(#[from] AssetError),
}
