#![warn(missing_docs)]
//! # vision-flow-assets
//!
//! ## Purpose
//! Turns server-native storage paths into retrievable static-asset URLs.
//!
//! ## Responsibilities
//! - Strip directory prefixes written with either `/` or `\` separators.
//! - Join the bare file name under one fixed, identity-independent root.
//! - Pass through references that are already absolute http(s) URLs.
//!
//! ## Data flow
//! History row / analyze response path -> [`AssetLocator::resolve`] ->
//! [`url::Url`] stored in an analysis result.
//!
//! ## Ownership and lifetimes
//! The locator owns its root URL and is otherwise stateless; resolution has no
//! side effects, so the same input always yields the same URL.
//!
//! ## Error model
//! Invalid roots and paths without a usable final segment fail with
//! [`AssetError`].
//!
//! ## Security and privacy notes
//! Only the final path segment is ever forwarded, so server directory layout
//! never reaches the client URL. Segments are percent-encoded by `url`.

use thiserror::Error;
use url::Url;

/// Default path segment the backend serves uploads and heatmaps from.
pub const DEFAULT_STATIC_PREFIX: &str = "static_uploads";

/// Pure path-to-URL resolver rooted at a static-asset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLocator {
    root: Url,
}

impl AssetLocator {
    /// Creates a locator from an explicit static root URL.
    ///
    /// A missing trailing slash is added so the root always names a directory.
    ///
    /// # Errors
    /// Returns [`AssetError::InvalidRoot`] for non-http(s) or non-base URLs.
    pub fn new(root: &str) -> Result<Self, AssetError> {
        let mut root = Url::parse(root)
            .map_err(|error| AssetError::InvalidRoot(format!("invalid static root: {error}")))?;
        validate_root(&root)?;

        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        root.set_query(None);
        root.set_fragment(None);

        Ok(Self { root })
    }

    /// Creates a locator rooted at `<api_base>/<prefix>/`.
    ///
    /// # Errors
    /// Returns [`AssetError::InvalidRoot`] when `api_base` is not a usable
    /// http(s) base URL or `prefix` is blank.
    pub fn from_api_base(api_base: &str, prefix: &str) -> Result<Self, AssetError> {
        let prefix = prefix.trim_matches('/');
        if prefix.trim().is_empty() {
            return Err(AssetError::InvalidRoot("static prefix is empty".to_string()));
        }

        let mut root = Url::parse(api_base)
            .map_err(|error| AssetError::InvalidRoot(format!("invalid api base: {error}")))?;
        validate_root(&root)?;
        root.set_query(None);
        root.set_fragment(None);
        root.path_segments_mut()
            .map_err(|_| AssetError::InvalidRoot("api base cannot be a base url".to_string()))?
            .pop_if_empty()
            .extend(prefix.split('/'))
            .push("");

        Ok(Self { root })
    }

    /// Static-asset root every resolved URL lives under.
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Resolves a server-native path to its static-asset URL.
    ///
    /// # Errors
    /// Returns [`AssetError::EmptyFileName`] when the path has no final
    /// segment, and [`AssetError::InvalidFileName`] for `.`/`..`.
    pub fn resolve(&self, native_path: &str) -> Result<Url, AssetError> {
        let file_name = bare_file_name(native_path);
        if file_name.is_empty() {
            return Err(AssetError::EmptyFileName(native_path.to_string()));
        }
        if file_name == "." || file_name == ".." {
            return Err(AssetError::InvalidFileName(file_name.to_string()));
        }

        let mut url = self.root.clone();
        url.path_segments_mut()
            .map_err(|_| AssetError::InvalidRoot("static root cannot be a base url".to_string()))?
            .pop_if_empty()
            .push(file_name);
        Ok(url)
    }

    /// Resolves a reference that may already be an absolute URL.
    ///
    /// Absolute http(s) URLs are returned unchanged; anything else, including
    /// Windows drive paths, goes through [`AssetLocator::resolve`].
    ///
    /// # Errors
    /// Same as [`AssetLocator::resolve`].
    pub fn resolve_reference(&self, reference: &str) -> Result<Url, AssetError> {
        if let Ok(url) = Url::parse(reference)
            && matches!(url.scheme(), "http" | "https")
        {
            return Ok(url);
        }

        self.resolve(reference)
    }
}

/// Returns the final path segment, accepting `/` and `\` separators.
pub fn bare_file_name(native_path: &str) -> &str {
    match native_path.rfind(['/', '\\']) {
        Some(index) => &native_path[index + 1..],
        None => native_path,
    }
}

fn validate_root(root: &Url) -> Result<(), AssetError> {
    if !matches!(root.scheme(), "http" | "https") {
        return Err(AssetError::InvalidRoot(
            "static root must use http or https".to_string(),
        ));
    }
    if root.cannot_be_a_base() {
        return Err(AssetError::InvalidRoot(
            "static root cannot be a base url".to_string(),
        ));
    }
    Ok(())
}

/// Asset resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    /// Root or API base URL is unusable.
    #[error("invalid asset root: {0}")]
    InvalidRoot(String),
    /// Native path ends in a separator or is empty.
    #[error("path has no file name: {0:?}")]
    EmptyFileName(String),
    /// Final segment is a relative directory marker.
    #[error("path has an invalid file name: {0:?}")]
    InvalidFileName(String),
}
