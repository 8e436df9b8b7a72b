//! Error types for the download module.
//!
//! This module defines structured errors for fetching pages and resources,
//! providing context-rich error messages for debugging and user feedback.

use thiserror::Error;

use crate::output::OutputError;

/// Errors that can occur while fetching a URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The provided URL is malformed or cannot be requested.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// DNS resolution failed for the URL's host.
    #[error("host not found for {url}")]
    HostNotFound {
        /// The URL whose host could not be resolved.
        url: String,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Transport-level error (connection refused or reset, TLS, broken body).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Terminal HTTP status, or a transient failure that outlived the retry budget.
    #[error("fetch failed for {url} after {attempts} attempt(s): {reason}")]
    FetchFailed {
        /// The URL that failed.
        url: String,
        /// The HTTP status code, when the server answered.
        status: Option<u16>,
        /// Number of attempts made.
        attempts: u32,
        /// Human-readable description of the last failure.
        reason: String,
    },

    /// The server answered successfully with an empty body.
    #[error("empty response body from {url}")]
    EmptyResource {
        /// The URL that returned no bytes.
        url: String,
    },
}

impl FetchError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a host-not-found error.
    pub fn host_not_found(url: impl Into<String>) -> Self {
        Self::HostNotFound { url: url.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a single-attempt HTTP status failure.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::FetchFailed {
            url: url.into(),
            status: Some(status),
            attempts: 1,
            reason: format!("HTTP {status}"),
        }
    }

    /// Creates an empty-resource error.
    pub fn empty_resource(url: impl Into<String>) -> Self {
        Self::EmptyResource { url: url.into() }
    }

    /// Returns the HTTP status code carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::FetchFailed { status, .. } => *status,
            _ => None,
        }
    }

    /// Converts the last error of a retry loop into the error surfaced to
    /// callers: transport failures become [`FetchError::FetchFailed`] and
    /// carry the attempt count.
    #[must_use]
    pub fn into_exhausted(self, attempts: u32) -> Self {
        match self {
            Self::Timeout { url } => Self::FetchFailed {
                reason: format!("timeout fetching {url}"),
                url,
                status: None,
                attempts,
            },
            Self::Network { url, source } => Self::FetchFailed {
                reason: source.to_string(),
                url,
                status: None,
                attempts,
            },
            Self::FetchFailed {
                url,
                status,
                reason,
                ..
            } => Self::FetchFailed {
                url,
                status,
                attempts,
                reason,
            },
            other => other,
        }
    }
}

/// Failure of a single asset download. Never propagated past the scheduler.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Fetching the asset failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Writing the asset to disk failed.
    #[error(transparent)]
    Output(#[from] OutputError),

    /// A different URL in the same batch already owns the local file name.
    #[error("local file {slug} for {url} is already taken by {owner}")]
    SlugTaken {
        /// The asset that was not downloaded.
        url: String,
        /// The contested file name.
        slug: String,
        /// URL the file name was given to first.
        owner: String,
    },
}
