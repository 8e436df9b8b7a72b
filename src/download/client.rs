//! HTTP client wrapper for fetching pages and resources.
//!
//! This module provides the [`ResourceFetcher`] seam the rest of the crate
//! fetches through, and [`HttpClient`], the reqwest-backed implementation
//! that applies timeouts and the shared retry policy.

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};
use url::Url;

use super::constants::CONNECT_TIMEOUT_SECS;
use super::error::FetchError;
use super::retry::{RetryPolicy, classify_error, with_retry};
use crate::user_agent;

/// How the response body should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Decode the body as text (HTML pages).
    Text,
    /// Keep the raw bytes (images, stylesheets, scripts).
    Binary,
}

/// A successful fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Response body.
    pub bytes: Vec<u8>,
    /// HTTP status code (always 2xx).
    pub status: u16,
    /// Value of the `Content-Type` header, empty when absent.
    pub content_type: String,
}

impl FetchResult {
    /// Body decoded as UTF-8, with invalid sequences replaced.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Anything that can turn a URL into bytes.
///
/// Implementations own their retry behavior: a returned error is final.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetches `url`, reading the body according to `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the URL cannot be fetched with a 2xx
    /// response within the retry budget.
    async fn fetch(&self, url: &Url, kind: ResponseKind) -> Result<FetchResult, FetchError>;
}

/// HTTP client for fetching pages and resources.
///
/// Created once per page and shared between all downloads to take advantage
/// of connection pooling.
///
/// # Example
///
/// ```no_run
/// use page_loader_core::download::{HttpClient, ResourceFetcher, ResponseKind, RetryPolicy};
/// use url::Url;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::try_new(RetryPolicy::default())?;
/// let url = Url::parse("https://example.com/")?;
/// let page = client.fetch(&url, ResponseKind::Text).await?;
/// println!("{} bytes", page.bytes.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry_policy: RetryPolicy,
}

impl HttpClient {
    /// Creates a client using the policy's request timeout.
    ///
    /// Configuration:
    /// - Connect timeout: 10 seconds
    /// - Request timeout: `policy.timeout()`
    /// - Gzip decompression: enabled
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error when the TLS backend or system
    /// configuration cannot be initialized.
    pub fn try_new(retry_policy: RetryPolicy) -> Result<Self, reqwest::Error> {
        let client = build_client(CONNECT_TIMEOUT_SECS, retry_policy.timeout())?;
        Ok(Self {
            client,
            retry_policy,
        })
    }

    /// Returns the retry policy applied to every fetch.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Single request, no retries.
    async fn fetch_once(&self, url: &Url, kind: ResponseKind) -> Result<FetchResult, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| map_transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url.as_str(), status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let bytes = match kind {
            ResponseKind::Text => response
                .text()
                .await
                .map(String::into_bytes)
                .map_err(|e| map_transport_error(url, e))?,
            ResponseKind::Binary => response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| map_transport_error(url, e))?,
        };

        debug!(status = status.as_u16(), len = bytes.len(), "response received");

        Ok(FetchResult {
            bytes,
            status: status.as_u16(),
            content_type,
        })
    }
}

#[async_trait]
impl ResourceFetcher for HttpClient {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url, kind: ResponseKind) -> Result<FetchResult, FetchError> {
        with_retry(
            &self.retry_policy,
            |_| self.fetch_once(url, kind),
            classify_error,
        )
        .await
        .map_err(|(e, attempts)| e.into_exhausted(attempts))
    }
}

fn build_client(connect_timeout_secs: u64, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(timeout)
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
        .build()
}

fn map_transport_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::timeout(url.as_str())
    } else if is_dns_error(&error) {
        FetchError::host_not_found(url.as_str())
    } else {
        FetchError::network(url.as_str(), error)
    }
}

/// reqwest does not expose resolver failures as a kind; look for the
/// resolver's message anywhere in the source chain.
fn is_dns_error(error: &reqwest::Error) -> bool {
    if !error.is_connect() {
        return false;
    }
    let mut source = error.source();
    while let Some(cause) = source {
        let message = cause.to_string().to_ascii_lowercase();
        if message.contains("dns error")
            || message.contains("failed to lookup address")
            || message.contains("name or service not known")
        {
            return true;
        }
        source = cause.source();
    }
    false
}
