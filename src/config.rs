//! Runtime knobs for a page download.

use std::path::PathBuf;
use std::time::Duration;

use crate::download::RetryPolicy;
use crate::download::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRIES, DEFAULT_RETRY_DELAY_MS,
};
use crate::output::{DEFAULT_RESTRICTED_DIRS, OutputGuard};

/// Options recognized by the loader.
///
/// `retries` counts retries after the first attempt, so the default of 2
/// allows three attempts per URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_delay: Duration,
    /// Whole-request timeout for each attempt.
    pub request_timeout: Duration,
    /// Maximum number of assets fetched at once (1..=100).
    pub concurrency: usize,
    /// Output directories that are always refused.
    pub restricted_dirs: Vec<PathBuf>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            restricted_dirs: DEFAULT_RESTRICTED_DIRS.iter().map(PathBuf::from).collect(),
        }
    }
}

impl LoaderConfig {
    /// Retry policy shared by the page fetch and every asset fetch.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retries.saturating_add(1),
            self.retry_delay,
            self.request_timeout,
        )
    }

    /// Guard enforcing `restricted_dirs`.
    #[must_use]
    pub fn output_guard(&self) -> OutputGuard {
        OutputGuard::new(self.restricted_dirs.iter().cloned())
    }
}
