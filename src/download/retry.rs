//! Retry logic with exponential backoff for transient fetch failures.
//!
//! This module provides the [`RetryPolicy`] and [`FailureType`] types for
//! classifying fetch errors and determining retry behavior, plus
//! [`with_retry`], the single retry loop shared by every fetch.
//!
//! # Overview
//!
//! When a fetch fails, the error is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - Temporary failures that may succeed on retry
//! - [`FailureType::Permanent`] - Failures that won't succeed regardless of retries
//!
//! The [`RetryPolicy`] then determines whether to retry based on failure type
//! and attempt count, calculating exponential backoff delays with jitter.
//!
//! # Example
//!
//! ```
//! use page_loader_core::download::{
//!     FetchError, RetryPolicy, FailureType, RetryDecision, classify_error
//! };
//!
//! let policy = RetryPolicy::default();
//! let error = FetchError::http_status("https://example.com/logo.png", 503);
//! let failure_type = classify_error(&error);
//!
//! match policy.should_retry(failure_type, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, instrument};

use super::FetchError;
use super::constants::{
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRIES, DEFAULT_RETRY_DELAY_MS,
};

/// Default maximum delay cap (30 seconds).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Upper bound for the jitter added to delays (500ms).
const MAX_JITTER: Duration = Duration::from_millis(500);

/// Shortest wait between two attempts, whatever the configured base delay.
pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Classification of fetch failure types.
///
/// Used to determine whether a failed fetch should be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: network timeout, connection reset, 503 Service Unavailable.
    Transient,

    /// Failure that won't succeed regardless of retries.
    ///
    /// Examples: 404 Not Found, 500 Internal Server Error, DNS failure.
    Permanent,
}

/// Decision on whether to retry a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the fetch after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry the fetch.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior with exponential backoff.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `base_delay`: 500 milliseconds
/// - `max_delay`: 30 seconds
/// - `backoff_multiplier`: 2.0
/// - `timeout`: 30 seconds per request
///
/// # Delay Calculation
///
/// ```text
/// delay = max(min(base_delay * multiplier^(attempt-1), max_delay), 50ms) + jitter
/// jitter ∈ [0, min(base_delay / 2, 500ms)]
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Base delay for the first retry.
    base_delay: Duration,

    /// Maximum delay cap.
    max_delay: Duration,

    /// Multiplier applied each attempt (typically 2.0 for doubling).
    backoff_multiplier: f32,

    /// Timeout applied to each individual request.
    timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRIES + 1,
            base_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy.
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Maximum attempts including initial (clamped to >= 1)
    /// * `base_delay` - Base delay for first retry
    /// * `timeout` - Per-request timeout
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            timeout,
            ..Self::default()
        }
    }

    /// Creates a policy with a custom max_attempts, using defaults for other settings.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Overrides the maximum delay cap.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the base delay before the first retry.
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Determines whether to retry a failed fetch.
    ///
    /// # Arguments
    ///
    /// * `failure_type` - Classification of the failure
    /// * `attempt` - The attempt number that just failed (1-indexed)
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Calculates the delay for a retry attempt with exponential backoff and jitter.
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let multiplier = f64::from(self.backoff_multiplier);

        // attempt 1 = multiplier^0 = 1x base
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * multiplier.powf(exponent);

        let capped_ms = delay_ms
            .min(self.max_delay.as_millis() as f64)
            .max(MIN_RETRY_DELAY.as_millis() as f64);

        Duration::from_millis(capped_ms as u64) + self.calculate_jitter()
    }

    /// Generates random jitter between 0 and `min(base_delay / 2, MAX_JITTER)`.
    fn calculate_jitter(&self) -> Duration {
        let bound_ms = (self.base_delay / 2).min(MAX_JITTER).as_millis() as u64;
        if bound_ms == 0 {
            return Duration::ZERO;
        }
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(0..=bound_ms))
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the policy's
/// attempt budget is spent.
///
/// `operation` receives the 1-indexed attempt number. `classify` decides
/// whether an error is worth retrying. On failure the last error is returned
/// together with the number of attempts made.
///
/// # Errors
///
/// Returns `(last_error, attempts)` when no attempt succeeded.
pub async fn with_retry<T, E, Op, Fut, C>(
    policy: &RetryPolicy,
    mut operation: Op,
    classify: C,
) -> Result<T, (E, u32)>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> FailureType,
    E: Display,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        debug!(attempt, "attempting request");

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => match policy.should_retry(classify(&e), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        attempt = next_attempt,
                        max_attempts = policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(%reason, error = %e, "not retrying request");
                    return Err((e, attempt));
                }
            },
        }
    }
}

/// Classifies a fetch error into a failure type for retry decisions.
///
/// # HTTP Status Code Classification
///
/// | Status | Type | Rationale |
/// |--------|------|-----------|
/// | 404 | Permanent | Not found - resource doesn't exist |
/// | 408 | Transient | Request timeout - may succeed |
/// | 429 | Transient | Rate limited - retry with backoff |
/// | other 4xx | Permanent | Client error - won't succeed on retry |
/// | 500 | Permanent | Definitive server-side rejection |
/// | other 5xx | Transient | Gateway/availability issue - may be temporary |
///
/// # Non-HTTP Errors
///
/// | Error | Type | Rationale |
/// |-------|------|-----------|
/// | Timeout | Transient | Network may recover |
/// | Network | Transient | Connection may come back |
/// | HostNotFound | Permanent | DNS will not start resolving on retry |
/// | InvalidUrl | Permanent | Won't succeed |
/// | EmptyResource | Permanent | Server answered, just with nothing |
#[instrument]
pub fn classify_error(error: &FetchError) -> FailureType {
    match error {
        FetchError::FetchFailed {
            status: Some(status),
            ..
        } => classify_http_status(*status),

        FetchError::Timeout { .. } | FetchError::Network { .. } => FailureType::Transient,

        FetchError::FetchFailed { status: None, .. }
        | FetchError::HostNotFound { .. }
        | FetchError::InvalidUrl { .. }
        | FetchError::EmptyResource { .. } => FailureType::Permanent,
    }
}

/// Classifies an HTTP status code into a failure type.
#[allow(clippy::match_same_arms)]
fn classify_http_status(status: u16) -> FailureType {
    match status {
        404 => FailureType::Permanent,
        408 => FailureType::Transient,
        429 => FailureType::Transient,
        500 => FailureType::Permanent,
        status if (400..500).contains(&status) => FailureType::Permanent,
        status if (500..600).contains(&status) => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}
