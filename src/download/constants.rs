//! Constants for the download module (timeouts, retry and concurrency defaults).

/// HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default whole-request timeout (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRIES: u32 = 2;

/// Default base delay between retries, in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Default number of assets fetched concurrently.
pub const DEFAULT_CONCURRENCY: usize = 5;
