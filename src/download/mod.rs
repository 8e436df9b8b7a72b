//! HTTP fetching, retries and concurrent asset downloads.
//!
//! # Features
//!
//! - [`ResourceFetcher`] seam with a reqwest-backed [`HttpClient`]
//! - Timeout plus exponential backoff retries through [`with_retry`]
//! - Semaphore-bounded concurrent downloads ([`DownloadScheduler`])
//! - Structured error types with full context
//!
//! # Example
//!
//! ```no_run
//! use page_loader_core::download::{HttpClient, ResourceFetcher, ResponseKind, RetryPolicy};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::try_new(RetryPolicy::default())?;
//! let logo = client
//!     .fetch(&Url::parse("https://example.com/images/logo.png")?, ResponseKind::Binary)
//!     .await?;
//! println!("Downloaded {} bytes", logo.bytes.len());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod engine;
mod error;
mod retry;

pub use client::{FetchResult, HttpClient, ResourceFetcher, ResponseKind};
pub use constants::DEFAULT_CONCURRENCY;
pub use engine::{
    AssetOutcome, DownloadObserver, DownloadReport, DownloadScheduler, DownloadStats, EngineError,
    NoopObserver,
};
pub use error::{AssetError, FetchError};
pub use retry::{
    FailureType, MIN_RETRY_DELAY, RetryDecision, RetryPolicy, classify_error, with_retry,
};
