//! Page Loader Core Library
//!
//! This library saves a single web page together with the images,
//! stylesheets and scripts it loads from its own origin, rewriting the page
//! so those references point at the local copies.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`slug`] - URL to file name mapping
//! - [`output`] - Output directory safety checks and guarded writes
//! - [`download`] - HTTP fetching with retries and bounded concurrent downloads
//! - [`extract`] - Same-origin resource discovery and HTML rewriting
//! - [`page`] - The page pipeline tying everything together
//! - [`config`] - Runtime options
//!
//! # Example
//!
//! ```no_run
//! use page_loader_core::{LoaderConfig, download_page};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let saved = download_page("https://example.com/", "./pages", &LoaderConfig::default()).await?;
//! println!("{}", saved.page_path.display());
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod extract;
pub mod output;
pub mod page;
pub mod slug;
mod user_agent;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::LoaderConfig;
pub use download::{
    AssetError, DownloadObserver, DownloadScheduler, DownloadStats, EngineError, FailureType,
    FetchError, FetchResult, HttpClient, NoopObserver, ResourceFetcher, ResponseKind,
    RetryDecision, RetryPolicy, classify_error, with_retry,
};
pub use extract::{Asset, ExtractError, Extraction, extract_resources};
pub use output::{EntryKind, OutputError, OutputGuard};
pub use page::{
    OutputLayout, PageError, PageLoader, PageRequest, PageStage, SavedPage, download_page,
};
