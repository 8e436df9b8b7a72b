//! Download scheduler for concurrent asset downloads.
//!
//! This module provides the [`DownloadScheduler`] which downloads the assets
//! of one page using a semaphore-based concurrency control pattern. Each
//! asset is fetched through a [`ResourceFetcher`] (which owns retries) and
//! written into the assets directory with the guarded writer from
//! [`crate::output`].
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use page_loader_core::download::{
//!     DownloadScheduler, HttpClient, NoopObserver, ResourceFetcher, RetryPolicy,
//! };
//!
//! # async fn example(assets: Vec<page_loader_core::Asset>) -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = DownloadScheduler::new(5)?;
//! let fetcher: Arc<dyn ResourceFetcher> = Arc::new(HttpClient::try_new(RetryPolicy::default())?);
//! let report = scheduler
//!     .download_all(fetcher, assets, Path::new("./example.com_files"), Arc::new(NoopObserver))
//!     .await?;
//! println!("Completed: {}, Failed: {}", report.stats.completed(), report.stats.failed());
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::client::{ResourceFetcher, ResponseKind};
use super::error::{AssetError, FetchError};
use crate::extract::Asset;
use crate::output;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Error type for scheduler operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Statistics from a download batch.
///
/// Uses atomic counters for thread-safe updates from concurrent download
/// tasks.
#[derive(Debug, Default)]
pub struct DownloadStats {
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl DownloadStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of assets written to disk.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Returns the number of assets that could not be downloaded.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the total number of assets processed (completed + failed).
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed() + self.failed()
    }

    fn increment_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot(&self) -> Self {
        Self {
            completed: AtomicUsize::new(self.completed()),
            failed: AtomicUsize::new(self.failed()),
        }
    }
}

/// Result of downloading a single asset.
#[derive(Debug)]
pub struct AssetOutcome {
    /// The asset that was scheduled.
    pub asset: Asset,
    /// Where it was written, or why it was not.
    pub result: Result<PathBuf, AssetError>,
}

/// Everything a batch produced.
#[derive(Debug)]
pub struct DownloadReport {
    /// One outcome per scheduled asset, in document order.
    pub outcomes: Vec<AssetOutcome>,
    /// Completed/failed counters.
    pub stats: DownloadStats,
}

/// Receives progress callbacks from the scheduler.
///
/// Callbacks run on worker tasks and must not block.
pub trait DownloadObserver: Send + Sync {
    /// Called once before any asset is fetched.
    fn batch_started(&self, _total: usize) {}

    /// Called when a worker starts on `asset`.
    fn asset_started(&self, _asset: &Asset) {}

    /// Called when `asset` has been written or has failed.
    fn asset_finished(&self, _asset: &Asset, _result: &Result<PathBuf, AssetError>) {}

    /// Called once after every worker has finished.
    fn batch_finished(&self, _stats: &DownloadStats) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl DownloadObserver for NoopObserver {}

/// Concurrent asset downloader.
///
/// # Concurrency Model
///
/// - Each asset downloads in its own Tokio task held by a [`JoinSet`]
/// - A semaphore permit is acquired before spawning each task
/// - Permits are released automatically when downloads complete (RAII)
/// - Dropping the `download_all` future aborts every in-flight task
///
/// # Failure Isolation
///
/// A failing asset is logged and reported in its [`AssetOutcome`]; it never
/// stops the other downloads and never turns into an [`EngineError`].
#[derive(Debug)]
pub struct DownloadScheduler {
    /// Semaphore for concurrency control.
    semaphore: Arc<Semaphore>,
    /// Configured concurrency limit.
    concurrency: usize,
}

impl DownloadScheduler {
    /// Creates a scheduler that keeps at most `concurrency` fetches in flight.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if the value is outside
    /// the valid range (1-100).
    ///
    /// # Example
    ///
    /// ```
    /// use page_loader_core::download::DownloadScheduler;
    ///
    /// let scheduler = DownloadScheduler::new(5).unwrap();
    /// assert_eq!(scheduler.concurrency(), 5);
    /// assert!(DownloadScheduler::new(0).is_err());
    /// ```
    #[instrument(level = "debug")]
    pub fn new(concurrency: usize) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(EngineError::InvalidConcurrency { value: concurrency });
        }

        debug!(concurrency, "creating download scheduler");

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        })
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Downloads every asset into `assets_dir`.
    ///
    /// Repeated URLs are downloaded once. An asset whose local slug is
    /// already owned by a different URL is not fetched and is reported as
    /// [`AssetError::SlugTaken`], so no two workers ever write the same path.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SemaphoreClosed`] if the semaphore is closed.
    ///
    /// Individual download failures do NOT cause this method to error.
    #[instrument(skip(self, fetcher, assets, observer), fields(assets_dir = %assets_dir.display(), count = assets.len()))]
    pub async fn download_all(
        &self,
        fetcher: Arc<dyn ResourceFetcher>,
        assets: Vec<Asset>,
        assets_dir: &Path,
        observer: Arc<dyn DownloadObserver>,
    ) -> Result<DownloadReport, EngineError> {
        let assets = unique_by_url(assets);
        let total = assets.len();
        let stats = Arc::new(DownloadStats::new());
        let mut tasks = JoinSet::new();
        let mut slots: Vec<Option<AssetOutcome>> =
            std::iter::repeat_with(|| None).take(total).collect();
        let mut owners: HashMap<String, String> = HashMap::new();

        info!(total, "starting asset downloads");
        observer.batch_started(total);

        for (index, asset) in assets.into_iter().enumerate() {
            if let Some(owner) = owners.get(&asset.local_slug) {
                let result = Err(AssetError::SlugTaken {
                    url: asset.remote_url.to_string(),
                    slug: asset.local_slug.clone(),
                    owner: owner.clone(),
                });
                warn!(
                    url = %asset.remote_url,
                    slug = %asset.local_slug,
                    owner = %owner,
                    "local file name already taken, asset skipped"
                );
                stats.increment_failed();
                observer.asset_finished(&asset, &result);
                slots[index] = Some(AssetOutcome { asset, result });
                continue;
            }
            owners.insert(asset.local_slug.clone(), asset.remote_url.to_string());

            // Blocks while `concurrency` tasks are in flight
            let permit = Arc::clone(&self.semaphore)
                .acquire_owned()
                .await
                .map_err(|_| EngineError::SemaphoreClosed)?;

            let fetcher = Arc::clone(&fetcher);
            let observer = Arc::clone(&observer);
            let stats = Arc::clone(&stats);
            let assets_dir = assets_dir.to_path_buf();

            tasks.spawn(async move {
                let _permit = permit;
                observer.asset_started(&asset);

                let result = download_one(fetcher.as_ref(), &asset, &assets_dir).await;
                match &result {
                    Ok(path) => {
                        debug!(url = %asset.remote_url, path = %path.display(), "asset saved");
                        stats.increment_completed();
                    }
                    Err(e) => {
                        warn!(url = %asset.remote_url, slug = %asset.local_slug, error = %e, "asset download failed");
                        stats.increment_failed();
                    }
                }

                observer.asset_finished(&asset, &result);
                (index, AssetOutcome { asset, result })
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                // A panicking task only loses its own asset
                Err(e) => warn!(error = %e, "download task panicked"),
            }
        }

        let stats = Arc::try_unwrap(stats).unwrap_or_else(|shared| shared.snapshot());
        info!(
            completed = stats.completed(),
            failed = stats.failed(),
            "asset downloads complete"
        );
        observer.batch_finished(&stats);

        Ok(DownloadReport {
            outcomes: slots.into_iter().flatten().collect(),
            stats,
        })
    }
}

/// Fetches one asset and writes it under `assets_dir`.
async fn download_one(
    fetcher: &dyn ResourceFetcher,
    asset: &Asset,
    assets_dir: &Path,
) -> Result<PathBuf, AssetError> {
    let fetched = fetcher
        .fetch(&asset.remote_url, ResponseKind::Binary)
        .await?;
    if fetched.bytes.is_empty() {
        return Err(FetchError::empty_resource(asset.remote_url.as_str()).into());
    }
    let path = output::write_file(assets_dir, &asset.local_slug, &fetched.bytes).await?;
    Ok(path)
}

fn unique_by_url(assets: Vec<Asset>) -> Vec<Asset> {
    let mut seen = HashSet::new();
    assets
        .into_iter()
        .filter(|asset| seen.insert(asset.remote_url.clone()))
        .collect()
}
