use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::{OutputLayout, PageError, PageRequest, PageStage, SavedPage};
use crate::config::LoaderConfig;
use crate::download::{
    DownloadObserver, DownloadScheduler, HttpClient, NoopObserver, ResourceFetcher, ResponseKind,
};
use crate::extract::extract_resources;
use crate::output::{self, OutputGuard};

/// Runs the page pipeline against a [`ResourceFetcher`].
///
/// The loader holds no per-page state and can save several pages in turn.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use page_loader_core::{HttpClient, LoaderConfig, PageLoader, PageRequest};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = LoaderConfig::default();
/// let client = HttpClient::try_new(config.retry_policy())?;
/// let loader = PageLoader::new(Arc::new(client), &config)?;
/// let request = PageRequest::new("https://example.com/", "./pages")?;
/// let saved = loader.download_page(&request).await?;
/// println!("{}", saved.page_path.display());
/// # Ok(())
/// # }
/// ```
pub struct PageLoader {
    fetcher: Arc<dyn ResourceFetcher>,
    scheduler: DownloadScheduler,
    guard: OutputGuard,
    observer: Arc<dyn DownloadObserver>,
}

impl std::fmt::Debug for PageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageLoader")
            .field("scheduler", &self.scheduler)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

impl PageLoader {
    /// Creates a loader using `config`'s concurrency and restricted
    /// directories. Retry behavior belongs to `fetcher`.
    ///
    /// # Errors
    ///
    /// [`PageError::Engine`] when `config.concurrency` is out of range.
    pub fn new(fetcher: Arc<dyn ResourceFetcher>, config: &LoaderConfig) -> Result<Self, PageError> {
        Ok(Self {
            fetcher,
            scheduler: DownloadScheduler::new(config.concurrency)?,
            guard: config.output_guard(),
            observer: Arc::new(NoopObserver),
        })
    }

    /// Replaces the progress observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DownloadObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Saves the page and its same-origin assets.
    ///
    /// Asset failures are tolerated: they are logged, listed in
    /// [`SavedPage::failed`], and the page still points at their local path.
    ///
    /// # Errors
    ///
    /// Any [`PageError`] from fetching the page, preparing the output tree,
    /// rewriting the HTML or writing the page file. Nothing is written when
    /// the page fetch fails.
    #[instrument(skip(self, request), fields(url = %request.source_url(), output_dir = %request.output_dir().display()))]
    pub async fn download_page(&self, request: &PageRequest) -> Result<SavedPage, PageError> {
        let url = request.source_url();
        // Rejected before any network traffic
        let output_dir = self.guard.check_output_dir(request.output_dir())?;

        enter(PageStage::FetchPage);
        let page = self
            .fetcher
            .fetch(url, ResponseKind::Text)
            .await
            .inspect_err(|e| failed(PageStage::FetchPage, e))?;

        enter(PageStage::ParseAndExtract);
        let extraction = extract_resources(&page.text(), url)
            .inspect_err(|e| failed(PageStage::ParseAndExtract, e))?;
        debug!(assets = extraction.assets.len(), "resources extracted");

        enter(PageStage::PrepareOutput);
        let layout = OutputLayout::for_request(request);
        self.guard
            .prepare_output(&output_dir, &layout.page_file_path, &layout.assets_dir_path)
            .await
            .inspect_err(|e| failed(PageStage::PrepareOutput, e))?;

        enter(PageStage::DownloadAssets);
        let report = self
            .scheduler
            .download_all(
                Arc::clone(&self.fetcher),
                extraction.assets,
                &layout.assets_dir_path,
                Arc::clone(&self.observer),
            )
            .await
            .inspect_err(|e| failed(PageStage::DownloadAssets, e))?;

        let failed_assets: Vec<_> = report
            .outcomes
            .into_iter()
            .filter_map(|outcome| match outcome.result {
                Ok(_) => None,
                Err(e) => Some((outcome.asset.remote_url, e.to_string())),
            })
            .collect();

        enter(PageStage::WritePage);
        let page_path = write_page(&output_dir, &layout.page_file_path, &extraction.html)
            .await
            .inspect_err(|e| failed(PageStage::WritePage, e))?;

        enter(PageStage::Done);
        if failed_assets.is_empty() {
            info!(path = %page_path.display(), downloaded = report.stats.completed(), "page saved");
        } else {
            warn!(
                path = %page_path.display(),
                downloaded = report.stats.completed(),
                failed = failed_assets.len(),
                "page saved with missing assets"
            );
        }

        Ok(SavedPage {
            page_path,
            assets_dir: layout.assets_dir_path,
            downloaded: report.stats.completed(),
            failed: failed_assets,
        })
    }
}

/// Builds an [`HttpClient`] from `config` and saves the page at `url` into
/// `output_dir`.
///
/// # Errors
///
/// See [`PageLoader::download_page`]; also [`PageError::Client`] when the
/// HTTP client cannot be built.
pub async fn download_page(
    url: &str,
    output_dir: impl AsRef<Path>,
    config: &LoaderConfig,
) -> Result<SavedPage, PageError> {
    let request = PageRequest::new(url, output_dir)?;
    let client = HttpClient::try_new(config.retry_policy()).map_err(PageError::Client)?;
    PageLoader::new(Arc::new(client), config)?
        .download_page(&request)
        .await
}

async fn write_page(
    output_dir: &Path,
    page_file_path: &Path,
    html: &str,
) -> Result<std::path::PathBuf, PageError> {
    let relative = page_file_path
        .strip_prefix(output_dir)
        .map_err(|_| output::OutputError::OutsideOutputDir {
            path: page_file_path.to_path_buf(),
            root: output_dir.to_path_buf(),
        })?;
    let path = output::write_file(output_dir, &relative.to_string_lossy(), html.as_bytes()).await?;
    Ok(path)
}

fn enter(stage: PageStage) {
    debug!(%stage, "entering stage");
}

fn failed(stage: PageStage, error: &dyn std::fmt::Display) {
    debug!(%stage, error = %error, "page download failed");
}
