//! Page-level types and the download pipeline.
//!
//! A [`PageRequest`] names the page and where it goes, [`OutputLayout`]
//! derives the on-disk names, and [`PageLoader`] runs the pipeline:
//!
//! ```text
//! FETCH_PAGE → PARSE_AND_EXTRACT → PREPARE_OUTPUT → DOWNLOAD_ASSETS → WRITE_PAGE
//! ```

mod orchestrator;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

use crate::download::{EngineError, FetchError};
use crate::extract::ExtractError;
use crate::output::{self, OutputError};
use crate::slug;

pub use orchestrator::{PageLoader, download_page};

/// Errors that abort a page download.
#[derive(Debug, Error)]
pub enum PageError {
    /// The page URL could not be parsed.
    #[error("invalid page URL '{url}': {source}")]
    InvalidUrl {
        /// The rejected input.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },

    /// Only `http` and `https` pages can be downloaded.
    #[error("unsupported URL scheme '{scheme}' in {url}")]
    UnsupportedScheme {
        /// The rejected URL.
        url: String,
        /// Its scheme.
        scheme: String,
    },

    /// The HTTP client could not be created.
    #[error("failed to initialize HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The page itself could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The output tree could not be prepared or written.
    #[error(transparent)]
    Output(#[from] OutputError),

    /// The asset scheduler could not run.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The rewritten page could not be produced.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// A validated request to save one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    source_url: Url,
    output_dir: PathBuf,
}

impl PageRequest {
    /// Validates the URL and resolves `output_dir` to an absolute path.
    ///
    /// # Errors
    ///
    /// [`PageError::InvalidUrl`] for unparseable or relative URLs,
    /// [`PageError::UnsupportedScheme`] for anything but `http`/`https`,
    /// [`PageError::Output`] if the current directory is unavailable.
    pub fn new(source_url: &str, output_dir: impl AsRef<Path>) -> Result<Self, PageError> {
        let source_url = Url::parse(source_url.trim()).map_err(|source| PageError::InvalidUrl {
            url: source_url.to_string(),
            source,
        })?;
        if !matches!(source_url.scheme(), "http" | "https") {
            return Err(PageError::UnsupportedScheme {
                scheme: source_url.scheme().to_string(),
                url: source_url.to_string(),
            });
        }
        let output_dir = output::absolutize(output_dir.as_ref())?;
        Ok(Self {
            source_url,
            output_dir,
        })
    }

    /// The page URL.
    #[must_use]
    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    /// Absolute, normalized output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Where a page and its assets land on disk.
///
/// `assets_dir_path` is always a sibling of `page_file_path`, and both are
/// direct children of the request's output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Path of the rewritten HTML file.
    pub page_file_path: PathBuf,
    /// Directory holding the downloaded assets.
    pub assets_dir_path: PathBuf,
}

impl OutputLayout {
    /// Derives the layout from the page URL.
    #[must_use]
    pub fn for_request(request: &PageRequest) -> Self {
        Self {
            page_file_path: request
                .output_dir
                .join(slug::page_filename(&request.source_url)),
            assets_dir_path: request
                .output_dir
                .join(slug::assets_dirname(&request.source_url)),
        }
    }
}

/// Result of a successful page download.
#[derive(Debug, Clone)]
pub struct SavedPage {
    /// Absolute path of the written HTML file.
    pub page_path: PathBuf,
    /// Absolute path of the assets directory.
    pub assets_dir: PathBuf,
    /// Number of assets written.
    pub downloaded: usize,
    /// Assets that could not be saved, with the reason.
    pub failed: Vec<(Url, String)>,
}

impl SavedPage {
    /// Whether every referenced asset was saved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Pipeline stage, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStage {
    /// Fetching the page HTML.
    FetchPage,
    /// Parsing the page and rewriting its resource references.
    ParseAndExtract,
    /// Checking and creating the output directories.
    PrepareOutput,
    /// Downloading the same-origin assets.
    DownloadAssets,
    /// Writing the rewritten page file.
    WritePage,
    /// Every stage finished.
    Done,
}

impl fmt::Display for PageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FetchPage => "fetch_page",
            Self::ParseAndExtract => "parse_and_extract",
            Self::PrepareOutput => "prepare_output",
            Self::DownloadAssets => "download_assets",
            Self::WritePage => "write_page",
            Self::Done => "done",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_accepts_http_and_https() {
        for raw in ["http://example.com", "https://example.com/courses?x=1"] {
            let request = PageRequest::new(raw, "/tmp/out").unwrap();
            assert_eq!(request.output_dir(), Path::new("/tmp/out"));
            assert!(request.source_url().as_str().starts_with("http"));
        }
    }

    #[test]
    fn test_page_request_rejects_bad_urls() {
        assert!(matches!(
            PageRequest::new("example.com/page", "/tmp"),
            Err(PageError::InvalidUrl { .. })
        ));
        match PageRequest::new("ftp://example.com/file", "/tmp") {
            Err(PageError::UnsupportedScheme { scheme, .. }) => assert_eq!(scheme, "ftp"),
            other => panic!("Expected UnsupportedScheme, got: {other:?}"),
        }
    }

    #[test]
    fn test_page_request_absolutizes_output_dir() {
        let request = PageRequest::new("https://example.com", "out/../pages").unwrap();
        assert!(request.output_dir().is_absolute());
        assert!(request.output_dir().ends_with("pages"));
        assert!(!request.output_dir().to_string_lossy().contains(".."));
    }

    #[test]
    fn test_output_layout_for_bare_domain() {
        let request = PageRequest::new("https://example.com/", "/tmp/out").unwrap();
        let layout = OutputLayout::for_request(&request);
        assert_eq!(
            layout.page_file_path,
            PathBuf::from("/tmp/out/example.com.html")
        );
        assert_eq!(
            layout.assets_dir_path,
            PathBuf::from("/tmp/out/example.com_files")
        );
    }

    #[test]
    fn test_output_layout_entries_are_siblings_inside_output_dir() {
        let request =
            PageRequest::new("https://ru.hexlet.io/courses/../../../etc", "/tmp/out").unwrap();
        let layout = OutputLayout::for_request(&request);
        assert_eq!(layout.page_file_path.parent(), Some(Path::new("/tmp/out")));
        assert_eq!(layout.assets_dir_path.parent(), Some(Path::new("/tmp/out")));
    }

    #[test]
    fn test_page_stage_display() {
        assert_eq!(PageStage::FetchPage.to_string(), "fetch_page");
        assert_eq!(PageStage::DownloadAssets.to_string(), "download_assets");
    }
}
