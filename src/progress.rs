//! Progress bar for asset downloads.

use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use page_loader_core::{Asset, AssetError, DownloadObserver, DownloadStats};

/// Drives an indicatif bar from scheduler callbacks.
#[derive(Clone)]
pub(crate) struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    /// Draws to stderr when `enabled`, otherwise stays hidden.
    pub(crate) fn new(enabled: bool) -> Self {
        let bar = if enabled {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl DownloadObserver for ProgressObserver {
    fn batch_started(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn asset_started(&self, asset: &Asset) {
        self.bar.set_message(asset.remote_url.to_string());
    }

    fn asset_finished(&self, asset: &Asset, result: &Result<PathBuf, AssetError>) {
        if result.is_err() {
            self.bar.println(format!("failed: {}", asset.remote_url));
        }
        self.bar.inc(1);
    }

    fn batch_finished(&self, _stats: &DownloadStats) {
        self.bar.finish_and_clear();
    }
}
