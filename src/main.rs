//! CLI entry point for the page-loader tool.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use page_loader_core::{HttpClient, LoaderConfig, PageLoader, PageRequest, SavedPage};
use serde::Serialize;
use tracing::{debug, info};

mod app_config;
mod cli;
mod progress;

use app_config::FileConfig;
use cli::Args;
use progress::ProgressObserver;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    init_tracing(&args);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn).
fn init_tracing(args: &Args) {
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(args: Args) -> Result<()> {
    debug!(?args, "CLI arguments parsed");

    let loaded = app_config::load_file_config(args.config.as_deref())?;
    if let Some(path) = &loaded.path {
        debug!(path = %path.display(), loaded = loaded.config.is_some(), "config file");
    }
    let (config, output_dir) = resolve_settings(&args, loaded.config.as_ref());
    debug!(?config, output_dir = %output_dir.display(), "effective settings");

    let request = PageRequest::new(&args.url, &output_dir)
        .with_context(|| format!("Cannot download '{}'", args.url))?;
    let client =
        HttpClient::try_new(config.retry_policy()).context("Failed to build HTTP client")?;

    let show_progress = !args.no_progress && !args.quiet && !args.json && io::stderr().is_terminal();
    let loader = PageLoader::new(Arc::new(client), &config)?
        .with_observer(Arc::new(ProgressObserver::new(show_progress)));

    info!(url = %request.source_url(), "page-loader starting");

    let saved = tokio::select! {
        result = loader.download_page(&request) => {
            result.with_context(|| format!("Failed to download '{}'", request.source_url()))?
        }
        _ = tokio::signal::ctrl_c() => {
            bail!("interrupted; files already written were left in place");
        }
    };

    report(&saved, &args)
}

/// Merges CLI flags over the config file over built-in defaults.
fn resolve_settings(args: &Args, file: Option<&FileConfig>) -> (LoaderConfig, PathBuf) {
    let mut config = LoaderConfig::default();
    if let Some(file) = file {
        file.apply_to(&mut config);
    }

    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if let Some(delay) = args.retry_delay {
        config.retry_delay = Duration::from_millis(delay);
    }
    if let Some(timeout) = args.timeout {
        config.request_timeout = Duration::from_secs(timeout);
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = usize::from(concurrency);
    }

    let output_dir = args
        .output
        .clone()
        .or_else(|| file.and_then(|f| f.output_dir.clone()))
        .unwrap_or_else(|| PathBuf::from("."));

    (config, output_dir)
}

#[derive(Debug, Serialize)]
struct JsonReport {
    page_path: PathBuf,
    assets_dir: PathBuf,
    downloaded: usize,
    failed: Vec<JsonFailure>,
}

#[derive(Debug, Serialize)]
struct JsonFailure {
    url: String,
    reason: String,
}

impl From<&SavedPage> for JsonReport {
    fn from(saved: &SavedPage) -> Self {
        Self {
            page_path: saved.page_path.clone(),
            assets_dir: saved.assets_dir.clone(),
            downloaded: saved.downloaded,
            failed: saved
                .failed
                .iter()
                .map(|(url, reason)| JsonFailure {
                    url: url.to_string(),
                    reason: reason.clone(),
                })
                .collect(),
        }
    }
}

fn report(saved: &SavedPage, args: &Args) -> Result<()> {
    if args.json {
        let json = serde_json::to_string_pretty(&JsonReport::from(saved))
            .context("Failed to encode result as JSON")?;
        println!("{json}");
        return Ok(());
    }

    if !saved.is_complete() && !args.quiet {
        eprintln!(
            "warning: {} of {} assets could not be saved",
            saved.failed.len(),
            saved.failed.len() + saved.downloaded
        );
        for (url, reason) in &saved.failed {
            eprintln!("  {url}: {reason}");
        }
    }
    println!("{}", saved.page_path.display());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["page-loader"];
        argv.extend_from_slice(extra);
        argv.push("https://example.com/");
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_resolve_settings_defaults() {
        let (config, output_dir) = resolve_settings(&args(&[]), None);
        assert_eq!(config, LoaderConfig::default());
        assert_eq!(output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_resolve_settings_file_over_defaults() {
        let file = FileConfig {
            output_dir: Some(PathBuf::from("/tmp/from-file")),
            concurrency: Some(2),
            retry_delay_ms: Some(100),
            ..FileConfig::default()
        };
        let (config, output_dir) = resolve_settings(&args(&[]), Some(&file));
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.retry_delay, Duration::from_millis(100));
        assert_eq!(output_dir, PathBuf::from("/tmp/from-file"));
    }

    #[test]
    fn test_resolve_settings_cli_over_file() {
        let file = FileConfig {
            output_dir: Some(PathBuf::from("/tmp/from-file")),
            concurrency: Some(2),
            retries: Some(7),
            ..FileConfig::default()
        };
        let (config, output_dir) = resolve_settings(
            &args(&["-o", "/tmp/from-cli", "-c", "9", "-t", "4"]),
            Some(&file),
        );
        assert_eq!(config.concurrency, 9);
        assert_eq!(config.retries, 7);
        assert_eq!(config.request_timeout, Duration::from_secs(4));
        assert_eq!(output_dir, PathBuf::from("/tmp/from-cli"));
    }

    #[test]
    fn test_json_report_lists_failures() {
        let saved = SavedPage {
            page_path: PathBuf::from("/tmp/example.com.html"),
            assets_dir: PathBuf::from("/tmp/example.com_files"),
            downloaded: 1,
            failed: vec![(
                url::Url::parse("https://example.com/a.png").unwrap(),
                "HTTP 500".to_string(),
            )],
        };
        let json = serde_json::to_value(JsonReport::from(&saved)).unwrap();
        assert_eq!(json["downloaded"], 1);
        assert_eq!(json["failed"][0]["url"], "https://example.com/a.png");
        assert_eq!(json["page_path"], "/tmp/example.com.html");
    }
}
