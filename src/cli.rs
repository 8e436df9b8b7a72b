//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Save a web page and its same-origin resources to a local directory.
///
/// Images, stylesheets and scripts served from the page's own origin are
/// downloaded next to the page, and the saved HTML is rewritten to use them.
#[derive(Parser, Debug)]
#[command(name = "page-loader")]
#[command(author, version, about)]
#[command(after_help = "Example:\n  page-loader -o /tmp/pages https://example.com/")]
pub struct Args {
    /// Page URL (http or https)
    pub url: String,

    /// Output directory [default: current directory]
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Retries after the first attempt for transient failures (0-10) [default: 2]
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub retries: Option<u32>,

    /// Delay before the first retry in milliseconds, doubled for each further retry; never below 50 (max 60000) [default: 500]
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub retry_delay: Option<u64>,

    /// Request timeout in seconds (1-3600) [default: 30]
    #[arg(short = 't', long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Maximum concurrent asset downloads (1-100) [default: 5]
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress everything but errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Print the result as JSON instead of the page path
    #[arg(long)]
    pub json: bool,
}
