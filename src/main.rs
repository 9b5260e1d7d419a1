//! kym-harvester main entry point
//!
//! This is the command-line interface for the resilient catalog harvester.

use clap::Parser;
use kym_harvester::config::{load_optional_config, RangeRequest};
use kym_harvester::crawler::crawl;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// kym-harvester: a resilient meme catalog harvester
///
/// Walks the catalog page by page, extracts a record per entry and
/// checkpoints the dataset. Failed requests are retried behind a fresh Tor
/// circuit and user agent.
#[derive(Parser, Debug)]
#[command(name = "kym-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A resilient meme catalog harvester", long_about = None)]
struct Cli {
    /// Crawl every catalog page
    #[arg(short, long)]
    all: bool,

    /// First page to crawl
    #[arg(short, long, value_name = "PAGE")]
    start: Option<u32>,

    /// Last page to crawl (inclusive)
    #[arg(short, long, value_name = "PAGE")]
    end: Option<u32>,

    /// Continue from the resume marker left by a failed crawl
    #[arg(long)]
    resume: bool,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }
    let config = match load_optional_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let range = RangeRequest {
        all: cli.all,
        start: cli.start,
        end: cli.end,
    };

    match crawl(config, range, cli.resume).await {
        Ok(summary) => {
            tracing::info!(
                "Successfully scraped {} memes from {} pages",
                summary.records,
                summary.pages
            );
            if summary.skipped_pages > 0 || summary.skipped_items > 0 {
                tracing::warn!(
                    "{} pages and {} entries could not be fetched",
                    summary.skipped_pages,
                    summary.skipped_items
                );
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("kym_harvester=info,warn"),
            1 => EnvFilter::new("kym_harvester=debug,info"),
            2 => EnvFilter::new("kym_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
