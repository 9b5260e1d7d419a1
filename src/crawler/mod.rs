//! Crawler module for catalog fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching through the rotating identity
//! - The catalog seam for link discovery and record extraction
//! - Bounded retries with identity rotation
//! - Overall crawl coordination and checkpointing

mod catalog;
mod coordinator;
mod fetcher;
mod retry;

pub use catalog::{Catalog, HttpCatalog};
pub use coordinator::{display_name, run_crawl, Coordinator, CrawlSummary};
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use retry::{RetryExecutor, RetryOutcome};

use crate::config::{Config, RangeRequest};
use crate::HarvestError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Resolve the page range (and reload the last checkpoint when resuming)
/// 2. Build the HTTP client and the Tor rotation client
/// 3. Discover the last catalog page if every page was requested
/// 4. Walk the pages, retrying and rotating on failure
/// 5. Checkpoint the dataset and skip lists
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `range` - Pages to crawl
/// * `resume` - Continue a crawl that failed earlier
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed
/// * `Err(HarvestError)` - Crawl failed; a resume marker was written if crawling had started
pub async fn crawl(
    config: Config,
    range: RangeRequest,
    resume: bool,
) -> Result<CrawlSummary, HarvestError> {
    run_crawl(config, range, resume).await
}
