//! The catalog being crawled
//!
//! [`Catalog`] is the seam between the coordinator and the site: link
//! discovery for a listing page and record extraction for an entry, both
//! returning an empty result on any failure. [`HttpCatalog`] is the real
//! implementation on top of the fetcher and the extractors.

use crate::config::SiteConfig;
use crate::crawler::fetcher::{build_http_client, fetch_url, FetchResult};
use crate::extract::{extract_last_page, extract_links, extract_record};
use crate::identity::Identity;
use crate::state::Record;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// A paginated catalog of entries
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Entry links on listing page `page`, empty on any failure
    async fn page_links(&self, page: u32, identity: &Identity) -> Vec<String>;

    /// Record of the entry at `link`, `None` on any failure
    async fn record(&self, link: &str, identity: &Identity) -> Option<Record>;

    /// Exclusive end page of the whole catalog
    async fn last_page(&self, identity: &Identity) -> Result<u32, HarvestError>;

    /// Public address the catalog sees requests coming from
    ///
    /// Diagnostic only; the default reports nothing.
    async fn current_ip(&self, _identity: &Identity) -> Option<String> {
        None
    }
}

/// Catalog fetched over HTTP
pub struct HttpCatalog {
    client: Client,
    site: SiteConfig,
    base_url: Url,
    catalog_prefix: String,
}

impl HttpCatalog {
    /// Creates a catalog client, optionally routed through a SOCKS proxy
    pub fn new(site: SiteConfig, proxy: Option<&str>) -> Result<Self, HarvestError> {
        let client = build_http_client(&site, proxy)?;
        let base_url = Url::parse(&site.base_url)?;
        let catalog_prefix = catalog_prefix(&site.index_path);

        Ok(Self {
            client,
            site,
            base_url,
            catalog_prefix,
        })
    }

    async fn fetch_body(&self, url: &str, identity: &Identity) -> Option<String> {
        match fetch_url(&self.client, url, identity).await {
            FetchResult::Success {
                final_url,
                status_code,
                body,
            } => {
                tracing::debug!("GET {} -> {} ({} bytes)", final_url, status_code, body.len());
                Some(body)
            }
            FetchResult::HttpError { status_code } => {
                tracing::debug!("GET {} returned HTTP {}", url, status_code);
                None
            }
            FetchResult::NetworkError { error } => {
                tracing::debug!("GET {} failed: {}", url, error);
                None
            }
        }
    }
}

/// Path prefix shared by internal catalog links, `/memes/all` gives `/memes`
fn catalog_prefix(index_path: &str) -> String {
    let first = index_path.trim_start_matches('/').split('/').next().unwrap_or_default();
    format!("/{}", first)
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn page_links(&self, page: u32, identity: &Identity) -> Vec<String> {
        let url = self.site.listing_url(page);
        match self.fetch_body(&url, identity).await {
            Some(body) => extract_links(&body, &self.base_url),
            None => Vec::new(),
        }
    }

    async fn record(&self, link: &str, identity: &Identity) -> Option<Record> {
        let body = self.fetch_body(link, identity).await?;
        Some(extract_record(&body, link, &self.catalog_prefix))
    }

    async fn last_page(&self, identity: &Identity) -> Result<u32, HarvestError> {
        let url = self.site.index_url();
        let body = self
            .fetch_body(&url, identity)
            .await
            .ok_or_else(|| HarvestError::Discovery(format!("could not fetch {}", url)))?;

        extract_last_page(&body, self.site.items_per_page).ok_or_else(|| {
            HarvestError::Discovery(format!("no entry count found on {}", url))
        })
    }

    async fn current_ip(&self, identity: &Identity) -> Option<String> {
        self.fetch_body(&self.site.ip_check_url, identity)
            .await
            .map(|body| body.trim().to_string())
    }
}
