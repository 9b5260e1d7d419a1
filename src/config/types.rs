//! Configuration types for the harvester
//!
//! Every table and key has a default, so an empty or missing file yields the
//! reference crawl policy.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Chrome user agents handed out by the identity rotator when the config names none
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.6312.122 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_5_2) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.6261.129 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.6167.184 Safari/537.36",
    "Mozilla/5.0 (Windows NT 6.1; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36",
];

/// Main configuration structure for the harvester
///
/// Every table is optional; missing keys fall back to the reference crawl policy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

/// Target site layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Scheme and host every relative catalog link is resolved against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Listing page path, `{page}` is replaced by the page number
    #[serde(rename = "listing-path")]
    pub listing_path: String,

    /// Catalog index used to discover the last page
    #[serde(rename = "index-path")]
    pub index_path: String,

    /// Number of entries shown on one listing page
    #[serde(rename = "items-per-page")]
    pub items_per_page: u32,

    /// IP echo service queried for operator diagnostics
    #[serde(rename = "ip-check-url")]
    pub ip_check_url: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://knowyourmeme.com".to_string(),
            listing_path: "/memes/all/page/{page}".to_string(),
            index_path: "/memes/all".to_string(),
            items_per_page: 16,
            ip_check_url: "https://api.ipify.org".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl SiteConfig {
    /// Absolute URL of the listing page `page`
    pub fn listing_url(&self, page: u32) -> String {
        let path = self.listing_path.replace("{page}", &page.to_string());
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Absolute URL of the catalog index
    pub fn index_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.index_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Retry policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per fetch before the unit is skipped
    pub budget: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { budget: 10 }
    }
}

/// Identity rotation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Address of the Tor control port
    #[serde(rename = "control-address")]
    pub control_address: String,

    /// Control port password; null authentication when absent
    #[serde(rename = "control-password")]
    pub control_password: Option<String>,

    /// SOCKS proxy every request is routed through; empty disables proxying
    #[serde(rename = "socks-proxy")]
    pub socks_proxy: String,

    /// Seconds between scheduled user-agent re-rolls
    #[serde(rename = "interval-secs")]
    pub interval_secs: u64,

    /// Pool of user agents to draw from
    #[serde(rename = "user-agents")]
    pub user_agents: Vec<String>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            control_address: "127.0.0.1:9051".to_string(),
            control_password: None,
            socks_proxy: "socks5h://127.0.0.1:9150".to_string(),
            interval_secs: 600,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RotationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// The proxy URL, or `None` when proxying is disabled
    pub fn proxy(&self) -> Option<&str> {
        let proxy = self.socks_proxy.trim();
        (!proxy.is_empty()).then_some(proxy)
    }
}

/// Checkpoint settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// A non-final checkpoint is taken on every Nth page of the range
    #[serde(rename = "every-pages")]
    pub every_pages: u32,

    /// Directory holding the dataset and its sidecar files
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            every_pages: 10,
            output_dir: PathBuf::from("data"),
        }
    }
}
