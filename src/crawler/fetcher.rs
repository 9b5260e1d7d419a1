//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler:
//! - Building the HTTP client routed through the SOCKS proxy
//! - GET requests carrying the current identity's user agent
//! - Collapsing every outcome into a [`FetchResult`]

use crate::config::SiteConfig;
use crate::identity::Identity;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Proxy};
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// Server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, proxy failure, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

/// Builds an HTTP client with proper configuration
///
/// The user agent is not baked into the client: every request sets the one of
/// the identity it is sent with.
///
/// # Arguments
///
/// * `site` - The site configuration (timeouts)
/// * `proxy` - SOCKS proxy URL, `None` to connect directly
///
/// # Example
///
/// ```no_run
/// use kym_harvester::config::SiteConfig;
/// use kym_harvester::crawler::build_http_client;
///
/// let client = build_http_client(&SiteConfig::default(), Some("socks5h://127.0.0.1:9150")).unwrap();
/// ```
pub fn build_http_client(site: &SiteConfig, proxy: Option<&str>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .timeout(site.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// Fetches a URL with the given identity
///
/// Never retries; a timeout, a refused connection and a 5xx all come back as
/// a failed [`FetchResult`] for the retry executor to handle.
pub async fn fetch_url(client: &Client, url: &str, identity: &Identity) -> FetchResult {
    let response = match client
        .get(url)
        .header(USER_AGENT, identity.user_agent.as_str())
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                format!("Connection failed: {}", e)
            } else {
                e.to_string()
            };
            return FetchResult::NetworkError { error };
        }
    };

    let status = response.status();
    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let final_url = response.url().to_string();
    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body,
        },
        Err(e) => FetchResult::NetworkError {
            error: e.to_string(),
        },
    }
}
