//! kym-harvester: a resilient catalog harvester
//!
//! This crate walks the paginated meme catalog of a remote site, extracts one
//! structured record per entry, and checkpoints the dataset as it goes. Failed
//! fetches are retried behind a freshly rotated network identity, and units that
//! stay unreachable are recorded in skip lists so a crawl can be audited or resumed.

pub mod checkpoint;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod identity;
pub mod state;

use thiserror::Error;

/// Main error type for harvester operations
///
/// Anything surfacing as a `HarvestError` from the coordinator is fatal: transient
/// fetch failures never leave the retry executor.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Identity rotation failed: {0}")]
    Rotation(#[from] identity::RotationError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] checkpoint::CheckpointError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Could not discover the last catalog page: {0}")]
    Discovery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("If --all is not set, both --start and --end pages must be provided")]
    MissingRange,

    #[error("No resume marker found at {0}")]
    NoResumeMarker(String),
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlSummary};
pub use identity::{Identity, IdentityRotator};
pub use state::{CrawlPhase, CrawlState, Record};
