//! Configuration module for the harvester
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file, and turning command-line page options into a crawl range.
//!
//! # Example
//!
//! ```no_run
//! use kym_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Retry budget: {}", config.retry.budget);
//! ```

mod parser;
mod range;
mod types;
mod validation;

// Re-export types
pub use types::{CheckpointConfig, Config, RetryConfig, RotationConfig, SiteConfig};

// Re-export parser functions
pub use parser::{load_config, load_optional_config};
pub use range::{RangeRequest, RangeSpec};
pub use validation::validate;
