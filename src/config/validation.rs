use crate::config::types::{CheckpointConfig, Config, RetryConfig, RotationConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_retry_config(&config.retry)?;
    validate_rotation_config(&config.rotation)?;
    validate_checkpoint_config(&config.checkpoint)?;
    Ok(())
}

/// Validates the target site layout
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base-url must use http or https, got '{}'",
            base.scheme()
        )));
    }

    if !config.listing_path.contains("{page}") {
        return Err(ConfigError::Validation(format!(
            "listing-path must contain a {{page}} placeholder, got '{}'",
            config.listing_path
        )));
    }

    if config.items_per_page < 1 {
        return Err(ConfigError::Validation(format!(
            "items-per-page must be >= 1, got {}",
            config.items_per_page
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    Url::parse(&config.ip_check_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid ip-check-url: {}", e)))?;

    Ok(())
}

/// Validates the retry policy
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.budget < 1 {
        return Err(ConfigError::Validation(format!(
            "retry budget must be >= 1, got {}",
            config.budget
        )));
    }

    Ok(())
}

/// Validates identity rotation settings
fn validate_rotation_config(config: &RotationConfig) -> Result<(), ConfigError> {
    if config.control_address.trim().is_empty() {
        return Err(ConfigError::Validation(
            "control-address cannot be empty".to_string(),
        ));
    }

    if let Some(proxy) = config.proxy() {
        let url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid socks-proxy: {}", e)))?;

        if !url.scheme().starts_with("socks") {
            return Err(ConfigError::Validation(format!(
                "socks-proxy must use a socks scheme, got '{}'",
                url.scheme()
            )));
        }
    }

    if config.interval_secs < 1 {
        return Err(ConfigError::Validation(
            "rotation interval-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agents.iter().all(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents must contain at least one non-empty entry".to_string(),
        ));
    }

    Ok(())
}

/// Validates checkpoint settings
fn validate_checkpoint_config(config: &CheckpointConfig) -> Result<(), ConfigError> {
    if config.every_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint every-pages must be >= 1, got {}",
            config.every_pages
        )));
    }

    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}
