//! Page range resolution
//!
//! Turns the `--all`/`--start`/`--end` options into a crawl range before any
//! network or file activity takes place.

use crate::ConfigError;

/// Page selection as requested on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeRequest {
    /// Crawl every catalog page
    pub all: bool,
    /// First page to crawl
    pub start: Option<u32>,
    /// Last page to crawl (inclusive)
    pub end: Option<u32>,
}

/// A validated crawl range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// Pages `1..last`, the last page is discovered from the site
    All,
    /// Pages `start..end_exclusive`
    Explicit { start: u32, end_exclusive: u32 },
}

impl RangeRequest {
    /// Resolves the request into a range
    ///
    /// `--all` wins over explicit pages. Otherwise both `--start` and `--end`
    /// are required, and `--end` is inclusive.
    pub fn resolve(&self) -> Result<RangeSpec, ConfigError> {
        if self.all {
            return Ok(RangeSpec::All);
        }

        let (start, end) = match (self.start, self.end) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(ConfigError::MissingRange),
        };

        if start < 1 {
            return Err(ConfigError::Validation(
                "start page must be >= 1".to_string(),
            ));
        }

        if start > end {
            return Err(ConfigError::Validation(format!(
                "start page {} is after end page {}",
                start, end
            )));
        }

        Ok(RangeSpec::Explicit {
            start,
            end_exclusive: exclusive_end(end)?,
        })
    }

    /// Resolves the end of a resumed crawl, ignoring `--start`
    ///
    /// Returns `None` when the end comes from last-page discovery.
    pub fn resume_end(&self) -> Result<Option<u32>, ConfigError> {
        match (self.all, self.end) {
            (true, _) => Ok(None),
            (false, Some(end)) => exclusive_end(end).map(Some),
            (false, None) => Err(ConfigError::MissingRange),
        }
    }
}

/// `end + 1`, rejecting an end page with no successor
fn exclusive_end(end: u32) -> Result<u32, ConfigError> {
    end.checked_add(1)
        .ok_or_else(|| ConfigError::Validation(format!("end page {} is too large", end)))
}
