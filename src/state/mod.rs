//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `Record`: the fixed-schema row extracted from one catalog entry
//! - `CrawlState`: page cursor, skip lists and the in-progress dataset
//! - `CrawlPhase`: the coordinator's state machine

mod crawl_state;
mod phase;
mod record;

// Re-export main types
pub use crawl_state::CrawlState;
pub use phase::CrawlPhase;
pub use record::{Record, Year, COLUMNS};
