//! Record sink trait and error types
//!
//! This module defines the interface the checkpoint store persists through.

use crate::state::Record;
use thiserror::Error;

/// Errors that can occur while persisting or reloading a checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed checkpoint file {file}: {message}")]
    Malformed { file: String, message: String },
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Durable destination of the dataset and its sidecar lists
///
/// Writes replace whatever the sink held before. Nothing is transactional
/// across the individual outputs.
pub trait RecordSink {
    // ===== Writing =====

    /// Replaces the persisted dataset
    fn write_dataset(&mut self, records: &[Record]) -> CheckpointResult<()>;

    /// Replaces the persisted skipped-pages list
    fn write_skipped_pages(&mut self, pages: &[u32]) -> CheckpointResult<()>;

    /// Replaces the persisted skipped-items list
    fn write_skipped_items(&mut self, links: &[String]) -> CheckpointResult<()>;

    /// Removes a skipped-pages list left by an earlier checkpoint
    fn clear_skipped_pages(&mut self) -> CheckpointResult<()>;

    /// Removes a skipped-items list left by an earlier checkpoint
    fn clear_skipped_items(&mut self) -> CheckpointResult<()>;

    /// Records the page a fatal failure happened on
    fn write_resume_marker(&mut self, page: u32) -> CheckpointResult<()>;

    /// Removes a resume marker left by an earlier run
    fn clear_resume_marker(&mut self) -> CheckpointResult<()>;

    // ===== Reloading =====

    /// Loads the persisted dataset, empty when none exists
    fn load_dataset(&self) -> CheckpointResult<Vec<Record>>;

    /// Loads the skipped-pages list, empty when none exists
    fn load_skipped_pages(&self) -> CheckpointResult<Vec<u32>>;

    /// Loads the skipped-items list, empty when none exists
    fn load_skipped_items(&self) -> CheckpointResult<Vec<String>>;

    /// Loads the resume marker, if one was written
    fn load_resume_marker(&self) -> CheckpointResult<Option<u32>>;
}
