//! Checkpoint module for persisting crawl progress
//!
//! The [`CheckpointStore`] decides what a checkpoint contains; a
//! [`RecordSink`] decides where it goes. The dataset is always rewritten.
//! A skip list is written only when non-empty, and an empty one removes
//! whatever an earlier checkpoint left behind. The resume marker is written
//! only on the fatal path.

mod directory;
mod traits;

pub use directory::{
    DirectorySink, DATASET_FILE, RESUME_MARKER_FILE, SKIPPED_ITEMS_FILE, SKIPPED_PAGES_FILE,
};
pub use traits::{CheckpointError, CheckpointResult, RecordSink};

use crate::state::{CrawlState, Record};

/// Snapshot of a previous crawl reloaded from a sink
#[derive(Debug, Clone, Default)]
pub struct Restored {
    pub dataset: Vec<Record>,
    pub skipped_pages: Vec<u32>,
    pub skipped_items: Vec<String>,
    pub resume_marker: Option<u32>,
}

/// Applies the checkpoint policy on top of a record sink
pub struct CheckpointStore<K> {
    sink: K,
}

impl<K: RecordSink> CheckpointStore<K> {
    pub fn new(sink: K) -> Self {
        Self { sink }
    }

    /// Persists the dataset and any non-empty skip list
    ///
    /// An empty skip list clears the persisted one, so a stale list never
    /// outlives the items it named.
    ///
    /// `failed_at_page` is only given on the fatal path and is written as the
    /// resume marker. Outputs are written one after another; a crash midway can
    /// leave them inconsistent with each other.
    pub fn checkpoint(
        &mut self,
        dataset: &[Record],
        skipped_pages: &[u32],
        skipped_items: &[String],
        failed_at_page: Option<u32>,
    ) -> CheckpointResult<()> {
        self.sink.write_dataset(dataset)?;

        if skipped_pages.is_empty() {
            self.sink.clear_skipped_pages()?;
        } else {
            self.sink.write_skipped_pages(skipped_pages)?;
        }

        if skipped_items.is_empty() {
            self.sink.clear_skipped_items()?;
        } else {
            self.sink.write_skipped_items(skipped_items)?;
        }

        if let Some(page) = failed_at_page {
            self.sink.write_resume_marker(page)?;
        }

        tracing::debug!(
            "Checkpoint: {} records, {} skipped pages, {} skipped items{}",
            dataset.len(),
            skipped_pages.len(),
            skipped_items.len(),
            failed_at_page
                .map(|page| format!(", resume at page {}", page))
                .unwrap_or_default()
        );

        Ok(())
    }

    /// Checkpoints a crawl state snapshot
    pub fn checkpoint_state(
        &mut self,
        state: &CrawlState,
        failed_at_page: Option<u32>,
    ) -> CheckpointResult<()> {
        self.checkpoint(
            &state.dataset,
            &state.skipped_pages,
            &state.skipped_items,
            failed_at_page,
        )
    }

    /// Drops the resume marker once a crawl completed
    pub fn clear_resume_marker(&mut self) -> CheckpointResult<()> {
        self.sink.clear_resume_marker()
    }

    /// Reloads everything a previous checkpoint persisted
    pub fn restore(&self) -> CheckpointResult<Restored> {
        Ok(Restored {
            dataset: self.sink.load_dataset()?,
            skipped_pages: self.sink.load_skipped_pages()?,
            skipped_items: self.sink.load_skipped_items()?,
            resume_marker: self.sink.load_resume_marker()?,
        })
    }
}
