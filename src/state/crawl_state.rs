//! Progress of a single crawl invocation

use crate::state::Record;
use std::collections::HashSet;

/// Mutable progress of one crawl invocation
///
/// Owned by the coordinator; the checkpoint store only ever sees borrowed snapshots.
#[derive(Debug, Clone, Default)]
pub struct CrawlState {
    /// Page currently being processed
    pub cursor: u32,

    /// First page of the range (inclusive)
    pub start: u32,

    /// End of the range (exclusive)
    pub end: u32,

    /// Pages whose link discovery exhausted its budget, in skip order
    pub skipped_pages: Vec<u32>,

    /// Item links whose extraction exhausted its budget, in skip order
    pub skipped_items: Vec<String>,

    /// Records extracted so far, in crawl order
    pub dataset: Vec<Record>,

    known_urls: HashSet<String>,
}

impl CrawlState {
    /// Creates the state for a fresh crawl over `start..end`
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            cursor: start,
            start,
            end,
            ..Self::default()
        }
    }

    /// Creates the state for a crawl resumed from an earlier checkpoint
    pub fn resumed(
        start: u32,
        end: u32,
        dataset: Vec<Record>,
        skipped_pages: Vec<u32>,
        skipped_items: Vec<String>,
    ) -> Self {
        let mut state = Self::new(start, end);
        for record in dataset {
            state.push_record(record);
        }
        for page in skipped_pages {
            state.skip_page(page);
        }
        for link in skipped_items {
            state.skip_item(link);
        }
        state
    }

    /// Number of pages in the range
    pub fn page_count(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Appends a successfully extracted record
    pub fn push_record(&mut self, record: Record) {
        if !record.url.is_empty() {
            self.known_urls.insert(record.url.clone());
        }
        self.dataset.push(record);
    }

    /// Returns true if a record for `url` is already in the dataset
    pub fn has_record_for(&self, url: &str) -> bool {
        self.known_urls.contains(url)
    }

    /// Records a page as permanently skipped
    pub fn skip_page(&mut self, page: u32) {
        if !self.skipped_pages.contains(&page) {
            self.skipped_pages.push(page);
        }
    }

    /// Records an item link as permanently skipped
    pub fn skip_item(&mut self, link: String) {
        if !self.skipped_items.contains(&link) {
            self.skipped_items.push(link);
        }
    }

    /// Removes an item link from the skip list after it was resolved
    pub fn unskip_item(&mut self, link: &str) {
        self.skipped_items.retain(|skipped| skipped != link);
    }
}
