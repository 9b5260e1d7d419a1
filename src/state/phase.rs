//! Crawl phase definitions for the coordinator state machine

use std::fmt;

/// The phase a crawl invocation is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Rotation control channel is being established
    Init,

    /// Walking the page range and extracting items
    CrawlingPages,

    /// Second pass over items that exhausted their budget
    ResolvingSkippedItems,

    /// Crawl finished and the final checkpoint was written
    Done,

    /// An unrecoverable error ended the crawl
    Failed,
}

impl CrawlPhase {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// Phases only move forward; any non-terminal phase may fail.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        match (self, next) {
            (from, Self::Failed) => !from.is_terminal(),
            (Self::Init, Self::CrawlingPages) => true,
            (Self::CrawlingPages, Self::ResolvingSkippedItems) => true,
            (Self::ResolvingSkippedItems, Self::Done) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::CrawlingPages => "crawling_pages",
            Self::ResolvingSkippedItems => "resolving_skipped_items",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
