//! Crawler coordinator - main crawl orchestration logic
//!
//! The [`Coordinator`] owns the crawl state and drives it through its phases:
//! - Establishing the rotation control channel
//! - Walking the page range, retrying link discovery and record extraction
//! - Re-attempting skipped items once more after the page loop
//! - Checkpointing periodically, after each pass, and on fatal failure

use crate::checkpoint::{CheckpointStore, DirectorySink, RecordSink, Restored, RESUME_MARKER_FILE};
use crate::config::{Config, RangeRequest, RangeSpec};
use crate::crawler::catalog::{Catalog, HttpCatalog};
use crate::crawler::retry::{RetryExecutor, RetryOutcome};
use crate::identity::{IdentityRotator, RotationService, TorController};
use crate::state::{CrawlPhase, CrawlState, Record};
use crate::{ConfigError, Result};
use std::time::Instant;

/// Totals reported once a crawl reaches [`CrawlPhase::Done`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Records in the final dataset
    pub records: usize,
    /// Pages in the crawled range
    pub pages: u32,
    /// Pages whose link discovery exhausted its budget
    pub skipped_pages: usize,
    /// Items still unresolved after the second pass
    pub skipped_items: usize,
    /// Items recovered by the second pass
    pub resolved_items: usize,
}

/// Main crawler coordinator structure
pub struct Coordinator<C, S, K> {
    catalog: C,
    rotator: IdentityRotator<S>,
    retry: RetryExecutor,
    store: CheckpointStore<K>,
    checkpoint_every: u32,
    phase: CrawlPhase,
    state: CrawlState,
}

impl<C, S, K> Coordinator<C, S, K>
where
    C: Catalog,
    S: RotationService,
    K: RecordSink,
{
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `catalog` - Where links and records are fetched from
    /// * `rotator` - The identity every fetch is sent with
    /// * `store` - Where checkpoints are written
    /// * `config` - Retry budget and checkpoint cadence
    pub fn new(
        catalog: C,
        rotator: IdentityRotator<S>,
        store: CheckpointStore<K>,
        config: &Config,
    ) -> Self {
        Self {
            catalog,
            rotator,
            retry: RetryExecutor::from_config(&config.retry),
            store,
            checkpoint_every: config.checkpoint.every_pages.max(1),
            phase: CrawlPhase::Init,
            state: CrawlState::default(),
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    /// Crawls pages `start..end` from scratch
    pub async fn run(&mut self, start: u32, end: u32) -> Result<CrawlSummary> {
        self.phase = CrawlPhase::Init;
        self.state = CrawlState::new(start, end);
        self.execute().await
    }

    /// Crawls pages `start..end` on top of a previous checkpoint
    ///
    /// Entries already present in the restored dataset are not fetched again.
    pub async fn resume(&mut self, start: u32, end: u32, restored: Restored) -> Result<CrawlSummary> {
        tracing::info!(
            "Resuming at page {} with {} records, {} skipped pages and {} skipped items",
            start,
            restored.dataset.len(),
            restored.skipped_pages.len(),
            restored.skipped_items.len()
        );

        self.phase = CrawlPhase::Init;
        self.state = CrawlState::resumed(
            start,
            end,
            restored.dataset,
            restored.skipped_pages,
            restored.skipped_items,
        );
        self.execute().await
    }

    async fn execute(&mut self) -> Result<CrawlSummary> {
        match self.drive().await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                let page = self.state.cursor;
                tracing::error!("Crawl failed at page {}: {}", page, e);

                if let Err(checkpoint_error) = self.store.checkpoint_state(&self.state, Some(page)) {
                    tracing::error!("Failed to write fatal checkpoint: {}", checkpoint_error);
                }

                self.enter(CrawlPhase::Failed);
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<CrawlSummary> {
        if let Some(ip) = self.catalog.current_ip(self.rotator.current()).await {
            tracing::info!("Current IP: {}", ip);
        }
        self.rotator.connect().await?;

        self.enter(CrawlPhase::CrawlingPages);
        for page in self.state.start..self.state.end {
            self.state.cursor = page;

            if (page - self.state.start + 1) % self.checkpoint_every == 0 {
                self.store.checkpoint_state(&self.state, None)?;
            }

            self.crawl_page(page).await?;
        }
        self.store.checkpoint_state(&self.state, None)?;

        self.enter(CrawlPhase::ResolvingSkippedItems);
        let resolved_items = self.resolve_skipped_items().await?;

        self.store.checkpoint_state(&self.state, None)?;
        self.store.clear_resume_marker()?;
        self.enter(CrawlPhase::Done);

        Ok(CrawlSummary {
            records: self.state.dataset.len(),
            pages: self.state.page_count(),
            skipped_pages: self.state.skipped_pages.len(),
            skipped_items: self.state.skipped_items.len(),
            resolved_items,
        })
    }

    async fn crawl_page(&mut self, page: u32) -> Result<()> {
        let last = self.state.end.saturating_sub(1);
        tracing::info!("Page {}/{} as {}", page, last, self.rotator.current());
        if let Some(ip) = self.catalog.current_ip(self.rotator.current()).await {
            tracing::info!("Current IP: {}", ip);
        }

        let catalog = &self.catalog;
        let outcome = self
            .retry
            .run(&mut self.rotator, move |identity| async move {
                let links = catalog.page_links(page, &identity).await;
                (!links.is_empty()).then_some(links)
            })
            .await;

        let links = match outcome {
            RetryOutcome::Success(links) => links,
            RetryOutcome::Exhausted { attempts } => {
                tracing::warn!("Skipping page {} after {} attempts", page, attempts);
                self.state.skip_page(page);
                Vec::new()
            }
            RetryOutcome::Fatal(e) => return Err(e),
        };

        let count = links.len();
        for (n, link) in links.into_iter().enumerate() {
            if self.state.has_record_for(&link) {
                tracing::debug!("Already have {}", link);
                continue;
            }

            tracing::info!("    Entry {}/{}: {}", n + 1, count, display_name(&link));
            match self.fetch_record(&link).await {
                RetryOutcome::Success(record) => self.state.push_record(record),
                RetryOutcome::Exhausted { attempts } => {
                    tracing::warn!("Skipping {} after {} attempts", link, attempts);
                    self.state.skip_item(link);
                }
                RetryOutcome::Fatal(e) => return Err(e),
            }
        }

        Ok(())
    }

    /// Gives every skipped item one more full retry budget
    ///
    /// Returns how many items were recovered; the rest stay skipped.
    async fn resolve_skipped_items(&mut self) -> Result<usize> {
        let pending = self.state.skipped_items.clone();
        if pending.is_empty() {
            return Ok(0);
        }

        tracing::info!("Retrying {} skipped entries", pending.len());
        let mut resolved = 0;
        for link in pending {
            if self.state.has_record_for(&link) {
                tracing::debug!("Already have {}", link);
                self.state.unskip_item(&link);
                continue;
            }

            match self.fetch_record(&link).await {
                RetryOutcome::Success(record) => {
                    self.state.unskip_item(&link);
                    self.state.push_record(record);
                    resolved += 1;
                }
                RetryOutcome::Exhausted { attempts } => {
                    tracing::warn!("{} still unreachable after {} attempts", link, attempts);
                }
                RetryOutcome::Fatal(e) => return Err(e),
            }
        }

        Ok(resolved)
    }

    async fn fetch_record(&mut self, link: &str) -> RetryOutcome<Record> {
        self.rotator.maybe_rotate_on_schedule(Instant::now());

        let catalog = &self.catalog;
        self.retry
            .run(&mut self.rotator, move |identity| async move {
                catalog.record(link, &identity).await
            })
            .await
    }

    fn enter(&mut self, next: CrawlPhase) {
        if self.phase.can_transition_to(next) {
            tracing::debug!("Crawl phase {} -> {}", self.phase, next);
            self.phase = next;
        } else {
            tracing::warn!("Ignoring illegal phase transition {} -> {}", self.phase, next);
        }
    }
}

/// Human readable name of an entry, taken from the last segment of its link
///
/// `https://knowyourmeme.com/memes/doge-coin` gives `Doge coin`.
pub fn display_name(link: &str) -> String {
    let slug = link
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .replace('-', " ");

    let mut chars = slug.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Runs a complete crawl with the HTTP catalog, Tor rotation and the output directory
///
/// The page range is resolved before anything touches the network or the
/// output directory.
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `range` - Page selection from the command line
/// * `resume` - Continue from the resume marker of a failed crawl
pub async fn run_crawl(config: Config, range: RangeRequest, resume: bool) -> Result<CrawlSummary> {
    let requested = if resume {
        None
    } else {
        Some(range.resolve()?)
    };
    let resume_end = if resume { range.resume_end()? } else { None };

    let sink = DirectorySink::new(config.checkpoint.output_dir.clone());
    let marker_path = sink.path_of(RESUME_MARKER_FILE);
    let store = CheckpointStore::new(sink);

    let restored = if resume {
        let restored = store.restore()?;
        if restored.resume_marker.is_none() {
            return Err(ConfigError::NoResumeMarker(marker_path.display().to_string()).into());
        }
        Some(restored)
    } else {
        None
    };

    let catalog = HttpCatalog::new(config.site.clone(), config.rotation.proxy())?;
    let service = TorController::new(
        config.rotation.control_address.clone(),
        config.rotation.control_password.clone(),
    );
    let rotator = IdentityRotator::from_config(service, &config.rotation);

    let end = match (requested, resume_end) {
        (Some(RangeSpec::Explicit { end_exclusive, .. }), _) => end_exclusive,
        (None, Some(end)) => end,
        _ => discover_last_page(&catalog, &rotator).await?,
    };

    let mut coordinator = Coordinator::new(catalog, rotator, store, &config);
    match restored {
        Some(restored) => {
            let start = restored.resume_marker.unwrap_or(1);
            coordinator.resume(start, end, restored).await
        }
        None => {
            let start = match requested {
                Some(RangeSpec::Explicit { start, .. }) => start,
                _ => 1,
            };
            coordinator.run(start, end).await
        }
    }
}

async fn discover_last_page<S: RotationService>(
    catalog: &HttpCatalog,
    rotator: &IdentityRotator<S>,
) -> Result<u32> {
    let end = catalog.last_page(rotator.current()).await?;
    tracing::info!("Catalog has {} pages", end.saturating_sub(1));
    Ok(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::testing::MemorySink;
    use crate::identity::testing::CountingRotation;
    use crate::identity::{Identity, RotationError, UserAgentPool};
    use crate::HarvestError;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Catalog with scripted pages and failures
    #[derive(Default)]
    struct ScriptedCatalog {
        pages: HashMap<u32, Vec<String>>,
        failing_pages: HashSet<u32>,
        failing_links: HashSet<String>,
        /// Links that fail this many times before succeeding
        flaky_links: HashMap<String, u32>,
        page_calls: Mutex<Vec<u32>>,
        record_calls: Mutex<HashMap<String, u32>>,
    }

    impl ScriptedCatalog {
        fn with_pages(pages: impl IntoIterator<Item = (u32, Vec<&'static str>)>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|(page, links)| (page, links.into_iter().map(String::from).collect()))
                    .collect(),
                ..Self::default()
            }
        }

        fn page_calls(&self, page: u32) -> usize {
            self.page_calls.lock().unwrap().iter().filter(|p| **p == page).count()
        }

        fn record_calls(&self, link: &str) -> u32 {
            self.record_calls.lock().unwrap().get(link).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Catalog for ScriptedCatalog {
        async fn page_links(&self, page: u32, _identity: &Identity) -> Vec<String> {
            self.page_calls.lock().unwrap().push(page);
            if self.failing_pages.contains(&page) {
                return Vec::new();
            }
            self.pages.get(&page).cloned().unwrap_or_default()
        }

        async fn record(&self, link: &str, _identity: &Identity) -> Option<Record> {
            let calls = {
                let mut record_calls = self.record_calls.lock().unwrap();
                let calls = record_calls.entry(link.to_string()).or_insert(0);
                *calls += 1;
                *calls
            };

            if self.failing_links.contains(link) {
                return None;
            }
            if let Some(failures) = self.flaky_links.get(link) {
                if calls <= *failures {
                    return None;
                }
            }
            Some(Record::new(link))
        }

        async fn last_page(&self, _identity: &Identity) -> Result<u32> {
            Ok(self.pages.keys().max().map(|p| p + 1).unwrap_or(1))
        }
    }

    /// Rotation service that fails every circuit request
    struct RefusingRotation;

    #[async_trait]
    impl RotationService for RefusingRotation {
        async fn connect(&mut self) -> std::result::Result<(), RotationError> {
            Ok(())
        }

        async fn new_circuit(&mut self) -> std::result::Result<Duration, RotationError> {
            Err(RotationError::Protocol("552 Unrecognized signal".to_string()))
        }
    }

    fn rotator<S: RotationService>(service: S) -> IdentityRotator<S> {
        let agents = UserAgentPool::new(vec!["agent-a".to_string(), "agent-b".to_string()]);
        IdentityRotator::new(service, agents, Duration::from_secs(600))
    }

    fn coordinator<S: RotationService>(
        catalog: ScriptedCatalog,
        service: S,
        sink: MemorySink,
    ) -> Coordinator<ScriptedCatalog, S, MemorySink> {
        Coordinator::new(
            catalog,
            rotator(service),
            CheckpointStore::new(sink),
            &Config::default(),
        )
    }

    fn urls(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.url.as_str()).collect()
    }

    #[tokio::test]
    async fn test_single_page_single_entry() {
        let catalog = ScriptedCatalog::with_pages([(5, vec!["https://kym.test/memes/doge"])]);
        let sink = MemorySink::default();
        let mut coordinator = coordinator(catalog, CountingRotation::default(), sink.clone());

        let summary = coordinator.run(5, 6).await.unwrap();

        assert_eq!(summary.records, 1);
        assert_eq!(summary.pages, 1);
        assert_eq!(coordinator.phase(), CrawlPhase::Done);

        let contents = sink.snapshot();
        assert_eq!(urls(&contents.dataset), vec!["https://kym.test/memes/doge"]);
        assert!(contents.skipped_pages.is_none());
        assert!(contents.skipped_items.is_none());
        assert!(contents.resume_marker.is_none());
    }

    #[tokio::test]
    async fn test_failing_page_is_skipped_and_crawl_continues() {
        let mut catalog = ScriptedCatalog::with_pages([
            (1, vec!["https://kym.test/memes/a"]),
            (2, vec!["https://kym.test/memes/b"]),
            (3, vec!["https://kym.test/memes/c"]),
        ]);
        catalog.failing_pages.insert(2);
        let service = CountingRotation::default();
        let sink = MemorySink::default();
        let mut coordinator = coordinator(catalog, service.clone(), sink.clone());

        let summary = coordinator.run(1, 4).await.unwrap();

        assert_eq!(coordinator.catalog.page_calls(2), 10);
        assert_eq!(service.count(), 9);
        assert_eq!(summary.skipped_pages, 1);
        assert_eq!(summary.records, 2);

        let contents = sink.snapshot();
        assert_eq!(contents.skipped_pages, Some(vec![2]));
        assert_eq!(
            urls(&contents.dataset),
            vec!["https://kym.test/memes/a", "https://kym.test/memes/c"]
        );
    }

    #[tokio::test]
    async fn test_fatal_rotation_failure_writes_resume_marker() {
        let pages: Vec<(u32, Vec<&'static str>)> = vec![
            (1, vec!["https://kym.test/memes/p1-a", "https://kym.test/memes/p1-b"]),
            (2, vec!["https://kym.test/memes/p2-a"]),
            (3, vec!["https://kym.test/memes/p3-a", "https://kym.test/memes/p3-b"]),
            (4, vec!["https://kym.test/memes/p4-a"]),
        ];
        let mut catalog = ScriptedCatalog::with_pages(pages);
        catalog.failing_links.insert("https://kym.test/memes/p3-b".to_string());
        let sink = MemorySink::default();
        let mut coordinator = coordinator(catalog, RefusingRotation, sink.clone());

        let result = coordinator.run(1, 11).await;

        assert!(matches!(result, Err(HarvestError::Rotation(_))));
        assert_eq!(coordinator.phase(), CrawlPhase::Failed);

        let contents = sink.snapshot();
        assert_eq!(contents.resume_marker, Some(3));
        assert_eq!(
            urls(&contents.dataset),
            vec![
                "https://kym.test/memes/p1-a",
                "https://kym.test/memes/p1-b",
                "https://kym.test/memes/p2-a",
                "https://kym.test/memes/p3-a",
            ]
        );
        assert_eq!(coordinator.catalog.page_calls(4), 0);
    }

    #[tokio::test]
    async fn test_connect_failure_is_fatal_at_start_page() {
        let catalog = ScriptedCatalog::with_pages([(7, vec!["https://kym.test/memes/a"])]);
        let service = CountingRotation {
            fail_connect: true,
            ..CountingRotation::default()
        };
        let sink = MemorySink::default();
        let mut coordinator = coordinator(catalog, service, sink.clone());

        let result = coordinator.run(7, 9).await;

        assert!(matches!(
            result,
            Err(HarvestError::Rotation(RotationError::Authentication(_)))
        ));
        assert_eq!(coordinator.phase(), CrawlPhase::Failed);
        assert_eq!(sink.snapshot().resume_marker, Some(7));
        assert_eq!(coordinator.catalog.page_calls(7), 0);
    }

    #[tokio::test]
    async fn test_second_pass_resolves_flaky_entry() {
        let mut catalog = ScriptedCatalog::with_pages([(
            1,
            vec!["https://kym.test/memes/a", "https://kym.test/memes/flaky"],
        )]);
        catalog
            .flaky_links
            .insert("https://kym.test/memes/flaky".to_string(), 10);
        let sink = MemorySink::default();
        let mut coordinator = coordinator(catalog, CountingRotation::default(), sink.clone());

        let summary = coordinator.run(1, 2).await.unwrap();

        assert_eq!(summary.resolved_items, 1);
        assert_eq!(summary.skipped_items, 0);
        assert!(coordinator.state().skipped_items.is_empty());
        assert_eq!(coordinator.catalog.record_calls("https://kym.test/memes/flaky"), 11);

        let contents = sink.snapshot();
        assert!(contents.skipped_items.is_none());
        assert_eq!(
            urls(&contents.dataset),
            vec!["https://kym.test/memes/a", "https://kym.test/memes/flaky"]
        );

        let restored = CheckpointStore::new(sink).restore().unwrap();
        assert!(restored.skipped_items.is_empty());
    }

    #[tokio::test]
    async fn test_second_pass_does_not_duplicate_known_entries() {
        let catalog = ScriptedCatalog::default();
        let sink = MemorySink::default();
        let mut coordinator = coordinator(catalog, CountingRotation::default(), sink.clone());

        let restored = Restored {
            dataset: vec![Record::new("https://kym.test/memes/flaky")],
            skipped_pages: Vec::new(),
            skipped_items: vec!["https://kym.test/memes/flaky".to_string()],
            resume_marker: Some(2),
        };
        let summary = coordinator.resume(2, 2, restored).await.unwrap();

        assert_eq!(summary.records, 1);
        assert_eq!(summary.skipped_items, 0);
        assert_eq!(coordinator.catalog.record_calls("https://kym.test/memes/flaky"), 0);

        let contents = sink.snapshot();
        assert_eq!(urls(&contents.dataset), vec!["https://kym.test/memes/flaky"]);
        assert!(contents.skipped_items.is_none());
    }

    #[tokio::test]
    async fn test_unresolved_entry_stays_skipped() {
        let mut catalog =
            ScriptedCatalog::with_pages([(1, vec!["https://kym.test/memes/gone"])]);
        catalog
            .failing_links
            .insert("https://kym.test/memes/gone".to_string());
        let service = CountingRotation::default();
        let sink = MemorySink::default();
        let mut coordinator = coordinator(catalog, service.clone(), sink.clone());

        let summary = coordinator.run(1, 2).await.unwrap();

        assert_eq!(summary.skipped_items, 1);
        assert_eq!(summary.resolved_items, 0);
        assert_eq!(coordinator.catalog.record_calls("https://kym.test/memes/gone"), 20);
        assert_eq!(service.count(), 18);

        let contents = sink.snapshot();
        assert!(contents.dataset.is_empty());
        assert_eq!(
            contents.skipped_items,
            Some(vec!["https://kym.test/memes/gone".to_string()])
        );
    }

    #[tokio::test]
    async fn test_periodic_checkpoints() {
        let catalog = ScriptedCatalog::with_pages(
            (1..=20).map(|page| (page, vec!["https://kym.test/memes/x"])),
        );
        let sink = MemorySink::default();
        let mut coordinator = coordinator(catalog, CountingRotation::default(), sink.clone());

        coordinator.run(1, 21).await.unwrap();

        // pages 10 and 20, after the page loop, final
        assert_eq!(sink.snapshot().dataset_writes, 4);
        assert_eq!(coordinator.state().dataset.len(), 1);
    }

    #[tokio::test]
    async fn test_resume_skips_known_entries_and_clears_marker() {
        let catalog = ScriptedCatalog::with_pages([
            (3, vec!["https://kym.test/memes/old", "https://kym.test/memes/new"]),
            (4, vec!["https://kym.test/memes/newer"]),
        ]);
        let sink = MemorySink::default();
        sink.contents.lock().unwrap().resume_marker = Some(3);
        let mut coordinator = coordinator(catalog, CountingRotation::default(), sink.clone());

        let restored = Restored {
            dataset: vec![Record::new("https://kym.test/memes/old")],
            skipped_pages: vec![1],
            skipped_items: Vec::new(),
            resume_marker: Some(3),
        };
        let summary = coordinator.resume(3, 5, restored).await.unwrap();

        assert_eq!(summary.records, 3);
        assert_eq!(summary.skipped_pages, 1);
        assert_eq!(coordinator.catalog.record_calls("https://kym.test/memes/old"), 0);

        let contents = sink.snapshot();
        assert!(contents.resume_marker.is_none());
        assert_eq!(contents.skipped_pages, Some(vec![1]));
        assert_eq!(
            urls(&contents.dataset),
            vec![
                "https://kym.test/memes/old",
                "https://kym.test/memes/new",
                "https://kym.test/memes/newer",
            ]
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("https://knowyourmeme.com/memes/doge-coin"), "Doge coin");
        assert_eq!(display_name("https://knowyourmeme.com/memes/NYAN-Cat/"), "Nyan cat");
        assert_eq!(display_name(""), "");
    }

    #[tokio::test]
    async fn test_run_crawl_rejects_missing_range_before_io() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.checkpoint.output_dir = dir.path().join("out");

        let result = run_crawl(config, RangeRequest::default(), false).await;

        assert!(matches!(
            result,
            Err(HarvestError::Config(ConfigError::MissingRange))
        ));
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_run_crawl_resume_without_marker() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.checkpoint.output_dir = dir.path().to_path_buf();
        let range = RangeRequest {
            all: false,
            start: None,
            end: Some(3),
        };

        let result = run_crawl(config, range, true).await;

        assert!(matches!(
            result,
            Err(HarvestError::Config(ConfigError::NoResumeMarker(_)))
        ));
    }
}
