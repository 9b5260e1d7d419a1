//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a small catalog and drive the
//! coordinator end-to-end through the real HTTP catalog and checkpoint directory.

use async_trait::async_trait;
use kym_harvester::checkpoint::{
    CheckpointStore, DirectorySink, RecordSink, DATASET_FILE, RESUME_MARKER_FILE,
    SKIPPED_ITEMS_FILE, SKIPPED_PAGES_FILE,
};
use kym_harvester::config::{Config, SiteConfig};
use kym_harvester::crawler::{Coordinator, HttpCatalog};
use kym_harvester::identity::{IdentityRotator, RotationError, RotationService, UserAgentPool};
use kym_harvester::state::{Year, COLUMNS};
use kym_harvester::{CrawlPhase, HarvestError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Rotation service counting circuits, optionally refusing all of them
#[derive(Clone, Default)]
struct LocalRotation {
    circuits: Arc<AtomicU32>,
    refuse: bool,
}

impl LocalRotation {
    fn count(&self) -> u32 {
        self.circuits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RotationService for LocalRotation {
    async fn connect(&mut self) -> Result<(), RotationError> {
        Ok(())
    }

    async fn new_circuit(&mut self) -> Result<Duration, RotationError> {
        if self.refuse {
            return Err(RotationError::Protocol("551 Tor is shutting down".to_string()));
        }
        self.circuits.fetch_add(1, Ordering::SeqCst);
        Ok(Duration::ZERO)
    }
}

fn listing(slugs: &[&str]) -> String {
    let anchors: String = slugs
        .iter()
        .map(|slug| format!(r#"<a class="photo" href="/memes/{}">{}</a>"#, slug, slug))
        .collect();
    format!("<html><body>{}</body></html>", anchors)
}

fn entry(name: &str, views: u32) -> String {
    format!(
        r#"<html><body>
  <h1>{name}</h1>
  <dl><dd class="views"><a href="/memes/x/views">{views}</a></dd></dl>
  <aside class="left"><dl><dt>Year</dt><dd>2011</dd></dl></aside>
  <section class="bodycopy">
    <h2>About</h2>
    <p>{name} is an entry.</p>
  </section>
</body></html>"#
    )
}

async fn mount_listing(server: &MockServer, page: u32, slugs: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/memes/all/page/{}", page)))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(slugs)))
        .mount(server)
        .await;
}

async fn mount_entry(server: &MockServer, slug: &str, views: u32) {
    Mock::given(method("GET"))
        .and(path(format!("/memes/{}", slug)))
        .respond_with(ResponseTemplate::new(200).set_body_string(entry(slug, views)))
        .mount(server)
        .await;
}

fn create_test_config(server: &MockServer, budget: u32) -> Config {
    let mut config = Config::default();
    config.site = SiteConfig {
        base_url: server.uri(),
        ip_check_url: format!("{}/ip", server.uri()),
        request_timeout_secs: 5,
        ..SiteConfig::default()
    };
    config.retry.budget = budget;
    config
}

fn coordinator(
    config: &Config,
    service: LocalRotation,
    dir: &TempDir,
) -> Coordinator<HttpCatalog, LocalRotation, DirectorySink> {
    let catalog = HttpCatalog::new(config.site.clone(), None).expect("Failed to build catalog");
    let agents = UserAgentPool::new(vec!["agent-one".to_string(), "agent-two".to_string()]);
    let rotator = IdentityRotator::new(service, agents, Duration::from_secs(600));
    let store = CheckpointStore::new(DirectorySink::new(dir.path()));
    Coordinator::new(catalog, rotator, store, config)
}

#[tokio::test]
async fn test_full_crawl_writes_dataset() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["doge", "nyan-cat"]).await;
    mount_listing(&server, 2, &["trollface"]).await;
    mount_entry(&server, "doge", 1200).await;
    mount_entry(&server, "nyan-cat", 800).await;
    mount_entry(&server, "trollface", 5).await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&server, 10);
    let service = LocalRotation::default();
    let mut coordinator = coordinator(&config, service.clone(), &dir);

    let summary = coordinator.run(1, 3).await.expect("Crawl failed");

    assert_eq!(summary.records, 3);
    assert_eq!(summary.pages, 2);
    assert_eq!(coordinator.phase(), CrawlPhase::Done);
    assert_eq!(service.count(), 0);

    let csv = std::fs::read_to_string(dir.path().join(DATASET_FILE)).unwrap();
    assert_eq!(csv.lines().next().unwrap(), COLUMNS.join(","));

    let records = DirectorySink::new(dir.path()).load_dataset().unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["doge", "nyan-cat", "trollface"]);
    assert_eq!(records[0].views, 1200);
    assert_eq!(records[0].year, Year::Number(2011));
    assert_eq!(records[0].about, "doge is an entry.");
    assert_eq!(records[2].url, format!("{}/memes/trollface", server.uri()));

    assert!(!dir.path().join(SKIPPED_PAGES_FILE).exists());
    assert!(!dir.path().join(SKIPPED_ITEMS_FILE).exists());
    assert!(!dir.path().join(RESUME_MARKER_FILE).exists());
}

#[tokio::test]
async fn test_unreachable_page_is_skipped() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["doge"]).await;
    mount_listing(&server, 3, &["trollface"]).await;
    mount_entry(&server, "doge", 1).await;
    mount_entry(&server, "trollface", 1).await;
    Mock::given(method("GET"))
        .and(path("/memes/all/page/2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, 4);
    let service = LocalRotation::default();
    let mut coordinator = coordinator(&config, service.clone(), &dir);

    let summary = coordinator.run(1, 4).await.expect("Crawl failed");

    assert_eq!(summary.records, 2);
    assert_eq!(summary.skipped_pages, 1);
    assert_eq!(service.count(), 3);

    let pages = std::fs::read_to_string(dir.path().join(SKIPPED_PAGES_FILE)).unwrap();
    assert_eq!(pages.trim(), "2");
}

#[tokio::test]
async fn test_unreachable_entry_retried_in_second_pass() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["doge", "gone"]).await;
    mount_entry(&server, "doge", 1).await;
    Mock::given(method("GET"))
        .and(path("/memes/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(6)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, 3);
    let mut coordinator = coordinator(&config, LocalRotation::default(), &dir);

    let summary = coordinator.run(1, 2).await.expect("Crawl failed");

    assert_eq!(summary.records, 1);
    assert_eq!(summary.skipped_items, 1);
    assert_eq!(summary.resolved_items, 0);

    let links = std::fs::read_to_string(dir.path().join(SKIPPED_ITEMS_FILE)).unwrap();
    assert_eq!(
        links.lines().collect::<Vec<_>>(),
        vec![format!("{}/memes/gone", server.uri())]
    );
}

#[tokio::test]
async fn test_fatal_failure_then_resume() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["doge"]).await;
    mount_listing(&server, 2, &["nyan-cat", "flaky"]).await;
    mount_entry(&server, "doge", 1).await;
    mount_entry(&server, "nyan-cat", 2).await;
    // First request fails, the rotation after it is refused
    Mock::given(method("GET"))
        .and(path("/memes/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_entry(&server, "flaky", 3).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, 10);

    let refusing = LocalRotation {
        refuse: true,
        ..LocalRotation::default()
    };
    let mut first = coordinator(&config, refusing, &dir);
    let result = first.run(1, 3).await;

    assert!(matches!(result, Err(HarvestError::Rotation(_))));
    assert_eq!(first.phase(), CrawlPhase::Failed);
    let marker = std::fs::read_to_string(dir.path().join(RESUME_MARKER_FILE)).unwrap();
    assert_eq!(marker.trim(), "2");

    let restored = CheckpointStore::new(DirectorySink::new(dir.path()))
        .restore()
        .unwrap();
    assert_eq!(restored.resume_marker, Some(2));
    assert_eq!(restored.dataset.len(), 2);

    let mut second = coordinator(&config, LocalRotation::default(), &dir);
    let summary = second.resume(2, 3, restored).await.expect("Resume failed");

    assert_eq!(summary.records, 3);
    assert!(!dir.path().join(RESUME_MARKER_FILE).exists());

    let records = DirectorySink::new(dir.path()).load_dataset().unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["doge", "nyan-cat", "flaky"]);
}

#[tokio::test]
async fn test_resolved_entry_leaves_no_skip_list() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["doge", "flaky"]).await;
    mount_entry(&server, "doge", 1).await;
    Mock::given(method("GET"))
        .and(path("/memes/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    mount_entry(&server, "flaky", 2).await;

    let dir = TempDir::new().unwrap();
    // Stale list from an earlier crawl into the same directory
    std::fs::write(dir.path().join(SKIPPED_PAGES_FILE), "9").unwrap();
    let config = create_test_config(&server, 3);
    let mut coordinator = coordinator(&config, LocalRotation::default(), &dir);

    let summary = coordinator.run(1, 2).await.expect("Crawl failed");

    assert_eq!(summary.records, 2);
    assert_eq!(summary.resolved_items, 1);
    assert_eq!(summary.skipped_items, 0);
    assert!(!dir.path().join(SKIPPED_ITEMS_FILE).exists());
    assert!(!dir.path().join(SKIPPED_PAGES_FILE).exists());

    let restored = CheckpointStore::new(DirectorySink::new(dir.path()))
        .restore()
        .unwrap();
    assert!(restored.skipped_items.is_empty());
    assert!(restored.skipped_pages.is_empty());
    let names: Vec<&str> = restored.dataset.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["doge", "flaky"]);
}
