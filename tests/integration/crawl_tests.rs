//! Integration tests for crawl jobs
//!
//! These tests use wiremock to create mock HTTP servers and run whole
//! jobs against them, from seeding to the close sequence.

use harvest_ripple::config::{CrawlerConfig, UserAgentConfig};
use harvest_ripple::crawler::Fetcher;
use harvest_ripple::parser::strip_tags;
use harvest_ripple::url::LanguageCode;
use harvest_ripple::{
    ContentCollector, JobState, ParserDescriptor, ScrapeError, ScrapeOption, Scraper,
    ScraperBuilder,
};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a fetcher with short timeouts and the given 429 cooldown
fn test_fetcher(cooldown_ms: u64) -> Arc<Fetcher> {
    let crawler = CrawlerConfig {
        request_timeout_ms: 2_000,
        connect_timeout_ms: 1_000,
        rate_limit_cooldown_ms: cooldown_ms,
        ..CrawlerConfig::default()
    };
    Arc::new(
        Fetcher::from_config(&crawler, &UserAgentConfig::default())
            .expect("Failed to build fetcher"),
    )
}

fn sentences() -> ParserDescriptor {
    ParserDescriptor::new("sentences", "[A-Z][a-z ]*[.!?]")
        .expect("Failed to compile pattern")
        .with_transform(strip_tags)
}

fn builder(server: &MockServer, dir: &Path) -> ScraperBuilder {
    ScraperBuilder::new(format!("{}/", server.uri()))
        .output_dir(dir)
        .idle_wait(Duration::from_millis(10))
        .fetcher(test_fetcher(200))
}

/// Mounts an HTML page on the mock server
async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(format!("<html><body>{}</body></html>", body), "text/html"),
        )
        .mount(server)
        .await;
}

async fn wait_closed(scraper: &Scraper) {
    tokio::time::timeout(Duration::from_secs(20), scraper.wait())
        .await
        .expect("Job did not close in time");
    assert_eq!(scraper.state(), JobState::Closed);
}

fn read_sorted_lines(path: &Path) -> Vec<String> {
    let mut lines: Vec<String> = std::fs::read_to_string(path)
        .expect("Failed to read output file")
        .lines()
        .map(str::to_string)
        .collect();
    lines.sort();
    lines
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_crawl_collects_distinct_sentences() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        r#"<p>Hello world.</p><p>Rust is fast!</p>
        <a href="/wiki/A">first</a> <a href="/wiki/B">second</a> <a href="/wiki/C">third</a>"#,
    )
    .await;
    mount_page(
        &server,
        "/wiki/A",
        r#"<p>Alpha page here.</p><a href="/">home</a> <a href="/wiki/B">second</a>"#,
    )
    .await;
    mount_page(
        &server,
        "/wiki/B",
        r#"<p>Beta page here.</p><p>Hello world.</p><a href="/wiki/A">first</a>"#,
    )
    .await;
    mount_page(&server, "/wiki/C", "<p>Gamma page.</p>").await;

    let scraper = builder(&server, dir.path())
        .parser(sentences())
        .limit(10)
        .option(ScrapeOption::SaveParsedElements)
        .option(ScrapeOption::SaveLinks)
        .build(1)
        .unwrap();

    assert!(scraper.start().await.unwrap());
    wait_closed(&scraper).await;

    let collector = &scraper.collectors()[0];
    let saved = read_sorted_lines(collector.output_path());
    assert_eq!(
        saved,
        vec![
            "Alpha page here.",
            "Beta page here.",
            "Gamma page.",
            "Hello world.",
            "Rust is fast!"
        ]
    );
    assert_eq!(collector.total(), saved.len() as u64);

    assert_eq!(scraper.visited(), 4);
    assert_eq!(scraper.unvisited(), 0);

    let visited = read_sorted_lines(&dir.path().join(format!("{}.visited.txt", scraper.label())));
    assert_eq!(visited.len(), 4);
    let unvisited = dir.path().join(format!("{}.unvisited.txt", scraper.label()));
    assert_eq!(std::fs::read_to_string(unvisited).unwrap(), "");

    let report = scraper.info();
    assert_eq!(report.state, JobState::Closed);
    assert_eq!(report.collectors[0].contributed, 5);
    assert_eq!(report.collectors[0].percentage(), 100.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rate_limited_page_cools_down_and_yields_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        r#"<p>Start here.</p><a href="/limited">limited</a> <a href="/ok">ok</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(
            ResponseTemplate::new(429).set_body_raw("<p>Never collected.</p>", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/ok", "<p>Fine page.</p>").await;

    let scraper = builder(&server, dir.path())
        .parser(sentences())
        .build(1)
        .unwrap();

    let started = Instant::now();
    scraper.start().await.unwrap();
    wait_closed(&scraper).await;

    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(scraper.has_visited(&format!("{}/limited", server.uri())));

    let collected = scraper.collectors()[0].cached_items();
    assert!(collected.contains(&"Fine page.".to_string()));
    assert!(!collected.contains(&"Never collected.".to_string()));
    assert_eq!(scraper.collectors()[0].total(), 2);
}

#[tokio::test]
async fn test_stay_on_website_ignores_other_sites() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        r#"<p>Start here.</p><a href="http://elsewhere.invalid/x">away</a> <a href="/local">local</a>"#,
    )
    .await;
    mount_page(&server, "/local", "<p>Local page.</p>").await;

    let scraper = builder(&server, dir.path())
        .parser(sentences())
        .option(ScrapeOption::StayOnWebsite)
        .build(1)
        .unwrap();

    scraper.start().await.unwrap();
    wait_closed(&scraper).await;

    assert!(scraper.has_visited(&format!("{}/local", server.uri())));
    assert!(!scraper.has_visited("http://elsewhere.invalid/x"));
    assert_eq!(scraper.visited(), 2);
}

#[tokio::test]
async fn test_restrict_language_follows_marked_links_only() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        r#"<p>Start here.</p><a href="/en/page">english</a> <a href="/fr/page">french</a>"#,
    )
    .await;
    mount_page(&server, "/en/page", "<p>English page.</p>").await;
    mount_page(&server, "/fr/page", "<p>French page.</p>").await;

    let scraper = builder(&server, dir.path())
        .parser(sentences())
        .restrict_language(LanguageCode::new("en").unwrap())
        .build(1)
        .unwrap();

    scraper.start().await.unwrap();
    wait_closed(&scraper).await;

    assert!(scraper.has_visited(&format!("{}/en/page", server.uri())));
    assert!(!scraper.has_visited(&format!("{}/fr/page", server.uri())));

    let collected = scraper.collectors()[0].cached_items();
    assert!(collected.contains(&"English page.".to_string()));
    assert!(!collected.contains(&"French page.".to_string()));
}

/// Mounts a seed linking to `pages` pages that each carry `per_page` items
async fn mount_item_site(server: &MockServer, pages: usize, per_page: usize) {
    let links: Vec<String> = (0..pages)
        .map(|i| format!(r#"<a href="/p/{}">page</a>"#, i))
        .collect();
    mount_page(server, "/", &links.join(" ")).await;

    for page in 0..pages {
        let items: Vec<String> = (0..per_page)
            .map(|i| format!("<p>Item {}</p>", page * 100 + i))
            .collect();
        mount_page(server, &format!("/p/{}", page), &items.join("")).await;
    }
}

fn items() -> ParserDescriptor {
    ParserDescriptor::new("items", r"Item \d+").unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_workers_close_once_without_duplicates() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_item_site(&server, 20, 2).await;

    let scraper = builder(&server, dir.path())
        .parser(items())
        .threads(4)
        .option(ScrapeOption::SaveParsedElements)
        .build(1)
        .unwrap();

    scraper.start().await.unwrap();
    wait_closed(&scraper).await;

    assert_eq!(scraper.workers(), 0);
    assert_eq!(scraper.visited(), 21);

    let saved = read_sorted_lines(scraper.collectors()[0].output_path());
    let mut distinct = saved.clone();
    distinct.dedup();
    assert_eq!(saved.len(), 40);
    assert_eq!(distinct.len(), 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_limit_holds_with_concurrent_workers() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_item_site(&server, 20, 3).await;

    let scraper = builder(&server, dir.path())
        .parser(items())
        .limit(7)
        .threads(4)
        .option(ScrapeOption::SaveParsedElements)
        .build(1)
        .unwrap();

    scraper.start().await.unwrap();
    wait_closed(&scraper).await;

    let collector = &scraper.collectors()[0];
    assert_eq!(collector.total(), 7);
    assert!(collector.reached_limit());
    assert_eq!(read_sorted_lines(collector.output_path()).len(), 7);
}

#[tokio::test]
async fn test_unlimited_ignores_collector_limits() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_item_site(&server, 5, 2).await;

    let scraper = builder(&server, dir.path())
        .parser(items())
        .limit(1)
        .option(ScrapeOption::Unlimited)
        .build(1)
        .unwrap();

    scraper.start().await.unwrap();
    wait_closed(&scraper).await;

    // The crawl covers the whole site even though the limit stops collection
    assert_eq!(scraper.visited(), 6);
    assert_eq!(scraper.collectors()[0].total(), 1);
}

#[tokio::test]
async fn test_unreachable_seed_is_unable_to_start() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let scraper = builder(&server, dir.path())
        .parser(sentences())
        .build(1)
        .unwrap();

    let result = scraper.start().await;
    assert!(matches!(result, Err(ScrapeError::UnableToStart { .. })));
    assert_eq!(scraper.state(), JobState::Idle);
}

#[tokio::test]
async fn test_seed_without_links_is_unable_to_start() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_page(&server, "/", "<p>Nothing to follow.</p>").await;

    let scraper = builder(&server, dir.path())
        .parser(sentences())
        .build(1)
        .unwrap();

    assert!(matches!(
        scraper.start().await,
        Err(ScrapeError::UnableToStart { .. })
    ));
}

/// Mounts a seed linking to 50 pages that each take 100ms to answer
async fn mount_slow_site(server: &MockServer) {
    let links: Vec<String> = (0..50)
        .map(|i| format!(r#"<a href="/slow/{}">page</a>"#, i))
        .collect();
    mount_page(server, "/", &links.join(" ")).await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<p>Slow page.</p>", "text/html")
                .set_delay(Duration::from_millis(100)),
        )
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_mid_crawl_closes_and_blocks_restart() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_slow_site(&server).await;

    let scraper = builder(&server, dir.path())
        .parser(sentences())
        .threads(2)
        .option(ScrapeOption::SaveLinks)
        .build(1)
        .unwrap();

    scraper.start().await.unwrap();
    assert!(!scraper.start().await.unwrap());
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(scraper.stop().await);
    assert_eq!(scraper.state(), JobState::Closed);
    assert!(scraper.unvisited() > 0);

    let unvisited = dir.path().join(format!("{}.unvisited.txt", scraper.label()));
    assert_eq!(read_sorted_lines(&unvisited).len(), scraper.unvisited());

    assert!(!scraper.start().await.unwrap());
    assert!(!scraper.stop().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_racing_start_waits_for_close() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_slow_site(&server).await;

    let scraper = Arc::new(
        builder(&server, dir.path())
            .parser(sentences())
            .threads(2)
            .build(1)
            .unwrap(),
    );
    let starter = {
        let scraper = Arc::clone(&scraper);
        tokio::spawn(async move { scraper.start().await })
    };

    tokio::time::timeout(Duration::from_secs(20), async {
        // Keep stopping until the job is running; a successful stop must
        // only return once the close sequence has run
        while !scraper.stop().await {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("Job never became stoppable");

    assert_eq!(scraper.state(), JobState::Closed);
    assert_eq!(scraper.workers(), 0);
    assert!(starter.await.unwrap().unwrap());
}

#[tokio::test]
async fn test_seed_redirect_resolves_links_against_landing_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/wiki/Home"))
        .mount(&server)
        .await;
    mount_page(&server, "/wiki/Home", r#"<p>Home page.</p><a href="Next">next</a>"#).await;
    mount_page(&server, "/wiki/Next", "<p>Next page.</p>").await;

    let scraper = builder(&server, dir.path())
        .parser(sentences())
        .build(1)
        .unwrap();

    scraper.start().await.unwrap();
    wait_closed(&scraper).await;

    let uri = server.uri();
    assert!(scraper.has_visited(&format!("{}/wiki/Home", uri)));
    assert!(scraper.has_visited(&format!("{}/wiki/Next", uri)));
    assert!(!scraper.has_visited(&format!("{}/Next", uri)));
    assert_eq!(scraper.visited(), 3);
    assert_eq!(scraper.collectors()[0].total(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_visited_links_flush_during_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_item_site(&server, 20, 1).await;

    let scraper = builder(&server, dir.path())
        .parser(items())
        .threads(3)
        .cache_size(2)
        .option(ScrapeOption::SaveLinks)
        .build(1)
        .unwrap();

    scraper.start().await.unwrap();
    wait_closed(&scraper).await;

    let visited = read_sorted_lines(&dir.path().join(format!("{}.visited.txt", scraper.label())));
    let mut distinct = visited.clone();
    distinct.dedup();
    assert_eq!(scraper.visited(), 21);
    assert_eq!(visited.len(), 21);
    assert_eq!(distinct.len(), 21);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_collector_splits_contributions() {
    let first_server = MockServer::start().await;
    let second_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &first_server,
        "/",
        r#"<p>One here.</p><a href="/a">a</a>"#,
    )
    .await;
    mount_page(&first_server, "/a", "<p>Two here.</p>").await;
    mount_page(
        &second_server,
        "/",
        r#"<p>Three here.</p><a href="/b">b</a>"#,
    )
    .await;
    mount_page(&second_server, "/b", "<p>Four here.</p><p>One here.</p>").await;

    let shared = Arc::new(ContentCollector::new(sentences(), None, dir.path()));
    let first = builder(&first_server, dir.path())
        .collector(Arc::clone(&shared))
        .build(1)
        .unwrap();
    let second = builder(&second_server, dir.path())
        .collector(Arc::clone(&shared))
        .build(2)
        .unwrap();

    first.start().await.unwrap();
    second.start().await.unwrap();
    wait_closed(&first).await;
    wait_closed(&second).await;

    let first_share = &first.info().collectors[0];
    let second_share = &second.info().collectors[0];
    assert_eq!(shared.total(), 4);
    assert_eq!(first_share.contributed + second_share.contributed, 4);
    assert!((first_share.percentage() + second_share.percentage() - 100.0).abs() < 1e-9);
}
