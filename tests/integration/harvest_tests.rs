//! Integration tests for the harvest pipeline
//!
//! These tests use wiremock to serve result pages (and a fake search engine)
//! and run the full search -> fetch -> collect cycle end-to-end.

use async_trait::async_trait;
use gsdl_harvest::config::{Config, FetchConfig, HarvestConfig, ParserEntry, SearchConfig};
use gsdl_harvest::output::read_matches;
use gsdl_harvest::parsers::{words_parser, ParserKind, ParserRegistry};
use gsdl_harvest::pipeline::{
    CachePolicy, FetchError, FetchResponse, Fetcher, Harvester, HttpFetcher,
};
use gsdl_harvest::search::{
    BatchCallback, DuckDuckGoSearch, ResultHandle, ResultItem, ScrapeConfig, ScrapeMethod,
    SearchCollaborator, SearchError,
};
use gsdl_harvest::state::{RunState, StopReason};
use gsdl_harvest::storage::{SqliteStorage, Storage};
use gsdl_harvest::GsdlError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Streams a fixed list of items as a single batch
struct StaticSearch {
    items: Vec<ResultItem>,
}

#[async_trait]
impl SearchCollaborator for StaticSearch {
    async fn scrape(
        &self,
        config: &ScrapeConfig,
        callback: &dyn BatchCallback,
    ) -> Result<Box<dyn ResultHandle>, SearchError> {
        for keyword in &config.keywords {
            callback.on_batch(keyword, self.items.clone()).await;
        }
        Ok(Box::new(self.items.clone()))
    }
}

/// Streams one batch, then fails
struct BrokenSearch {
    items: Vec<ResultItem>,
}

#[async_trait]
impl SearchCollaborator for BrokenSearch {
    async fn scrape(
        &self,
        config: &ScrapeConfig,
        callback: &dyn BatchCallback,
    ) -> Result<Box<dyn ResultHandle>, SearchError> {
        callback.on_batch(&config.keywords[0], self.items.clone()).await;
        Err(SearchError::Http("captcha wall".to_string()))
    }
}

/// Counts calls and fails every one of them
#[derive(Default)]
struct CountingFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl Fetcher for CountingFetcher {
    async fn fetch(&self, _url: &str, _cache: CachePolicy) -> Result<FetchResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::Connect("unreachable".to_string()))
    }
}

/// Creates a test configuration with a single query
fn create_test_config(objective: i64, output: Option<PathBuf>, db_path: &Path) -> Config {
    let mut queries = BTreeMap::new();
    queries.insert("main".to_string(), "found it".to_string());

    Config {
        search: SearchConfig {
            queries,
            domain: None,
            scrape_method: ScrapeMethod::Http,
            proxy_file: None,
            results_db: db_path.to_string_lossy().into_owned(),
            caching: false,
        },
        harvest: HarvestConfig {
            count_objective: objective,
            output,
        },
        fetch: FetchConfig {
            timeout_secs: 5,
            max_concurrent_fetches: 4,
            queue_capacity: 8,
            ..FetchConfig::default()
        },
        parsers: vec![ParserEntry {
            pattern: "*".to_string(),
            kind: ParserKind::Words,
            regex: None,
        }],
    }
}

fn recording_observer(seen: &Arc<Mutex<Vec<(String, String)>>>) -> impl FnMut(&str, &str) + Send {
    let seen = seen.clone();
    move |found: &str, url: &str| {
        seen.lock()
            .expect("observer lock poisoned")
            .push((found.to_string(), url.to_string()))
    }
}

async fn mount_page(server: &MockServer, route: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_objective_one_stops_after_first_match() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", 200, "body text").await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(1, None, &dir.path().join("results.db"));
    let url = format!("{}/a", server.uri());
    let search = Arc::new(StaticSearch {
        items: vec![ResultItem::new("Found it", url.clone(), "nothing")],
    });
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch).expect("Failed to build client"));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut harvester = Harvester::new(config, search, fetcher)
        .expect("Failed to create harvester")
        .with_observer(recording_observer(&seen));

    let report = harvester.run().await.expect("Harvest failed");

    assert_eq!(report.stop_reason, StopReason::ObjectiveReached);
    assert_eq!(report.distinct_matches(), 1);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![("Found".to_string(), url.clone())]
    );
    assert_eq!(report.matches.urls("Found").unwrap(), &[url]);
    assert_eq!(harvester.state(), RunState::Done);
}

#[tokio::test]
async fn test_404_counts_one_download_error() {
    let server = MockServer::start().await;
    mount_page(&server, "/missing", 404, "gone words here").await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(-1, None, &dir.path().join("results.db"));
    let search = Arc::new(StaticSearch {
        items: vec![ResultItem::new(
            "title",
            format!("{}/missing", server.uri()),
            "description",
        )],
    });
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch).expect("Failed to build client"));

    let mut harvester = Harvester::new(config, search, fetcher)
        .expect("Failed to create harvester")
        .with_observer(|_, _| {});

    let report = harvester.run().await.expect("Harvest failed");

    assert_eq!(report.stop_reason, StopReason::Exhausted);
    assert_eq!(report.fetch.download_errors, 1);
    // Title and description were still parsed; the error page body was not
    assert_eq!(report.fetch.matches, 2);
    assert!(report.matches.contains("title"));
    assert!(report.matches.contains("description"));
    assert!(!report.matches.contains("gone"));
}

#[tokio::test]
async fn test_empty_url_never_fetches() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(-1, None, &dir.path().join("results.db"));
    let search = Arc::new(StaticSearch {
        items: vec![ResultItem::new("lonely title", "", "and snippet")],
    });
    let fetcher = Arc::new(CountingFetcher::default());

    let mut harvester = Harvester::new(config, search, fetcher.clone())
        .expect("Failed to create harvester")
        .with_observer(|_, _| {});

    let report = harvester.run().await.expect("Harvest failed");

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.distinct_matches(), 4);
    assert_eq!(report.fetch.download_errors, 0);
}

#[tokio::test]
async fn test_transport_failure_is_retried_and_counted() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(-1, None, &dir.path().join("results.db"));
    let search = Arc::new(StaticSearch {
        items: vec![ResultItem::new("t", "http://unreachable.invalid/", "")],
    });
    let fetcher = Arc::new(CountingFetcher::default());

    let mut harvester = Harvester::new(config, search, fetcher.clone())
        .expect("Failed to create harvester")
        .with_observer(|_, _| {});

    let report = harvester.run().await.expect("Harvest failed");

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.fetch.download_errors, 1);
}

#[tokio::test]
async fn test_unbounded_runs_to_exhaustion_and_dedups() {
    let server = MockServer::start().await;
    mount_page(&server, "/one", 200, "shared alpha").await;
    mount_page(&server, "/two", 200, "shared beta").await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(-1, None, &dir.path().join("results.db"));
    let one = format!("{}/one", server.uri());
    let two = format!("{}/two", server.uri());
    let search = Arc::new(StaticSearch {
        items: vec![
            ResultItem::new("", one.clone(), ""),
            ResultItem::new("", two.clone(), ""),
            // Same page twice: its URL must not be listed twice
            ResultItem::new("", one.clone(), ""),
        ],
    });
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch).expect("Failed to build client"));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut harvester = Harvester::new(config, search, fetcher)
        .expect("Failed to create harvester")
        .with_observer(recording_observer(&seen));

    let report = harvester.run().await.expect("Harvest failed");

    assert_eq!(report.stop_reason, StopReason::Exhausted);
    assert_eq!(report.fetch.items, 3);
    assert_eq!(report.fetch.matches, 6);
    assert_eq!(report.distinct_matches(), 3);

    let mut shared = report.matches.urls("shared").unwrap().to_vec();
    shared.sort();
    let mut expected = vec![one, two];
    expected.sort();
    assert_eq!(shared, expected);

    // Each distinct match is reported exactly once
    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_output_file_matches_report_order() {
    let server = MockServer::start().await;
    mount_page(&server, "/doc", 200, "gamma delta gamma").await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let out_path = dir.path().join("matches.tsv");
    let config = create_test_config(-1, Some(out_path.clone()), &dir.path().join("results.db"));
    let url = format!("{}/doc", server.uri());
    let search = Arc::new(StaticSearch {
        items: vec![ResultItem::new("alpha", url.clone(), "beta")],
    });
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch).expect("Failed to build client"));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut harvester = Harvester::new(config, search, fetcher)
        .expect("Failed to create harvester")
        .with_observer(recording_observer(&seen));

    let report = harvester.run().await.expect("Harvest failed");

    let lines = read_matches(&out_path).expect("Failed to read output");
    assert_eq!(lines, *seen.lock().unwrap());
    let found: Vec<&str> = lines.iter().map(|(m, _)| m.as_str()).collect();
    assert_eq!(found, vec!["alpha", "beta", "gamma", "delta"]);
    assert!(lines.iter().all(|(_, u)| *u == url));
    assert_eq!(report.output.as_deref(), Some(out_path.as_path()));
}

#[tokio::test]
async fn test_output_file_keeps_tab_bearing_matches_distinct() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let out_path = dir.path().join("matches.tsv");
    let config = create_test_config(-1, Some(out_path.clone()), &dir.path().join("results.db"));
    let search = Arc::new(StaticSearch {
        items: vec![ResultItem::new("title", "", "")],
    });
    let fetcher = Arc::new(CountingFetcher::default());

    let registry = ParserRegistry::new().with("*", |_: &str| {
        vec!["a\tb".to_string(), "a b".to_string()]
    });
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut harvester = Harvester::new(config, search, fetcher)
        .expect("Failed to create harvester")
        .with_parsers(registry)
        .with_observer(recording_observer(&seen));

    let report = harvester.run().await.expect("Harvest failed");

    assert_eq!(report.distinct_matches(), 2);
    let lines = read_matches(&out_path).expect("Failed to read output");
    assert_eq!(lines, *seen.lock().unwrap());
    assert_eq!(
        lines,
        vec![
            ("a\tb".to_string(), String::new()),
            ("a b".to_string(), String::new()),
        ]
    );
}

#[tokio::test]
async fn test_search_failure_returns_error_without_hanging() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(-1, None, &dir.path().join("results.db"));
    let search = Arc::new(BrokenSearch {
        items: vec![ResultItem::new("partial", "", "")],
    });

    let mut harvester = Harvester::new(config, search, Arc::new(CountingFetcher::default()))
        .expect("Failed to create harvester")
        .with_observer(|_, _| {});

    let result = tokio::time::timeout(Duration::from_secs(10), harvester.run())
        .await
        .expect("Harvest hung after search failure");

    assert!(matches!(result, Err(GsdlError::Search(_))));
    assert_eq!(harvester.state(), RunState::Done);
}

#[tokio::test]
async fn test_cancel_token_interrupts_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("slow")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(-1, None, &dir.path().join("results.db"));
    let search = Arc::new(StaticSearch {
        items: vec![ResultItem::new("", format!("{}/slow", server.uri()), "")],
    });
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch).expect("Failed to build client"));

    let mut harvester = Harvester::new(config, search, fetcher)
        .expect("Failed to create harvester")
        .with_observer(|_, _| {});
    let token = harvester.cancel_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(10), harvester.run())
        .await
        .expect("Cancelled harvest did not stop")
        .expect("Harvest failed");

    assert_eq!(report.stop_reason, StopReason::Interrupted);
    assert!(report.matches.is_empty());
}

#[tokio::test]
async fn test_parser_table_selects_by_suffix() {
    let server = MockServer::start().await;
    mount_page(&server, "/report.pdf", 200, "pdfword").await;
    mount_page(&server, "/index.html", 200, "htmlword").await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(-1, None, &dir.path().join("results.db"));
    let search = Arc::new(StaticSearch {
        items: vec![
            ResultItem::new("", format!("{}/report.pdf", server.uri()), ""),
            ResultItem::new("", format!("{}/index.html", server.uri()), ""),
        ],
    });
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch).expect("Failed to build client"));

    // Only .pdf results are parsed; no wildcard, so everything else is ignored
    let registry = ParserRegistry::new().with(".pdf", words_parser);
    let mut harvester = Harvester::new(config, search, fetcher)
        .expect("Failed to create harvester")
        .with_parsers(registry)
        .with_observer(|_, _| {});

    let report = harvester.run().await.expect("Harvest failed");

    assert!(report.matches.contains("pdfword"));
    assert!(!report.matches.contains("htmlword"));
    assert_eq!(report.parsers, vec![".pdf".to_string()]);
}

const DDG_PAGE: &str = r#"<html><body>
<div class="result results_links results_links_deep web-result">
    <a class="result__a" href="{base}/first">First needle</a>
    <div class="result__snippet">snippet one</div>
</div>
<div class="result results_links results_links_deep web-result">
    <a class="result__a" href="{base}/second">Second result</a>
    <div class="result__snippet">snippet two</div>
</div>
</body></html>"#;

#[tokio::test]
async fn test_duckduckgo_search_end_to_end() {
    let server = MockServer::start().await;
    let base = server.uri();

    // First results page, then an empty one
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DDG_PAGE.replace("{base}", &base)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&server)
        .await;
    mount_page(&server, "/first", 200, "needle inside").await;
    mount_page(&server, "/second", 200, "nothing here").await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("results.db");
    let config = create_test_config(-1, None, &db_path);
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch).expect("Failed to build client"));
    let search = Arc::new(
        DuckDuckGoSearch::new(config.fetch.user_agent.clone(), Duration::from_secs(5))
            .with_endpoint(format!("{}/html/", base)),
    );

    let mut harvester = Harvester::new(config, search, fetcher)
        .expect("Failed to create harvester")
        .with_observer(|_, _| {});

    let report = harvester.run().await.expect("Harvest failed");

    assert_eq!(report.search_results, 2);
    assert_eq!(report.fetch.items, 2);
    assert_eq!(
        report.matches.urls("needle").unwrap(),
        &[format!("{}/first", base)]
    );

    // Results were recorded in the result store as well as streamed
    let storage = SqliteStorage::new(&db_path).expect("Failed to open result store");
    assert_eq!(storage.count_results().expect("Failed to count results"), 2);
    let searches = storage
        .search_ids("found it")
        .expect("Failed to list searches");
    assert_eq!(searches.len(), 1);
    assert_eq!(
        storage
            .load_results(&searches)
            .expect("Failed to load stored results")
            .len(),
        2
    );
}

const DDG_SINGLE: &str = r#"<html><body>
<div class="result results_links results_links_deep web-result">
    <a class="result__a" href="{base}/only">Only result</a>
    <div class="result__snippet">snippet</div>
</div>
</body></html>"#;

#[tokio::test]
async fn test_reused_store_counts_only_this_runs_results() {
    let server = MockServer::start().await;
    let base = server.uri();

    // Second page of every search is empty
    Mock::given(method("POST"))
        .and(path("/html/"))
        .and(body_string_contains("s=30"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(DDG_SINGLE.replace("{base}", &base)),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/only", 200, "word").await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("fixed.db");

    let mut counts = Vec::new();
    for _ in 0..2 {
        let config = create_test_config(-1, None, &db_path);
        let fetcher = Arc::new(HttpFetcher::new(&config.fetch).expect("Failed to build client"));
        let search = Arc::new(
            DuckDuckGoSearch::new(config.fetch.user_agent.clone(), Duration::from_secs(5))
                .with_endpoint(format!("{}/html/", base)),
        );
        let mut harvester = Harvester::new(config, search, fetcher)
            .expect("Failed to create harvester")
            .with_observer(|_, _| {});
        let report = harvester.run().await.expect("Harvest failed");
        counts.push((report.search_results, report.fetch.items));
    }

    assert_eq!(counts, vec![(1, 1), (1, 1)]);

    // Both runs are still in the store
    let storage = SqliteStorage::new(&db_path).expect("Failed to open result store");
    assert_eq!(storage.count_results().expect("Failed to count results"), 2);
}
