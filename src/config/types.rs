use crate::parsers::ParserKind;
use crate::search::ScrapeMethod;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// User agent sent with every result download
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; MSIE 10.0; Windows NT 6.1; Trident/6.0)";

/// Main configuration structure for a harvest run
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub search: SearchConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Parser table, in priority order
    #[serde(default, rename = "parser")]
    pub parsers: Vec<ParserEntry>,
}

/// Search stage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Query label -> query string
    pub queries: BTreeMap<String, String>,

    /// Restrict every query to this domain (appends `site:<domain>`)
    #[serde(default)]
    pub domain: Option<String>,

    /// Lightweight HTTP scraping or full browser automation
    #[serde(default, rename = "scrape-method")]
    pub scrape_method: ScrapeMethod,

    /// File listing proxies for the search engine requests
    #[serde(default, rename = "proxy-file")]
    pub proxy_file: Option<PathBuf>,

    /// Result store path; `{timestamp}` expands to the run start time
    #[serde(default = "default_results_db", rename = "results-db")]
    pub results_db: String,

    /// Replay keywords already present in the result store
    #[serde(default = "default_caching")]
    pub caching: bool,
}

/// Collection stage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Number of distinct matches to collect; -1 runs until search is exhausted
    #[serde(default = "default_count_objective", rename = "count-objective")]
    pub count_objective: i64,

    /// Tab-separated output file written as matches are found
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl HarvestConfig {
    /// Returns the objective as a count, or None when unbounded
    pub fn objective(&self) -> Option<usize> {
        usize::try_from(self.count_objective).ok()
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            count_objective: default_count_objective(),
            output: None,
        }
    }
}

/// Fetch stage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs", rename = "timeout-secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent", rename = "user-agent")]
    pub user_agent: String,

    /// Maximum number of downloads in flight
    #[serde(
        default = "default_max_concurrent_fetches",
        rename = "max-concurrent-fetches"
    )]
    pub max_concurrent_fetches: usize,

    /// Capacity of the queue between search and fetch
    #[serde(default = "default_queue_capacity", rename = "queue-capacity")]
    pub queue_capacity: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// One row of the parser table
#[derive(Debug, Clone, Deserialize)]
pub struct ParserEntry {
    /// URL suffix (e.g. ".pdf") or "*" for the default parser
    pub pattern: String,

    pub kind: ParserKind,

    /// Expression for the `regex` parser kind
    #[serde(default)]
    pub regex: Option<String>,
}

fn default_results_db() -> String {
    "results_{timestamp}.db".to_string()
}

fn default_caching() -> bool {
    true
}

fn default_count_objective() -> i64 {
    -1
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_max_concurrent_fetches() -> usize {
    16
}

fn default_queue_capacity() -> usize {
    256
}
