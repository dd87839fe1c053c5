//! Drives a search collaborator and forwards its results

use crate::config::SearchConfig;
use crate::search::{
    BatchCallback, ResultItem, ScrapeConfig, ScrapeMethod, SearchCollaborator, SearchError,
    SearchQueries,
};
use crate::storage::expand_store_path;
use async_trait::async_trait;
use chrono::Local;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Runs the configured queries through a search collaborator
pub struct SearchRunner {
    queries: SearchQueries,
    scrape_method: ScrapeMethod,
    proxy_file: Option<PathBuf>,
    caching: bool,
    results_db: PathBuf,
    collaborator: Arc<dyn SearchCollaborator>,
    results: Vec<ResultItem>,
}

impl SearchRunner {
    /// Creates a runner from the search configuration
    ///
    /// The domain restriction is applied to the queries here, once.
    pub fn new(config: &SearchConfig, collaborator: Arc<dyn SearchCollaborator>) -> Self {
        Self {
            queries: SearchQueries::new(config.queries.clone(), config.domain.as_deref()),
            scrape_method: config.scrape_method,
            proxy_file: config.proxy_file.clone(),
            caching: config.caching,
            results_db: expand_store_path(&config.results_db, &Local::now()),
            collaborator,
            results: Vec::new(),
        }
    }

    /// Configuration handed to the collaborator
    pub fn scrape_config(&self) -> ScrapeConfig {
        ScrapeConfig {
            keywords: self.queries.keywords(),
            num_pages: self.scrape_method.num_pages(),
            scrape_method: self.scrape_method,
            proxy_file: self.proxy_file.clone(),
            caching: self.caching,
            results_db: self.results_db.clone(),
        }
    }

    /// Runs the search
    ///
    /// Every batch the collaborator streams is handed to `callback` as it
    /// arrives. Once the collaborator returns, the full persisted result set
    /// is read back, appended to this runner's record and returned.
    pub async fn run(
        &mut self,
        callback: &dyn BatchCallback,
    ) -> Result<Vec<ResultItem>, SearchError> {
        let config = self.scrape_config();

        if let Some(proxy_file) = &config.proxy_file {
            tracing::info!("Using proxies from {}", proxy_file.display());
        }
        tracing::info!(
            "Searching {} queries ({} method, {} pages each)",
            config.keywords.len(),
            config.scrape_method,
            config.num_pages
        );

        let counting = CountingCallback {
            inner: callback,
            queries: &self.queries,
            streamed: AtomicUsize::new(0),
        };

        let handle = self.collaborator.scrape(&config, &counting).await?;
        let persisted = handle.read_all()?;

        tracing::info!(
            "Search finished: {} results streamed, {} persisted",
            counting.streamed.load(Ordering::Relaxed),
            persisted.len()
        );

        self.results.extend(persisted.iter().cloned());
        Ok(persisted)
    }

    pub fn queries(&self) -> &SearchQueries {
        &self.queries
    }

    /// Every result read back from the collaborator so far
    pub fn results(&self) -> &[ResultItem] {
        &self.results
    }
}

impl fmt::Display for SearchRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Search patterns     : {}", self.queries)?;
        if let Some(domain) = self.queries.domain() {
            writeln!(f, "Restrict to domain  : {}", domain)?;
        }
        writeln!(f, "Total results count : {}", self.results.len())
    }
}

/// Logs each batch before handing it on
struct CountingCallback<'a> {
    inner: &'a dyn BatchCallback,
    queries: &'a SearchQueries,
    streamed: AtomicUsize,
}

#[async_trait]
impl<'a> BatchCallback for CountingCallback<'a> {
    async fn on_batch(&self, keyword: &str, items: Vec<ResultItem>) {
        let label = self.queries.label_for(keyword).unwrap_or(keyword);
        tracing::debug!("Query '{}': {} results", label, items.len());
        self.streamed.fetch_add(items.len(), Ordering::Relaxed);
        self.inner.on_batch(keyword, items).await;
    }
}
