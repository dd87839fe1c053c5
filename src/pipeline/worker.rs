//! Per-item fetch and parse

use crate::parsers::{ParserFn, ParserRegistry};
use crate::pipeline::fetcher::{CachePolicy, FetchError, FetchResponse, Fetcher};
use crate::search::ResultItem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Receives every match a worker produces
pub trait MatchSink: Send + Sync {
    /// Returns false once the consumer wants no more matches
    fn on_match(&self, found: String, url: &str) -> bool;
}

/// Snapshot of the dispatcher's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Items taken off the fetch queue
    pub items: u64,
    /// Downloads that failed or returned a non-200 status
    pub download_errors: u64,
    /// Matches produced by parsing, duplicates included
    pub matches: u64,
}

/// Counters shared by every worker of one dispatcher
#[derive(Debug, Default)]
pub struct FetchCounters {
    items: AtomicU64,
    download_errors: AtomicU64,
    matches: AtomicU64,
}

impl FetchCounters {
    pub fn snapshot(&self) -> FetchStats {
        FetchStats {
            items: self.items.load(Ordering::Relaxed),
            download_errors: self.download_errors.load(Ordering::Relaxed),
            matches: self.matches.load(Ordering::Relaxed),
        }
    }
}

/// Fetches and parses one result item
///
/// Cloning is cheap; every clone shares the registry, fetcher, sink,
/// counters and stop token.
#[derive(Clone)]
pub struct FetchWorker {
    registry: Arc<ParserRegistry>,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn MatchSink>,
    counters: Arc<FetchCounters>,
    cancel: CancellationToken,
}

impl FetchWorker {
    pub fn new(
        registry: Arc<ParserRegistry>,
        fetcher: Arc<dyn Fetcher>,
        sink: Arc<dyn MatchSink>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            fetcher,
            sink,
            counters: Arc::new(FetchCounters::default()),
            cancel,
        }
    }

    pub fn stats(&self) -> FetchStats {
        self.counters.snapshot()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Parses the title, then the description, then the downloaded body
    ///
    /// Download failures are counted and logged, never returned. The stop
    /// token is checked before every step.
    pub async fn run(&self, item: ResultItem) {
        self.counters.items.fetch_add(1, Ordering::Relaxed);

        let url = item.url.as_deref().unwrap_or("");
        let parser = self.registry.resolve(url);

        if self.cancel.is_cancelled() || !self.parse(&parser, &item.title, url) {
            return;
        }
        if self.cancel.is_cancelled() || !self.parse(&parser, &item.description, url) {
            return;
        }

        if url.is_empty() || self.cancel.is_cancelled() {
            return;
        }

        let fetched = tokio::select! {
            _ = self.cancel.cancelled() => return,
            result = self.fetch_with_retry(url) => result,
        };

        match fetched {
            Ok(response) if response.is_ok() => {
                if !self.cancel.is_cancelled() {
                    self.parse(&parser, &response.body, url);
                }
            }
            Ok(response) => {
                self.counters.download_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(url, status = response.status, "Download failed");
            }
            Err(e) => {
                self.counters.download_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(url, error = %e, "Download failed");
            }
        }
    }

    /// One attempt, then one more bypassing caches if the transport failed
    async fn fetch_with_retry(&self, url: &str) -> Result<FetchResponse, FetchError> {
        match self.fetcher.fetch(url, CachePolicy::Default).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::debug!(url, error = %e, "Retrying download without cache");
                self.fetcher.fetch(url, CachePolicy::Bypass).await
            }
        }
    }

    /// Emits every match in `text`; returns false if the sink asked to stop
    fn parse(&self, parser: &ParserFn, text: &str, url: &str) -> bool {
        for found in parser(text) {
            self.counters.matches.fetch_add(1, Ordering::Relaxed);
            if !self.sink.on_match(found, url) {
                return false;
            }
        }
        true
    }
}
