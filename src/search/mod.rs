//! Search stage
//!
//! The search stage turns the configured queries into result items. The
//! search engine itself sits behind [`SearchCollaborator`]; the
//! [`SearchRunner`] builds its configuration and forwards every streamed
//! batch into the fetch queue.

mod duckduckgo;
mod runner;

pub use duckduckgo::{parse_results_html, DuckDuckGoSearch};
pub use runner::SearchRunner;

use crate::storage::StorageError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a search collaborator
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Http(String),

    #[error("Failed to parse search results: {0}")]
    Parse(String),

    #[error("Result store error: {0}")]
    Store(#[from] StorageError),

    #[error("Failed to read proxy list {path}: {source}")]
    ProxyList {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One search result awaiting fetch and parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultItem {
    pub title: String,
    /// Absent when the engine returned no link
    pub url: Option<String>,
    pub description: String,
}

impl ResultItem {
    /// Creates an item; an empty URL is treated as absent
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let url = url.into();
        Self {
            title: title.into(),
            url: if url.is_empty() { None } else { Some(url) },
            description: description.into(),
        }
    }
}

/// How the search engine is driven
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeMethod {
    /// Plain HTTP requests
    #[default]
    Http,
    /// Full browser automation
    Browser,
}

impl ScrapeMethod {
    /// Result pages requested per keyword
    pub fn num_pages(&self) -> u32 {
        match self {
            Self::Http => 2,
            Self::Browser => 30,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Browser => "browser",
        }
    }
}

impl fmt::Display for ScrapeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labelled search queries with the domain restriction applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQueries {
    queries: BTreeMap<String, String>,
    domain: Option<String>,
}

impl SearchQueries {
    /// Builds the query set, appending ` site:<domain>` to every query when
    /// a non-empty domain is given
    pub fn new(queries: BTreeMap<String, String>, domain: Option<&str>) -> Self {
        let domain = domain.filter(|d| !d.is_empty()).map(str::to_string);
        let queries = queries
            .into_iter()
            .map(|(label, query)| match &domain {
                Some(domain) => (label, format!("{} site:{}", query, domain)),
                None => (label, query),
            })
            .collect();
        Self { queries, domain }
    }

    /// Query strings, in label order
    pub fn keywords(&self) -> Vec<String> {
        self.queries.values().cloned().collect()
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.queries.get(label).map(String::as_str)
    }

    /// Finds the label a keyword was generated from
    pub fn label_for(&self, keyword: &str) -> Option<&str> {
        self.queries
            .iter()
            .find(|(_, query)| query.as_str() == keyword)
            .map(|(label, _)| label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.queries.iter().map(|(l, q)| (l.as_str(), q.as_str()))
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl fmt::Display for SearchQueries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(label, query)| format!("{}: {:?}", label, query))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Configuration handed to a search collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeConfig {
    /// One keyword per query label
    pub keywords: Vec<String>,
    pub num_pages: u32,
    pub scrape_method: ScrapeMethod,
    pub proxy_file: Option<PathBuf>,
    /// Replay keywords already present in the result store
    pub caching: bool,
    /// Where the collaborator persists its results
    pub results_db: PathBuf,
}

/// Receives result batches as the collaborator discovers them
#[async_trait]
pub trait BatchCallback: Send + Sync {
    /// Called once per keyword with that keyword's results
    async fn on_batch(&self, keyword: &str, items: Vec<ResultItem>);
}

/// Access to the complete result set a collaborator persisted
pub trait ResultHandle: Send {
    fn read_all(&self) -> Result<Vec<ResultItem>, SearchError>;
}

impl ResultHandle for Vec<ResultItem> {
    fn read_all(&self) -> Result<Vec<ResultItem>, SearchError> {
        Ok(self.clone())
    }
}

/// A search engine driver
///
/// Implementations stream results through `callback` as they arrive and
/// return a handle to everything they persisted. Errors are fatal to the
/// search stage.
#[async_trait]
pub trait SearchCollaborator: Send + Sync {
    async fn scrape(
        &self,
        config: &ScrapeConfig,
        callback: &dyn BatchCallback,
    ) -> Result<Box<dyn ResultHandle>, SearchError>;
}
