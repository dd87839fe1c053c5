//! Storage traits and error types

use crate::search::ResultItem;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Search not found: {0}")]
    SearchNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence for search results
///
/// The search stage both streams results to the pipeline and records them
/// here, so the complete result set can be read back once searching ends.
pub trait Storage {
    /// Records that `keyword` is being searched and returns the search ID
    fn begin_search(&mut self, keyword: &str) -> StorageResult<i64>;

    /// Appends results to a search started with [`begin_search`](Self::begin_search)
    fn record_results(&mut self, search_id: i64, items: &[ResultItem]) -> StorageResult<()>;

    /// IDs of every earlier search for `keyword`, oldest first
    fn search_ids(&self, keyword: &str) -> StorageResult<Vec<i64>>;

    /// Returns the results recorded under `search_ids`, in insertion order
    fn load_results(&self, search_ids: &[i64]) -> StorageResult<Vec<ResultItem>>;

    /// Number of recorded results
    fn count_results(&self) -> StorageResult<u64>;
}
