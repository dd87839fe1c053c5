//! gsdl-harvest: search, download and parse results
//!
//! This crate runs a three-stage pipeline: a search stage discovers candidate
//! URLs for a set of queries, a fetch stage downloads and parses each result
//! for content matches, and a collection stage deduplicates the matches and
//! stops once enough distinct ones have been found.

pub mod config;
pub mod output;
pub mod parsers;
pub mod pipeline;
pub mod search;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum GsdlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Search failed: {0}")]
    Search(#[from] search::SearchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid run state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunState,
        to: state::RunState,
    },

    #[error("Pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("Invalid parser '{pattern}': {message}")]
    InvalidParser { pattern: String, message: String },
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, GsdlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use parsers::{ParserFn, ParserRegistry};
pub use output::HarvestReport;
pub use pipeline::{FetchStats, Harvester};
pub use search::{ResultItem, SearchCollaborator};
pub use state::RunState;
