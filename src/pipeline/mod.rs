//! Fetch and collection stages
//!
//! This module contains the concurrent part of a harvest:
//! - Downloading result pages, retrying once past caches
//! - Fanning out one worker per search result, bounded by a semaphore
//! - Deduplicating the matches workers report
//! - Coordinating startup, the stop condition and shutdown

mod coordinator;
mod dispatcher;
mod fetcher;
mod matches;
mod worker;

pub use coordinator::{Harvester, Observer};
pub use dispatcher::{FetchDispatcher, FetchQueue};
pub use fetcher::{build_http_client, CachePolicy, FetchError, FetchResponse, Fetcher, HttpFetcher};
pub use matches::{MatchIndex, Recorded};
pub use worker::{FetchCounters, FetchStats, FetchWorker, MatchSink};
