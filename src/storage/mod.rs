//! Storage module for persisting search results
//!
//! The search stage records every result it streams so that the complete
//! result set of a run can be read back after searching finishes, and so that
//! keywords already searched can be replayed when caching is enabled.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{SqliteStorage, StoredResults};
pub use traits::{Storage, StorageError, StorageResult};

use chrono::{DateTime, TimeZone};
use std::path::PathBuf;

/// Placeholder in the configured store path replaced by the run start time
pub const TIMESTAMP_PLACEHOLDER: &str = "{timestamp}";

/// Expands `{timestamp}` in a result store path
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use gsdl_harvest::storage::expand_store_path;
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
/// let path = expand_store_path("results_{timestamp}.db", &at);
/// assert_eq!(path.to_str(), Some("results_20240309_140500.db"));
/// ```
pub fn expand_store_path<Tz>(template: &str, at: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let stamp = at.format("%Y%m%d_%H%M%S").to_string();
    PathBuf::from(template.replace(TIMESTAMP_PLACEHOLDER, &stamp))
}
