//! Deduplicated match -> URL index
//!
//! Owned by the collection loop and only mutated there, so no locking.

use std::collections::HashMap;

/// Outcome of recording a `(match, url)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// First time this match was seen
    New,
    /// Known match, URL appended to its list
    NewUrl,
    /// Pair already present; nothing changed
    Duplicate,
}

/// Every distinct match with the URLs it was found at
///
/// The index only grows: URL lists keep first-seen order and never lose
/// entries, and the same URL is never listed twice for one match.
#[derive(Debug, Clone, Default)]
pub struct MatchIndex {
    urls: HashMap<String, Vec<String>>,
    order: Vec<String>,
}

impl MatchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, found: &str, url: &str) -> Recorded {
        match self.urls.get_mut(found) {
            Some(urls) => {
                if urls.iter().any(|u| u == url) {
                    Recorded::Duplicate
                } else {
                    urls.push(url.to_string());
                    Recorded::NewUrl
                }
            }
            None => {
                self.urls.insert(found.to_string(), vec![url.to_string()]);
                self.order.push(found.to_string());
                Recorded::New
            }
        }
    }

    /// Number of distinct matches
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, found: &str) -> bool {
        self.urls.contains_key(found)
    }

    /// URLs a match was found at, in first-seen order
    pub fn urls(&self, found: &str) -> Option<&[String]> {
        self.urls.get(found).map(Vec::as_slice)
    }

    /// Matches in the order they were first seen
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.order.iter().filter_map(move |found| {
            self.urls
                .get(found)
                .map(|urls| (found.as_str(), urls.as_slice()))
        })
    }
}
