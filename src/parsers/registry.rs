//! URL suffix -> parser resolution

use crate::config::ParserEntry;
use crate::parsers::{build_parser, noop_parser, ParserFn};
use crate::ConfigError;
use std::fmt;
use std::sync::Arc;

/// Pattern registering the default parser
pub const WILDCARD: &str = "*";

/// Ordered table of URL suffix patterns and their parsers
///
/// Specific patterns are tried in registration order and the first suffix
/// that matches wins, so register the most specific patterns first.
#[derive(Clone)]
pub struct ParserRegistry {
    entries: Vec<(String, ParserFn)>,
    fallback: ParserFn,
}

impl ParserRegistry {
    /// Creates an empty registry; every URL resolves to the no-op parser
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            fallback: noop_parser(),
        }
    }

    /// Builds the registry from the configured parser table
    pub fn from_entries(entries: &[ParserEntry]) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for entry in entries {
            registry.register(entry.pattern.clone(), build_parser(entry)?);
        }
        Ok(registry)
    }

    /// Appends a parser for URLs ending with `pattern` (or `*` for the default)
    pub fn register(&mut self, pattern: impl Into<String>, parser: ParserFn) -> &mut Self {
        self.entries.push((pattern.into(), parser));
        self
    }

    /// Builder-style variant of [`register`](Self::register) taking a plain closure
    pub fn with<F>(mut self, pattern: impl Into<String>, parser: F) -> Self
    where
        F: Fn(&str) -> Vec<String> + Send + Sync + 'static,
    {
        self.register(pattern, Arc::new(parser));
        self
    }

    /// Returns the parser that applies to `url`
    ///
    /// The first non-wildcard pattern that `url` ends with wins. Without one,
    /// the wildcard parser is used if registered, and the no-op parser
    /// otherwise. Unmatched URLs are never an error.
    pub fn resolve(&self, url: &str) -> ParserFn {
        let mut wildcard = None;

        for (pattern, parser) in &self.entries {
            if pattern == WILDCARD {
                if wildcard.is_none() {
                    wildcard = Some(parser);
                }
                continue;
            }
            if url.ends_with(pattern.as_str()) {
                return Arc::clone(parser);
            }
        }

        Arc::clone(wildcard.unwrap_or(&self.fallback))
    }

    /// Registered patterns, in priority order
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(pattern, _)| pattern.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.patterns()).finish()
    }
}
