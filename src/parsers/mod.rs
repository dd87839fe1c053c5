//! Content parsers and the URL-pattern registry that selects them
//!
//! A parser is a total function from text to a list of matches. Malformed
//! input simply yields no matches; parsers never fail.

mod builtin;
mod html;
mod registry;

pub use builtin::{email_parser, regex_parser, words_parser};
pub use html::extract_links;
pub use registry::{ParserRegistry, WILDCARD};

use crate::config::ParserEntry;
use crate::ConfigError;
use serde::Deserialize;
use std::sync::Arc;

/// A parser shared by every fetch worker
pub type ParserFn = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Built-in parser selectable from the configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    /// Every alphanumeric word
    Words,
    /// Matches of a user-supplied regular expression
    Regex,
    /// E-mail addresses
    Emails,
    /// Absolute http(s) links from `<a href>` elements
    Links,
    /// Yields nothing
    #[serde(rename = "none")]
    Noop,
}

/// Builds the parser described by one configuration entry
pub fn build_parser(entry: &ParserEntry) -> Result<ParserFn, ConfigError> {
    let parser: ParserFn = match entry.kind {
        ParserKind::Words => Arc::new(words_parser),
        ParserKind::Emails => Arc::new(email_parser()),
        ParserKind::Links => Arc::new(extract_links),
        ParserKind::Noop => noop_parser(),
        ParserKind::Regex => {
            let expr = entry
                .regex
                .as_deref()
                .ok_or_else(|| ConfigError::InvalidParser {
                    pattern: entry.pattern.clone(),
                    message: "regex parser requires a `regex` expression".to_string(),
                })?;
            let parser = regex_parser(expr).map_err(|e| ConfigError::InvalidParser {
                pattern: entry.pattern.clone(),
                message: e.to_string(),
            })?;
            Arc::new(parser)
        }
    };
    Ok(parser)
}

/// Parser used when nothing in the table applies to a URL
pub fn noop_parser() -> ParserFn {
    Arc::new(|_: &str| Vec::new())
}
