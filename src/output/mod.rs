//! Output module for match files and run summaries
//!
//! This module handles:
//! - Writing each new match to a tab-separated file as it is found
//! - Reading that file back
//! - Summarizing a finished harvest

mod report;
mod writer;

pub use report::{print_report, HarvestReport};
pub use writer::{format_line, read_matches, MatchWriter};
