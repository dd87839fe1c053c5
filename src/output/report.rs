//! End-of-run summary

use crate::pipeline::{FetchStats, MatchIndex};
use crate::state::StopReason;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Everything a finished harvest produced
#[derive(Debug, Clone)]
pub struct HarvestReport {
    /// Display form of the labelled queries, domain restriction applied
    pub search_patterns: String,

    /// Registered parser patterns, in priority order
    pub parsers: Vec<String>,

    /// Distinct matches and where they were found
    pub matches: MatchIndex,

    /// Counters from the fetch stage
    pub fetch: FetchStats,

    /// Results the search collaborator persisted
    pub search_results: usize,

    pub stop_reason: StopReason,

    pub output: Option<PathBuf>,

    pub elapsed: Duration,
}

impl HarvestReport {
    /// Number of distinct matches collected
    pub fn distinct_matches(&self) -> usize {
        self.matches.len()
    }
}

impl fmt::Display for HarvestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Search patterns        : {}", self.search_patterns)?;
        writeln!(f, "Parsers                : [{}]", self.parsers.join(", "))?;
        writeln!(f, "Distinct matches found : {}", self.matches.len())?;
        if let Some(output) = &self.output {
            writeln!(f, "Output file            : {}", output.display())?;
        }
        writeln!(f, "Download errors        : {}", self.fetch.download_errors)?;
        writeln!(f, "Matches count          : {}", self.fetch.matches)
    }
}

/// Prints the report to stdout
pub fn print_report(report: &HarvestReport) {
    println!("=== Harvest Summary ===\n");
    print!("{}", report);
    println!("Search results         : {}", report.search_results);
    println!("Items fetched          : {}", report.fetch.items);
    println!("Stopped                : {}", report.stop_reason);
    println!("Elapsed                : {:.1}s", report.elapsed.as_secs_f64());

    if !report.matches.is_empty() {
        println!("\nTop matches by URL count:");
        let mut ranked: Vec<_> = report.matches.iter().collect();
        ranked.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
        for (found, urls) in ranked.into_iter().take(10) {
            println!("  {}: {}", found, urls.len());
        }
    }
}
