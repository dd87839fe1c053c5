//! gsdl main entry point
//!
//! This is the command-line interface for the search-download-parse harvester.

use clap::Parser;
use gsdl_harvest::config::{load_config_with_hash, validate, Config};
use gsdl_harvest::output::print_report;
use gsdl_harvest::pipeline::Harvester;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// gsdl: search, download and parse
///
/// Runs every configured query through a search engine, downloads each
/// result, parses it with the parser matching its URL, and reports every
/// distinct match until the objective is met or the results run out.
#[derive(Parser, Debug)]
#[command(name = "gsdl")]
#[command(version)]
#[command(about = "Search, download and parse results for matches", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be searched without searching
    #[arg(long)]
    dry_run: bool,

    /// Stop after this many distinct matches (-1 = until results run out)
    #[arg(long, allow_hyphen_values = true)]
    objective: Option<i64>,

    /// Write matches to this file as they are found
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Restrict every query to this domain
    #[arg(short, long)]
    domain: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if apply_overrides(&mut config, &cli) {
        validate(&config)?;
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else {
        handle_harvest(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("gsdl_harvest=info,gsdl=info,warn"),
            1 => EnvFilter::new("gsdl_harvest=debug,gsdl=debug,info"),
            2 => EnvFilter::new("gsdl_harvest=trace,gsdl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Matches go to stdout; keep diagnostics on stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides; returns true if anything changed
fn apply_overrides(config: &mut Config, cli: &Cli) -> bool {
    let mut changed = false;
    if let Some(objective) = cli.objective {
        config.harvest.count_objective = objective;
        changed = true;
    }
    if let Some(output) = &cli.output {
        config.harvest.output = Some(output.clone());
        changed = true;
    }
    if let Some(domain) = &cli.domain {
        config.search.domain = Some(domain.clone());
        changed = true;
    }
    changed
}

/// Handles the --dry-run mode: shows what would be searched
fn handle_dry_run(config: &Config) {
    println!("=== gsdl Dry Run ===\n");

    println!("Search Configuration:");
    println!("  Scrape method: {}", config.search.scrape_method);
    println!(
        "  Pages per query: {}",
        config.search.scrape_method.num_pages()
    );
    if let Some(domain) = &config.search.domain {
        println!("  Restrict to domain: {}", domain);
    }
    if let Some(proxy_file) = &config.search.proxy_file {
        println!("  Proxy file: {}", proxy_file.display());
    }
    println!("  Result store: {}", config.search.results_db);
    println!("  Caching: {}", config.search.caching);

    println!("\nQueries ({}):", config.search.queries.len());
    for (label, query) in &config.search.queries {
        println!("  - {}: {}", label, query);
    }

    println!("\nHarvest:");
    match config.harvest.objective() {
        Some(n) => println!("  Objective: {} distinct matches", n),
        None => println!("  Objective: until results run out"),
    }
    match &config.harvest.output {
        Some(path) => println!("  Output file: {}", path.display()),
        None => println!("  Output file: none (stdout only)"),
    }

    println!("\nFetch:");
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  Max concurrent fetches: {}", config.fetch.max_concurrent_fetches);
    println!("  Queue capacity: {}", config.fetch.queue_capacity);
    println!("  User agent: {}", config.fetch.user_agent);

    println!("\nParsers ({}):", config.parsers.len());
    for entry in &config.parsers {
        match &entry.regex {
            Some(regex) => println!("  - {} -> {:?} /{}/", entry.pattern, entry.kind, regex),
            None => println!("  - {} -> {:?}", entry.pattern, entry.kind),
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    if config.parsers.is_empty() {
        tracing::warn!("No [[parser]] entries configured; every result will yield nothing");
    }

    let mut harvester = Harvester::from_config(config)?;

    let token = harvester.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping harvest");
            token.cancel();
        }
    });

    match harvester.run().await {
        Ok(report) => {
            tracing::info!("Harvest completed successfully");
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
