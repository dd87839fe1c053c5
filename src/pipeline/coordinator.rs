//! Harvest coordinator - main collection loop and shutdown
//!
//! This module wires the three stages together:
//! - Spawning the search driver, which feeds the fetch queue
//! - Spawning the fetch dispatcher, which feeds the results channel
//! - Deduplicating matches and writing new ones as they arrive
//! - Stopping once the objective is met or every producer has finished

use crate::config::{validate, Config};
use crate::output::{HarvestReport, MatchWriter};
use crate::parsers::ParserRegistry;
use crate::pipeline::dispatcher::FetchDispatcher;
use crate::pipeline::fetcher::{Fetcher, HttpFetcher};
use crate::pipeline::matches::{MatchIndex, Recorded};
use crate::pipeline::worker::{FetchWorker, MatchSink};
use crate::search::{DuckDuckGoSearch, SearchCollaborator, SearchRunner};
use crate::state::{RunState, StopReason};
use crate::GsdlError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Called once for every new distinct match
pub type Observer = Box<dyn FnMut(&str, &str) + Send>;

/// Runs one search -> fetch -> collect pipeline
pub struct Harvester {
    config: Config,
    registry: Arc<ParserRegistry>,
    collaborator: Arc<dyn SearchCollaborator>,
    fetcher: Arc<dyn Fetcher>,
    observer: Observer,
    state: RunState,
    cancel: CancellationToken,
}

impl Harvester {
    /// Creates a harvester for `config`
    ///
    /// The configuration is validated first. The parser table is built from the `[[parser]]` entries of the
    /// configuration; use [`with_parsers`](Self::with_parsers) to supply one
    /// directly.
    pub fn new(
        config: Config,
        collaborator: Arc<dyn SearchCollaborator>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, GsdlError> {
        validate(&config)?;
        let registry = ParserRegistry::from_entries(&config.parsers)?;
        Ok(Self {
            config,
            registry: Arc::new(registry),
            collaborator,
            fetcher,
            observer: Box::new(|found, url| println!("{}\t{}", found, url)),
            state: RunState::Idle,
            cancel: CancellationToken::new(),
        })
    }

    /// Creates a harvester that searches DuckDuckGo and downloads with
    /// [`HttpFetcher`], both configured from `config.fetch`
    pub fn from_config(config: Config) -> Result<Self, GsdlError> {
        let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
        let search = Arc::new(DuckDuckGoSearch::new(
            config.fetch.user_agent.clone(),
            Duration::from_secs(config.fetch.timeout_secs),
        ));
        Self::new(config, search, fetcher)
    }

    /// Replaces the parser table
    pub fn with_parsers(mut self, registry: ParserRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Replaces the default observer, which prints each new match to stdout
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&str, &str) + Send + 'static,
    {
        self.observer = Box::new(observer);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Token that stops the run when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn transition(&mut self, next: RunState) -> Result<(), GsdlError> {
        if !self.state.can_transition_to(next) {
            return Err(GsdlError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Harvest state: {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Walks a run that failed part way through to `Done`
    fn settle(&mut self) {
        self.cancel.cancel();
        for next in [RunState::Stopping, RunState::Done] {
            if self.state.can_transition_to(next) {
                tracing::debug!("Harvest state: {} -> {}", self.state, next);
                self.state = next;
            }
        }
    }

    /// Runs the pipeline to completion
    ///
    /// Returns once the objective is met, the search results are exhausted,
    /// or the cancel token fires. Both driver tasks, and every fetch worker,
    /// have exited by the time this returns. A failed search is returned as
    /// [`GsdlError::Search`] after the pipeline has drained. Once started,
    /// the run ends in [`RunState::Done`] whether it succeeds or fails.
    pub async fn run(&mut self) -> Result<HarvestReport, GsdlError> {
        self.transition(RunState::Running)?;
        let start_time = Instant::now();
        let objective = self.config.harvest.objective();

        let output = self.config.harvest.output.clone();
        let mut writer = match output.as_deref().map(MatchWriter::create).transpose() {
            Ok(writer) => writer,
            Err(e) => {
                tracing::error!("Cannot open output file: {}", e);
                self.settle();
                return Err(e.into());
            }
        };
        if let Some(writer) = &writer {
            tracing::info!("Writing matches to {}", writer.path().display());
        }

        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let sink = Arc::new(ResultSender {
            tx: results_tx,
            cancel: self.cancel.clone(),
        });

        let worker = FetchWorker::new(
            self.registry.clone(),
            self.fetcher.clone(),
            sink,
            self.cancel.clone(),
        );
        let (queue, dispatcher) = FetchDispatcher::new(
            worker,
            self.config.fetch.queue_capacity,
            self.config.fetch.max_concurrent_fetches,
        );

        let mut runner = SearchRunner::new(&self.config.search, self.collaborator.clone());
        let search_patterns = runner.queries().to_string();

        tracing::info!(
            "Starting harvest: {} queries, objective {}, {} parsers",
            runner.queries().len(),
            objective.map_or_else(|| "unbounded".to_string(), |n| n.to_string()),
            self.registry.len()
        );

        let search_cancel = self.cancel.clone();
        let search_task = tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = search_cancel.cancelled() => None,
                result = runner.run(&queue) => Some(result),
            };
            match outcome {
                None => {
                    tracing::debug!("Search stopped before completion");
                    Ok(runner.results().len())
                }
                Some(Ok(items)) => {
                    for line in runner.to_string().lines() {
                        tracing::info!("{}", line);
                    }
                    Ok(items.len())
                }
                Some(Err(e)) => {
                    tracing::error!("Search failed: {}", e);
                    search_cancel.cancel();
                    Err(e)
                }
            }
        });
        let fetch_task = tokio::spawn(dispatcher.run());

        // Collection loop
        let mut index = MatchIndex::new();
        let mut write_error = None;
        let stop_reason = loop {
            if objective.is_some_and(|n| index.len() >= n) {
                break StopReason::ObjectiveReached;
            }

            let Some((found, url)) = results_rx.recv().await else {
                break if self.cancel.is_cancelled() {
                    StopReason::Interrupted
                } else {
                    StopReason::Exhausted
                };
            };

            match index.record(&found, &url) {
                Recorded::New => {
                    tracing::debug!("New match '{}' at {}", found, url);
                    if let Some(writer) = writer.as_mut() {
                        if let Err(e) = writer.write_match(&found, &url) {
                            write_error = Some(e);
                            break StopReason::Interrupted;
                        }
                    }
                    (self.observer)(&found, &url);
                }
                Recorded::NewUrl => tracing::trace!("'{}' also found at {}", found, url),
                Recorded::Duplicate => {}
            }
        };

        self.transition(RunState::Stopping)?;
        tracing::info!("Stopping harvest: {}", stop_reason);
        self.cancel.cancel();
        drop(results_rx);

        let closed = match writer {
            Some(writer) => {
                tracing::info!(
                    "{} matches written to {}",
                    writer.written(),
                    writer.path().display()
                );
                writer.close()
            }
            None => Ok(()),
        };

        let search_joined = search_task.await;
        let fetch_joined = fetch_task.await;
        self.transition(RunState::Done)?;

        if let Some(e) = write_error {
            return Err(e.into());
        }
        closed?;
        let fetch = fetch_joined?;
        let search_results = search_joined??;

        let report = HarvestReport {
            search_patterns,
            parsers: self.registry.patterns().map(str::to_string).collect(),
            matches: index,
            fetch,
            search_results,
            stop_reason,
            output: self.config.harvest.output.clone(),
            elapsed: start_time.elapsed(),
        };

        tracing::info!(
            "Harvest completed: {} distinct matches in {:?}",
            report.distinct_matches(),
            report.elapsed
        );

        Ok(report)
    }
}

/// Hands worker matches to the collection loop until the run stops
struct ResultSender {
    tx: mpsc::UnboundedSender<(String, String)>,
    cancel: CancellationToken,
}

impl MatchSink for ResultSender {
    fn on_match(&self, found: String, url: &str) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.tx.send((found, url.to_string())).is_ok()
    }
}
