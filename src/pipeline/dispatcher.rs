//! Fetch queue and worker fan-out
//!
//! Search results enter a bounded queue; the dispatcher pulls them off and
//! runs one [`FetchWorker`] task per item. A semaphore caps how many run at
//! once, so a full pool stops the dispatcher from reading, the queue fills
//! and the search stage waits on [`FetchQueue::submit`].

use crate::pipeline::worker::{FetchStats, FetchWorker};
use crate::search::{BatchCallback, ResultItem};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

/// Producer side of the fetch queue
#[derive(Debug, Clone)]
pub struct FetchQueue {
    tx: mpsc::Sender<ResultItem>,
}

impl FetchQueue {
    /// Enqueues an item, waiting while the queue is full
    ///
    /// Returns false once the dispatcher has stopped accepting work.
    pub async fn submit(&self, item: ResultItem) -> bool {
        self.tx.send(item).await.is_ok()
    }
}

#[async_trait]
impl BatchCallback for FetchQueue {
    async fn on_batch(&self, keyword: &str, items: Vec<ResultItem>) {
        for item in items {
            if !self.submit(item).await {
                tracing::debug!("Fetch queue closed; dropping rest of '{}' batch", keyword);
                return;
            }
        }
    }
}

/// Pulls items off the fetch queue and runs a worker for each
pub struct FetchDispatcher {
    rx: mpsc::Receiver<ResultItem>,
    worker: FetchWorker,
    permits: Arc<Semaphore>,
}

impl FetchDispatcher {
    /// Creates the dispatcher and the queue feeding it
    pub fn new(worker: FetchWorker, capacity: usize, max_concurrent: usize) -> (FetchQueue, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let dispatcher = Self {
            rx,
            worker,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        };
        (FetchQueue { tx }, dispatcher)
    }

    /// Runs until every queue handle is dropped or the stop token fires
    ///
    /// Spawned workers are always joined before returning, so the returned
    /// counters are final.
    pub async fn run(mut self) -> FetchStats {
        let cancel = self.worker.cancel_token().clone();
        let mut tasks = JoinSet::new();

        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => break,
                item = self.rx.recv() => match item {
                    Some(item) => item,
                    None => break,
                },
            };

            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = self.permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let worker = self.worker.clone();
            tasks.spawn(async move {
                let _permit = permit;
                worker.run(item).await;
            });

            while let Some(finished) = tasks.try_join_next() {
                if let Err(e) = finished {
                    tracing::error!("Fetch worker panicked: {}", e);
                }
            }
        }

        self.rx.close();
        let pending = tasks.len();
        if pending > 0 {
            tracing::debug!("Waiting for {} fetch workers to finish", pending);
        }
        while let Some(finished) = tasks.join_next().await {
            if let Err(e) = finished {
                tracing::error!("Fetch worker panicked: {}", e);
            }
        }

        let stats = self.worker.stats();
        tracing::info!(
            "Fetch stage finished: {} items, {} download errors, {} matches",
            stats.items,
            stats.download_errors,
            stats.matches
        );
        stats
    }
}
