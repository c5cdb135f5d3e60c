use super::lister::{ListingReport, list_into_queue};
use super::outcome::{OutcomeTally, RunSummary};
use super::task::{TaskContext, execute};
use crate::config::SiphonConfig;
use crate::datamodel::{MetricIdentity, TimeWindow};
use crate::source::MetricsSource;
use crate::storage::JsonFilePersister;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

type SharedQueue = Arc<Mutex<mpsc::Receiver<MetricIdentity>>>;

/// Sizing of the worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    pub concurrency: usize,
    pub queue_capacity: usize,
    pub task_timeout: Option<Duration>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            concurrency: 32,
            queue_capacity: 1024,
            task_timeout: None,
        }
    }
}

impl From<&SiphonConfig> for PoolOptions {
    fn from(config: &SiphonConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            queue_capacity: config.queue_capacity,
            task_timeout: config.task_timeout(),
        }
    }
}

/// Runs the listing and a fixed pool of workers, and waits for all of them.
///
/// Completion means every queued metric reached a terminal state, whether
/// it was written, had no data, or failed.
#[derive(Debug)]
pub struct Coordinator {
    context: Arc<TaskContext>,
    options: PoolOptions,
    token: CancellationToken,
}

impl Coordinator {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        persister: JsonFilePersister,
        window: TimeWindow,
        options: PoolOptions,
    ) -> Self {
        let context = TaskContext::new(source, persister, window, options.task_timeout);
        Self {
            context: Arc::new(context),
            options,
            token: CancellationToken::new(),
        }
    }

    pub fn from_config(
        config: &SiphonConfig,
        source: Arc<dyn MetricsSource>,
        window: TimeWindow,
    ) -> Self {
        Self::new(
            source,
            JsonFilePersister::new(&config.base_dir),
            window,
            PoolOptions::from(config),
        )
    }

    /// Token that aborts the run when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub async fn run(self) -> RunSummary {
        let concurrency = self.options.concurrency.max(1);
        let (sender, receiver) = mpsc::channel(self.options.queue_capacity.max(1));
        let queue: SharedQueue = Arc::new(Mutex::new(receiver));

        info!(
            "Fetching {} with {} workers",
            self.context.window, concurrency
        );

        let mut workers = JoinSet::new();
        for worker_id in 0..concurrency {
            workers.spawn(worker_loop(
                worker_id,
                self.context.clone(),
                queue.clone(),
                self.token.clone(),
            ));
        }

        // The sender moves into the lister and is dropped when it returns,
        // which lets the workers drain the queue and stop.
        let lister = {
            let source = self.context.source.clone();
            let token = self.token.clone();
            tokio::spawn(async move { list_into_queue(source.as_ref(), sender, &token).await })
        };

        let listing = match lister.await {
            Ok(report) => report,
            Err(e) => {
                error!("Listing task failed: {}", e);
                ListingReport {
                    cancelled: self.token.is_cancelled(),
                    ..Default::default()
                }
            }
        };

        let mut outcomes = OutcomeTally::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(tally) => outcomes.merge(&tally),
                Err(e) => error!("Worker failed: {}", e),
            }
        }

        RunSummary {
            total_metrics: listing.total_metrics,
            skipped: listing.skipped,
            pages: listing.pages,
            window: self.context.window,
            outcomes,
            listing_error: listing.error.map(|e| e.to_string()),
            cancelled: listing.cancelled || self.token.is_cancelled(),
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    context: Arc<TaskContext>,
    queue: SharedQueue,
    token: CancellationToken,
) -> OutcomeTally {
    let mut tally = OutcomeTally::default();
    loop {
        let next = {
            let mut receiver = queue.lock().await;
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                metric = receiver.recv() => metric,
            }
        };

        let Some(metric) = next else {
            break;
        };

        let outcome = execute(&context, metric, &token).await;
        tally.record(&outcome);
    }

    debug!(
        "Worker {} done after {} tasks",
        worker_id,
        tally.completed()
    );
    tally
}
