use super::outcome::TaskOutcome;
use crate::datamodel::{MetricIdentity, TimeWindow};
use crate::source::MetricsSource;
use crate::storage::JsonFilePersister;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Everything a task needs, shared read-only by all workers of a run.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub source: Arc<dyn MetricsSource>,
    pub persister: JsonFilePersister,
    pub window: TimeWindow,
    pub task_timeout: Option<Duration>,
}

impl TaskContext {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        persister: JsonFilePersister,
        window: TimeWindow,
        task_timeout: Option<Duration>,
    ) -> Self {
        Self {
            source,
            persister,
            window,
            task_timeout,
        }
    }
}

/// Fetches the statistics of `metric` and appends them to its file.
async fn fetch_and_persist(context: &TaskContext, metric: &MetricIdentity) -> TaskOutcome {
    let result = match context.source.get_statistics(metric, &context.window).await {
        Ok(result) => result,
        Err(e) => {
            warn!("Failed to fetch statistics for {}: {}", metric, e);
            return TaskOutcome::FetchFailed(e);
        }
    };

    if result.is_empty() {
        debug!("No data points for {}", metric);
        return TaskOutcome::NoData;
    }

    let datapoints = result.len();
    match context.persister.persist(metric, &result).await {
        Ok(path) => {
            info!("Writing {} data points to {}", datapoints, path.display());
            TaskOutcome::Persisted { path, datapoints }
        }
        Err(e) => {
            error!("Failed to persist {}: {}", metric, e);
            TaskOutcome::PersistFailed(e)
        }
    }
}

/// Runs one metric to a terminal state, honouring the task timeout and
/// the run's cancellation token.
pub async fn execute(
    context: &TaskContext,
    metric: MetricIdentity,
    token: &CancellationToken,
) -> TaskOutcome {
    let work = async {
        match context.task_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, fetch_and_persist(context, &metric)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!("Task for {} timed out after {:?}", metric, limit);
                        TaskOutcome::TimedOut
                    }
                }
            }
            None => fetch_and_persist(context, &metric).await,
        }
    };

    tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!("Task for {} cancelled", metric);
            TaskOutcome::Cancelled
        }
        outcome = work => outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::Dimension;
    use crate::test_utils::{InMemorySource, sample_datapoints, test_window};

    fn metric() -> MetricIdentity {
        MetricIdentity::new(
            "AWS/EC2",
            "CPUUtilization",
            vec![Dimension::new("InstanceId", "i-1")],
        )
    }

    fn context(
        source: InMemorySource,
        base: &std::path::Path,
        timeout: Option<Duration>,
    ) -> TaskContext {
        TaskContext::new(
            Arc::new(source),
            JsonFilePersister::new(base),
            test_window(),
            timeout,
        )
    }

    #[tokio::test]
    async fn test_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let source = InMemorySource::new().with_datapoints(metric(), sample_datapoints(3));
        let context = context(source, dir.path(), None);

        let outcome = execute(&context, metric(), &CancellationToken::new()).await;
        match outcome {
            TaskOutcome::Persisted { path, datapoints } => {
                assert_eq!(datapoints, 3);
                assert_eq!(path, dir.path().join("AWS/EC2/InstanceId/i-1"));
                assert!(path.exists());
            }
            other => panic!("Unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_data_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let context = context(InMemorySource::new(), dir.path(), None);

        let outcome = execute(&context, metric(), &CancellationToken::new()).await;
        assert!(matches!(outcome, TaskOutcome::NoData));
        assert!(!dir.path().join("AWS").exists());
    }

    #[tokio::test]
    async fn test_fetch_failed() {
        let dir = tempfile::tempdir().unwrap();
        let source = InMemorySource::new().with_failing_statistics(metric());
        let context = context(source, dir.path(), None);

        let outcome = execute(&context, metric(), &CancellationToken::new()).await;
        assert!(matches!(outcome, TaskOutcome::FetchFailed(_)));
        assert!(!dir.path().join("AWS").exists());
    }

    #[tokio::test]
    async fn test_persist_failed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, b"file").await.unwrap();
        let source = InMemorySource::new().with_datapoints(metric(), sample_datapoints(1));
        let context = context(source, &blocker, None);

        let outcome = execute(&context, metric(), &CancellationToken::new()).await;
        assert!(matches!(outcome, TaskOutcome::PersistFailed(_)));
    }

    #[tokio::test]
    async fn test_timed_out() {
        let dir = tempfile::tempdir().unwrap();
        let source = InMemorySource::new().with_hanging_statistics();
        let context = context(source, dir.path(), Some(Duration::from_millis(20)));

        let outcome = execute(&context, metric(), &CancellationToken::new()).await;
        assert!(matches!(outcome, TaskOutcome::TimedOut));
    }

    #[tokio::test]
    async fn test_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let source = InMemorySource::new().with_hanging_statistics();
        let context = context(source, dir.path(), None);
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let outcome = execute(&context, metric(), &token).await;
        assert!(matches!(outcome, TaskOutcome::Cancelled));
    }
}
