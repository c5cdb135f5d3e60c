use crate::datamodel::TimeWindow;
use crate::source::SourceError;
use crate::storage::PersistError;
use std::fmt;
use std::path::PathBuf;

/// Terminal state of one fetch+persist task.
#[derive(Debug)]
pub enum TaskOutcome {
    Persisted { path: PathBuf, datapoints: usize },
    NoData,
    FetchFailed(SourceError),
    PersistFailed(PersistError),
    TimedOut,
    Cancelled,
}

/// Counts of task outcomes per terminal state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeTally {
    pub persisted: usize,
    pub no_data: usize,
    pub fetch_failed: usize,
    pub persist_failed: usize,
    pub timed_out: usize,
    pub cancelled: usize,
    pub datapoints_written: usize,
}

impl OutcomeTally {
    pub fn record(&mut self, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Persisted { datapoints, .. } => {
                self.persisted += 1;
                self.datapoints_written += datapoints;
            }
            TaskOutcome::NoData => self.no_data += 1,
            TaskOutcome::FetchFailed(_) => self.fetch_failed += 1,
            TaskOutcome::PersistFailed(_) => self.persist_failed += 1,
            TaskOutcome::TimedOut => self.timed_out += 1,
            TaskOutcome::Cancelled => self.cancelled += 1,
        }
    }

    pub fn merge(&mut self, other: &OutcomeTally) {
        self.persisted += other.persisted;
        self.no_data += other.no_data;
        self.fetch_failed += other.fetch_failed;
        self.persist_failed += other.persist_failed;
        self.timed_out += other.timed_out;
        self.cancelled += other.cancelled;
        self.datapoints_written += other.datapoints_written;
    }

    /// Number of tasks that reached a terminal state
    pub fn completed(&self) -> usize {
        self.persisted
            + self.no_data
            + self.fetch_failed
            + self.persist_failed
            + self.timed_out
            + self.cancelled
    }

    pub fn failed(&self) -> usize {
        self.fetch_failed + self.persist_failed + self.timed_out
    }
}

/// What a run did, reported once every task is done.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Metrics seen across all listing pages, whatever happened to them
    pub total_metrics: usize,
    /// Listed entries dropped as malformed, never queued
    pub skipped: usize,
    pub pages: usize,
    pub window: TimeWindow,
    pub outcomes: OutcomeTally,
    /// Set when the listing stopped on an error
    pub listing_error: Option<String>,
    pub cancelled: bool,
}

impl RunSummary {
    /// Metrics listed but never started, because the run was cancelled
    pub fn not_started(&self) -> usize {
        self.total_metrics
            .saturating_sub(self.skipped)
            .saturating_sub(self.outcomes.completed())
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Got {} metrics from {}: {} persisted ({} data points), {} without data, \
             {} fetch failures, {} persist failures, {} timed out, {} cancelled",
            self.total_metrics,
            self.window,
            self.outcomes.persisted,
            self.outcomes.datapoints_written,
            self.outcomes.no_data,
            self.outcomes.fetch_failed,
            self.outcomes.persist_failed,
            self.outcomes.timed_out,
            self.outcomes.cancelled,
        )?;
        if self.skipped > 0 {
            write!(f, ", {} malformed", self.skipped)?;
        }
        if self.not_started() > 0 {
            write!(f, ", {} not started", self.not_started())?;
        }
        if let Some(error) = &self.listing_error {
            write!(f, " (listing stopped early: {})", error)?;
        }
        write!(f, ".")
    }
}
