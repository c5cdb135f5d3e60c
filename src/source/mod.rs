use crate::datamodel::{MetricIdentity, StatisticResult, TimeWindow};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod cloudwatch;
pub mod error;

pub use cloudwatch::CloudWatchSource;
pub use error::SourceError;

/// One page of the metric listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsPage {
    pub metrics: Vec<MetricIdentity>,
    /// Token to request the following page, `None` on the last page
    pub next_token: Option<String>,
    /// Listed entries that could not be turned into a metric
    pub skipped: usize,
}

/// The remote monitoring API, as seen by the pipeline.
#[async_trait]
pub trait MetricsSource: Send + Sync + Debug {
    /// Lists one page of metrics. `next_token` is `None` for the first page.
    async fn list_metrics(&self, next_token: Option<String>) -> Result<MetricsPage, SourceError>;

    /// Fetches the statistics of one metric over the window.
    ///
    /// An empty result is not an error.
    async fn get_statistics(
        &self,
        metric: &MetricIdentity,
        window: &TimeWindow,
    ) -> Result<StatisticResult, SourceError>;
}
