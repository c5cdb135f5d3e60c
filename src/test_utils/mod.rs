//! Test utilities for cwsiphon tests
//!
//! Provides an in-memory [`MetricsSource`] so the pipeline can be exercised
//! without talking to CloudWatch, plus a few builders for metrics and
//! datapoints.

use crate::datamodel::{
    Datapoint, Dimension, MetricIdentity, StatisticResult, TimeWindow,
};
use crate::source::{MetricsPage, MetricsSource, SourceError};
use async_trait::async_trait;
use hifitime::{Epoch, Unit};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Builds a metric from string pairs
pub fn metric(namespace: &str, name: &str, dimensions: &[(&str, &str)]) -> MetricIdentity {
    MetricIdentity::new(
        namespace,
        name,
        dimensions
            .iter()
            .map(|(name, value)| Dimension::new(*name, *value))
            .collect(),
    )
}

/// `count` datapoints, five minutes apart, starting at 2016-01-18
pub fn sample_datapoints(count: usize) -> Vec<Datapoint> {
    let start = Epoch::from_gregorian_utc_at_midnight(2016, 1, 18);
    (0..count)
        .map(|i| {
            let value = i as f64;
            Datapoint {
                timestamp: start + Unit::Minute * (5 * i as i64),
                sample_count: Some(1.0),
                average: Some(value),
                sum: Some(value),
                minimum: Some(value),
                maximum: Some(value),
                unit: Some("Seconds".to_string()),
            }
        })
        .collect()
}

/// 2016-01-18 to 2016-01-20, five minute period
pub fn test_window() -> TimeWindow {
    TimeWindow::new(
        Epoch::from_gregorian_utc_at_midnight(2016, 1, 18),
        Epoch::from_gregorian_utc_at_midnight(2016, 1, 20),
        300,
    )
}

/// Scripted metrics source.
///
/// Pages are served in order, the continuation token being the index of
/// the next page. Metrics without registered datapoints return an empty
/// result.
#[derive(Debug, Default)]
pub struct InMemorySource {
    pages: Vec<Vec<MetricIdentity>>,
    listing_failure_at: Option<usize>,
    malformed: HashMap<usize, usize>,
    datapoints: HashMap<MetricIdentity, Vec<Datapoint>>,
    failing: HashSet<MetricIdentity>,
    fail_all_statistics: bool,
    hang_statistics: bool,
    statistics_calls: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, metrics: Vec<MetricIdentity>) -> Self {
        self.pages.push(metrics);
        self
    }

    /// The last added page also reports `count` malformed entries
    pub fn with_malformed_entries(mut self, count: usize) -> Self {
        let index = self.pages.len().saturating_sub(1);
        self.malformed.insert(index, count);
        self
    }

    /// Listing the page at `index` (0 based) fails
    pub fn with_listing_failure_at(mut self, index: usize) -> Self {
        self.listing_failure_at = Some(index);
        self
    }

    pub fn with_datapoints(mut self, metric: MetricIdentity, datapoints: Vec<Datapoint>) -> Self {
        self.datapoints.insert(metric, datapoints);
        self
    }

    pub fn with_failing_statistics(mut self, metric: MetricIdentity) -> Self {
        self.failing.insert(metric);
        self
    }

    pub fn with_all_statistics_failing(mut self) -> Self {
        self.fail_all_statistics = true;
        self
    }

    /// Statistics queries never answer
    pub fn with_hanging_statistics(mut self) -> Self {
        self.hang_statistics = true;
        self
    }

    pub fn statistics_calls(&self) -> usize {
        self.statistics_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsSource for InMemorySource {
    async fn list_metrics(&self, next_token: Option<String>) -> Result<MetricsPage, SourceError> {
        let index = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| SourceError::remote(format!("invalid token {}", token)))?,
            None => 0,
        };

        if self.listing_failure_at == Some(index) {
            return Err(SourceError::remote(format!("listing page {} failed", index)));
        }

        let metrics = self.pages.get(index).cloned().unwrap_or_default();
        let next_token = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
        Ok(MetricsPage {
            metrics,
            next_token,
            skipped: self.malformed.get(&index).copied().unwrap_or(0),
        })
    }

    async fn get_statistics(
        &self,
        metric: &MetricIdentity,
        _window: &TimeWindow,
    ) -> Result<StatisticResult, SourceError> {
        self.statistics_calls.fetch_add(1, Ordering::SeqCst);

        if self.hang_statistics {
            futures::future::pending::<()>().await;
        }
        if self.fail_all_statistics || self.failing.contains(metric) {
            return Err(SourceError::remote(format!("statistics for {} failed", metric)));
        }

        Ok(StatisticResult {
            namespace: metric.namespace.clone(),
            metric_name: metric.name.clone(),
            dimensions: metric.dimensions.clone(),
            label: Some(metric.name.clone()),
            datapoints: self.datapoints.get(metric).cloned().unwrap_or_default(),
        })
    }
}
