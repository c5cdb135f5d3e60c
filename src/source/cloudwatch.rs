use super::{MetricsPage, MetricsSource, SourceError};
use crate::datamodel::{
    Datapoint, Dimension, MetricIdentity, Statistic, StatisticResult, TimeWindow,
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudwatch::Client;
use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::primitives::DateTime;
use aws_sdk_cloudwatch::types::{
    Datapoint as SdkDatapoint, Dimension as SdkDimension, Metric as SdkMetric,
    StandardUnit, Statistic as SdkStatistic,
};
use hifitime::Epoch;
use tracing::{debug, warn};

/// Unit requested for every statistics query.
pub const QUERY_UNIT: StandardUnit = StandardUnit::Seconds;

/// [`MetricsSource`] backed by Amazon CloudWatch.
#[derive(Debug, Clone)]
pub struct CloudWatchSource {
    client: Client,
}

impl CloudWatchSource {
    /// Builds a client for `region` from the default credential chain.
    pub async fn connect(region: &str) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::from_client(Client::new(&sdk_config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn to_sdk_statistic(statistic: Statistic) -> SdkStatistic {
    match statistic {
        Statistic::SampleCount => SdkStatistic::SampleCount,
        Statistic::Average => SdkStatistic::Average,
        Statistic::Sum => SdkStatistic::Sum,
        Statistic::Minimum => SdkStatistic::Minimum,
        Statistic::Maximum => SdkStatistic::Maximum,
    }
}

fn to_sdk_datetime(epoch: Epoch) -> DateTime {
    DateTime::from_secs(epoch.to_unix_seconds().floor() as i64)
}

fn to_sdk_dimension(dimension: &Dimension) -> SdkDimension {
    SdkDimension::builder()
        .name(&dimension.name)
        .value(&dimension.value)
        .build()
}

pub(crate) fn metric_from_sdk(metric: &SdkMetric) -> Result<MetricIdentity, SourceError> {
    let namespace = metric
        .namespace()
        .ok_or_else(|| SourceError::malformed("metric without namespace"))?;
    let name = metric
        .metric_name()
        .ok_or_else(|| SourceError::malformed(format!("metric without name in {}", namespace)))?;

    let dimensions = metric
        .dimensions()
        .iter()
        .map(|dimension| match (dimension.name(), dimension.value()) {
            (Some(name), Some(value)) => Ok(Dimension::new(name, value)),
            _ => Err(SourceError::malformed(format!(
                "incomplete dimension on {}:{}",
                namespace, name
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MetricIdentity::new(namespace, name, dimensions))
}

pub(crate) fn datapoint_from_sdk(datapoint: &SdkDatapoint) -> Result<Datapoint, SourceError> {
    let timestamp = datapoint
        .timestamp()
        .ok_or_else(|| SourceError::malformed("datapoint without timestamp"))?;

    Ok(Datapoint {
        timestamp: Epoch::from_unix_seconds(timestamp.as_secs_f64()),
        sample_count: datapoint.sample_count(),
        average: datapoint.average(),
        sum: datapoint.sum(),
        minimum: datapoint.minimum(),
        maximum: datapoint.maximum(),
        unit: datapoint.unit().map(|unit| unit.as_str().to_string()),
    })
}

#[async_trait]
impl MetricsSource for CloudWatchSource {
    async fn list_metrics(&self, next_token: Option<String>) -> Result<MetricsPage, SourceError> {
        let output = self
            .client
            .list_metrics()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| SourceError::remote(DisplayErrorContext(&e).to_string()))?;

        let mut metrics = Vec::with_capacity(output.metrics().len());
        let mut skipped = 0;
        for metric in output.metrics() {
            match metric_from_sdk(metric) {
                Ok(identity) => metrics.push(identity),
                Err(e) => {
                    warn!("CloudWatch: skipping listed metric: {}", e);
                    skipped += 1;
                }
            }
        }

        debug!(
            "CloudWatch: listed a page of {} metrics (more: {})",
            metrics.len(),
            output.next_token().is_some()
        );

        Ok(MetricsPage {
            metrics,
            next_token: output.next_token().map(str::to_string),
            skipped,
        })
    }

    async fn get_statistics(
        &self,
        metric: &MetricIdentity,
        window: &TimeWindow,
    ) -> Result<StatisticResult, SourceError> {
        let period = i32::try_from(window.period_seconds).map_err(|_| {
            SourceError::InvalidRequest(format!("period {} is too large", window.period_seconds))
        })?;

        let dimensions = if metric.dimensions.is_empty() {
            None
        } else {
            Some(metric.dimensions.iter().map(to_sdk_dimension).collect())
        };

        let output = self
            .client
            .get_metric_statistics()
            .namespace(&metric.namespace)
            .metric_name(&metric.name)
            .set_dimensions(dimensions)
            .start_time(to_sdk_datetime(window.start))
            .end_time(to_sdk_datetime(window.end))
            .period(period)
            .set_statistics(Some(
                Statistic::ALL.iter().copied().map(to_sdk_statistic).collect(),
            ))
            .unit(QUERY_UNIT)
            .send()
            .await
            .map_err(|e| SourceError::remote(DisplayErrorContext(&e).to_string()))?;

        let datapoints = output
            .datapoints()
            .iter()
            .map(datapoint_from_sdk)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StatisticResult {
            namespace: metric.namespace.clone(),
            metric_name: metric.name.clone(),
            dimensions: metric.dimensions.clone(),
            label: output.label().map(str::to_string),
            datapoints,
        })
    }
}
