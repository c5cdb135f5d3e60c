use super::metric::Dimension;
use hifitime::Epoch;
use serde::{Serialize, Serializer};

/// Aggregates requested for every metric, whatever the metric is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    SampleCount,
    Average,
    Sum,
    Minimum,
    Maximum,
}

impl Statistic {
    pub const ALL: [Statistic; 5] = [
        Statistic::SampleCount,
        Statistic::Average,
        Statistic::Sum,
        Statistic::Minimum,
        Statistic::Maximum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::SampleCount => "SampleCount",
            Statistic::Average => "Average",
            Statistic::Sum => "Sum",
            Statistic::Minimum => "Minimum",
            Statistic::Maximum => "Maximum",
        }
    }
}

fn serialize_epoch<S>(epoch: &Epoch, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&epoch.to_rfc3339())
}

/// One aggregated sample over one period bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Datapoint {
    #[serde(serialize_with = "serialize_epoch")]
    pub timestamp: Epoch,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Datapoint {
    pub fn new(timestamp: Epoch) -> Self {
        Self {
            timestamp,
            sample_count: None,
            average: None,
            sum: None,
            minimum: None,
            maximum: None,
            unit: None,
        }
    }
}

/// The statistics of one metric over the run's time window.
///
/// This is what gets appended to the output file, one JSON document per
/// result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatisticResult {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub datapoints: Vec<Datapoint>,
}

impl StatisticResult {
    pub fn is_empty(&self) -> bool {
        self.datapoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.datapoints.len()
    }

    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
