use serde::{Deserialize, Serialize};
use std::fmt;

/// A name/value tag attached to a metric, such as `InstanceId=i-1234`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Identifies one time series within the account/region scope.
///
/// The dimensions keep the order in which the listing returned them,
/// since only the first one takes part in the output path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricIdentity {
    /// The metric namespace (e.g., "AWS/EC2")
    pub namespace: String,

    /// The metric name (e.g., "CPUUtilization")
    pub name: String,

    /// Dimensions, possibly empty
    pub dimensions: Vec<Dimension>,
}

impl MetricIdentity {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        dimensions: Vec<Dimension>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            dimensions,
        }
    }

    pub fn first_dimension(&self) -> Option<&Dimension> {
        self.dimensions.first()
    }
}

impl fmt::Display for MetricIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)?;
        if !self.dimensions.is_empty() {
            let dimensions: Vec<String> = self.dimensions.iter().map(|d| d.to_string()).collect();
            write!(f, "[{}]", dimensions.join(","))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_dimension() {
        let metric = MetricIdentity::new(
            "AWS/EC2",
            "CPUUtilization",
            vec![
                Dimension::new("InstanceId", "i-1"),
                Dimension::new("AutoScalingGroupName", "web"),
            ],
        );
        assert_eq!(
            metric.first_dimension(),
            Some(&Dimension::new("InstanceId", "i-1"))
        );

        let bare = MetricIdentity::new("AWS/S3", "BucketSizeBytes", vec![]);
        assert_eq!(bare.first_dimension(), None);
    }

    #[test]
    fn test_display() {
        let metric = MetricIdentity::new(
            "AWS/EC2",
            "CPUUtilization",
            vec![
                Dimension::new("InstanceId", "i-1"),
                Dimension::new("ImageId", "ami-2"),
            ],
        );
        assert_eq!(
            metric.to_string(),
            "AWS/EC2:CPUUtilization[InstanceId=i-1,ImageId=ami-2]"
        );

        let bare = MetricIdentity::new("AWS/S3", "BucketSizeBytes", vec![]);
        assert_eq!(bare.to_string(), "AWS/S3:BucketSizeBytes");
    }

    #[test]
    fn test_dimension_serialization() {
        let dimension = Dimension::new("InstanceId", "i-1");
        let json = serde_json::to_string(&dimension).unwrap();
        assert_eq!(json, r#"{"Name":"InstanceId","Value":"i-1"}"#);
    }
}
