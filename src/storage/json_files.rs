use super::error::PersistError;
use super::output_path::output_path;
use crate::datamodel::{MetricIdentity, StatisticResult};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Appends statistic results as JSON documents under a base directory.
///
/// Files are opened in append mode for a single write and closed right
/// away. Several tasks may target the same file at once; no locking is
/// done on top of the append flag.
#[derive(Debug, Clone)]
pub struct JsonFilePersister {
    base_dir: PathBuf,
}

impl JsonFilePersister {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn path_for(&self, metric: &MetricIdentity) -> PathBuf {
        output_path(&self.base_dir, metric)
    }

    /// Appends `result` to the file derived from `metric` and returns its path.
    pub async fn persist(
        &self,
        metric: &MetricIdentity,
        result: &StatisticResult,
    ) -> Result<PathBuf, PersistError> {
        let document = result.to_json_bytes()?;
        let path = self.path_for(metric);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| PersistError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| PersistError::Open {
                path: path.clone(),
                source,
            })?;

        // One write call for the whole document, then flush so the
        // background write is done before the file is dropped.
        file.write_all(&document)
            .await
            .map_err(|source| PersistError::Write {
                path: path.clone(),
                source,
            })?;
        file.flush().await.map_err(|source| PersistError::Write {
            path: path.clone(),
            source,
        })?;

        debug!("Appended {} bytes to {}", document.len(), path.display());
        Ok(path)
    }
}

/// Reads back a file written by [`JsonFilePersister`].
///
/// The file is a run of concatenated JSON documents without separators,
/// which is not valid JSON as a whole, so it is read as a stream.
pub async fn read_documents(path: impl AsRef<Path>) -> Result<Vec<Value>, PersistError> {
    let path = path.as_ref();
    let bytes = fs::read(path).await.map_err(|source| PersistError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let documents = serde_json::Deserializer::from_slice(&bytes)
        .into_iter::<Value>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{Datapoint, Dimension};
    use hifitime::{Epoch, Unit};

    fn metric() -> MetricIdentity {
        MetricIdentity::new(
            "AWS/EC2",
            "CPUUtilization",
            vec![Dimension::new("InstanceId", "i-1")],
        )
    }

    fn result_with(count: i64) -> StatisticResult {
        let start = Epoch::from_gregorian_utc_at_midnight(2016, 1, 18);
        let datapoints = (0..count)
            .map(|i| {
                let mut datapoint = Datapoint::new(start + Unit::Minute * (5 * i));
                datapoint.average = Some(i as f64);
                datapoint
            })
            .collect();
        StatisticResult {
            namespace: "AWS/EC2".to_string(),
            metric_name: "CPUUtilization".to_string(),
            dimensions: vec![Dimension::new("InstanceId", "i-1")],
            label: Some("CPUUtilization".to_string()),
            datapoints,
        }
    }

    #[tokio::test]
    async fn test_persist_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let persister = JsonFilePersister::new(dir.path());

        let path = persister.persist(&metric(), &result_with(3)).await.unwrap();

        assert_eq!(path, dir.path().join("AWS/EC2/InstanceId/i-1"));
        let written = tokio::fs::read(&path).await.unwrap();
        assert_eq!(written, result_with(3).to_json_bytes().unwrap());
    }

    #[tokio::test]
    async fn test_persist_appends() {
        let dir = tempfile::tempdir().unwrap();
        let persister = JsonFilePersister::new(dir.path());

        persister.persist(&metric(), &result_with(1)).await.unwrap();
        let path = persister.persist(&metric(), &result_with(2)).await.unwrap();

        let mut expected = result_with(1).to_json_bytes().unwrap();
        expected.extend(result_with(2).to_json_bytes().unwrap());
        assert_eq!(tokio::fs::read(&path).await.unwrap(), expected);

        let documents = read_documents(&path).await.unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0]["Datapoints"].as_array().unwrap().len(), 1);
        assert_eq!(documents[1]["Datapoints"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_persist_fails_when_base_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, b"not a directory").await.unwrap();

        let persister = JsonFilePersister::new(&blocker);
        let err = persister
            .persist(&metric(), &result_with(1))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistError::CreateDirectory { .. }));
    }

    #[tokio::test]
    async fn test_read_documents_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_documents(dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, PersistError::Read { .. }));
    }

    #[tokio::test]
    async fn test_read_documents_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage");
        tokio::fs::write(&path, b"{\"a\":1}{not json").await.unwrap();
        assert!(matches!(
            read_documents(&path).await,
            Err(PersistError::Json(_))
        ));
    }
}
