use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting or reading back statistic results
#[derive(Error, Debug)]
pub enum PersistError {
    /// The result could not be serialized, or a stored document could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
