use anyhow::Result;
use cwsiphon::datamodel::TimeWindow;
use cwsiphon::pipeline::{Coordinator, PoolOptions, RunSummary};
use cwsiphon::storage::JsonFilePersister;
use cwsiphon::test_utils::{InMemorySource, test_window};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs the whole pipeline against `source`, writing under `base_dir`.
pub async fn run_pipeline(source: InMemorySource, base_dir: &Path) -> RunSummary {
    run_pipeline_with(source, base_dir, test_window(), PoolOptions::default()).await
}

pub async fn run_pipeline_with(
    source: InMemorySource,
    base_dir: &Path,
    window: TimeWindow,
    options: PoolOptions,
) -> RunSummary {
    Coordinator::new(
        Arc::new(source),
        JsonFilePersister::new(base_dir),
        window,
        options,
    )
    .run()
    .await
}

/// Every regular file under `dir`, sorted
pub fn files_under(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        if !current.exists() {
            continue;
        }
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
