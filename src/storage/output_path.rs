use crate::datamodel::MetricIdentity;
use std::path::{Component, Path, PathBuf};

/// Derives the file a metric's results are appended to.
///
/// `base/namespace/firstDimensionName/firstDimensionValue` when the metric
/// has dimensions, `base/namespace/metricName` otherwise. Later dimensions
/// are ignored, so metrics sharing their first dimension share a file.
/// Separators inside a component nest directories (`AWS/EC2` spans two),
/// but the result always stays under `base_dir`.
pub fn output_path(base_dir: &Path, metric: &MetricIdentity) -> PathBuf {
    let mut path = base_dir.to_path_buf();
    push_relative(&mut path, &metric.namespace);
    match metric.first_dimension() {
        Some(dimension) => {
            push_relative(&mut path, &dimension.name);
            push_relative(&mut path, &dimension.value);
        }
        None => push_relative(&mut path, &metric.name),
    }
    path
}

/// Appends `component` below `path`. Roots and `.` are dropped, `..` is
/// escaped so it cannot climb out.
fn push_relative(path: &mut PathBuf, component: &str) {
    for part in Path::new(component).components() {
        match part {
            Component::Normal(name) => path.push(name),
            Component::ParentDir => path.push("%2E%2E"),
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
        }
    }
}
