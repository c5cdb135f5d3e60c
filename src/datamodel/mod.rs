pub mod metric;
pub mod statistics;
pub mod time_window;

pub use metric::{Dimension, MetricIdentity};
pub use statistics::{Datapoint, Statistic, StatisticResult};
pub use time_window::TimeWindow;
