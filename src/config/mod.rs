use crate::datamodel::TimeWindow;
use crate::parsing::parse_date;
use anyhow::{Context, Error, Result, bail};
use clap::Parser;
use confique::Config;
use hifitime::{Epoch, Unit};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Config)]
pub struct SiphonConfig {
    #[config(env = "SIPHON_REGION", default = "us-east-1")]
    pub region: String,

    /// Bucket width of each datapoint
    #[config(env = "SIPHON_PERIOD_SECONDS", default = 300)]
    pub period_seconds: u32,

    #[config(env = "SIPHON_BASE_DIR", default = "/tmp/cloudwatch")]
    pub base_dir: PathBuf,

    /// `2016-Jan-18` or ISO 8601
    #[config(env = "SIPHON_START_DATE")]
    pub start_date: Option<String>,

    #[config(env = "SIPHON_END_DATE")]
    pub end_date: Option<String>,

    /// Length of the window when a date is missing
    #[config(env = "SIPHON_DEFAULT_WINDOW_HOURS", default = 24)]
    pub default_window_hours: u32,

    #[config(env = "SIPHON_CONCURRENCY", default = 32)]
    pub concurrency: usize,

    #[config(env = "SIPHON_QUEUE_CAPACITY", default = 1024)]
    pub queue_capacity: usize,

    /// 0 disables the per-task timeout
    #[config(env = "SIPHON_TASK_TIMEOUT_SECONDS", default = 0)]
    pub task_timeout_seconds: u64,

    #[config(env = "SIPHON_SENTRY_DSN")]
    pub sentry_dsn: Option<String>,
}

// CloudWatch accepts 1, 5, 10, 30 (high resolution metrics) or any multiple of 60.
fn is_valid_period(period_seconds: u32) -> bool {
    matches!(period_seconds, 1 | 5 | 10 | 30) || (period_seconds > 0 && period_seconds % 60 == 0)
}

impl SiphonConfig {
    pub fn load() -> Result<SiphonConfig, Error> {
        Self::load_from("settings.toml")
    }

    pub fn load_from(settings_file: impl AsRef<Path>) -> Result<SiphonConfig, Error> {
        let c = SiphonConfig::builder()
            .env()
            .file(settings_file.as_ref())
            .load()?;

        Ok(c)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_period(self.period_seconds) {
            bail!(
                "Invalid period {}: must be 1, 5, 10, 30 or a multiple of 60 seconds",
                self.period_seconds
            );
        }
        if self.concurrency == 0 {
            bail!("Concurrency must be at least 1");
        }
        if self.queue_capacity == 0 {
            bail!("Queue capacity must be at least 1");
        }
        if self.default_window_hours == 0 {
            bail!("Default window must be at least one hour");
        }
        if self.base_dir.as_os_str().is_empty() {
            bail!("Base directory must not be empty");
        }
        Ok(())
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        (self.task_timeout_seconds > 0).then(|| Duration::from_secs(self.task_timeout_seconds))
    }

    pub fn default_window(&self) -> hifitime::Duration {
        Unit::Hour * self.default_window_hours as i64
    }

    /// Resolves the query window, `now` being used when both dates are missing.
    pub fn time_window(&self, now: Epoch) -> Result<TimeWindow> {
        let start = self
            .start_date
            .as_deref()
            .map(parse_date)
            .transpose()
            .context("Invalid start date")?;
        let end = self
            .end_date
            .as_deref()
            .map(parse_date)
            .transpose()
            .context("Invalid end date")?;

        let window = TimeWindow::resolve(
            start,
            end,
            self.default_window(),
            now,
            self.period_seconds,
        );
        if window.is_inverted() {
            warn!(
                "Start date {} is after end date {}, the query will most likely return nothing",
                window.start.to_rfc3339(),
                window.end.to_rfc3339()
            );
        }
        Ok(window)
    }
}

/// Command line flags, each overriding the matching setting.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    #[arg(short, long, default_value = "settings.toml")]
    pub config: PathBuf,

    /// AWS region to siphon metrics from
    #[arg(long)]
    pub region: Option<String>,

    /// Period in seconds of each datapoint
    #[arg(long)]
    pub period: Option<u32>,

    /// Base directory of the datapoint file structure
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Start date for datapoint collection (e.g. 2016-Jan-18)
    #[arg(long)]
    pub start_date: Option<String>,

    /// End date for datapoint collection (e.g. 2016-Jan-20)
    #[arg(long)]
    pub end_date: Option<String>,

    #[arg(long)]
    pub default_window_hours: Option<u32>,

    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long)]
    pub queue_capacity: Option<usize>,

    #[arg(long)]
    pub task_timeout_seconds: Option<u64>,
}

impl CliArgs {
    pub fn apply(self, config: &mut SiphonConfig) {
        if let Some(region) = self.region {
            config.region = region;
        }
        if let Some(period) = self.period {
            config.period_seconds = period;
        }
        if let Some(base_dir) = self.base_dir {
            config.base_dir = base_dir;
        }
        if let Some(start_date) = self.start_date {
            config.start_date = Some(start_date);
        }
        if let Some(end_date) = self.end_date {
            config.end_date = Some(end_date);
        }
        if let Some(hours) = self.default_window_hours {
            config.default_window_hours = hours;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if let Some(timeout) = self.task_timeout_seconds {
            config.task_timeout_seconds = timeout;
        }
    }
}

/// Loads the settings file and environment, then applies the command line.
pub fn load_configuration_from(args: CliArgs) -> Result<SiphonConfig> {
    let mut config = SiphonConfig::load_from(&args.config)
        .with_context(|| format!("Failed to load settings from {}", args.config.display()))?;
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

pub fn load_configuration() -> Result<SiphonConfig> {
    load_configuration_from(CliArgs::parse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_load_config() {
        let config = SiphonConfig::load().unwrap();

        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.period_seconds, 300);
        assert_eq!(config.base_dir, PathBuf::from("/tmp/cloudwatch"));
        assert_eq!(config.start_date, None);
        assert_eq!(config.task_timeout(), None);
        config.validate().unwrap();

        temp_env::with_var("SIPHON_REGION", Some("eu-west-1"), || {
            let config = SiphonConfig::load().unwrap();
            assert_eq!(config.region, "eu-west-1");
        });
    }

    #[test]
    #[serial]
    fn test_cli_overrides_environment() {
        temp_env::with_vars(
            [
                ("SIPHON_PERIOD_SECONDS", Some("60")),
                ("SIPHON_CONCURRENCY", Some("4")),
            ],
            || {
                let args = CliArgs::parse_from([
                    "cwsiphon",
                    "--period",
                    "120",
                    "--start-date",
                    "2016-Jan-18",
                    "--task-timeout-seconds",
                    "30",
                ]);
                let config = load_configuration_from(args).unwrap();
                assert_eq!(config.period_seconds, 120);
                assert_eq!(config.concurrency, 4);
                assert_eq!(config.start_date.as_deref(), Some("2016-Jan-18"));
                assert_eq!(config.task_timeout(), Some(Duration::from_secs(30)));
            },
        );
    }

    #[test]
    #[serial]
    fn test_validate() {
        let mut config = SiphonConfig::load().unwrap();
        config.period_seconds = 90;
        assert!(config.validate().is_err());
        config.period_seconds = 30;
        assert!(config.validate().is_ok());
        config.period_seconds = 3600;
        assert!(config.validate().is_ok());

        config.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_time_window_from_dates() {
        let mut config = SiphonConfig::load().unwrap();
        config.start_date = Some("2016-Jan-18".to_string());
        config.end_date = Some("2016-Jan-20".to_string());

        let window = config.time_window(Epoch::from_gregorian_utc_at_midnight(2020, 1, 1)).unwrap();
        assert_eq!(window.start, Epoch::from_gregorian_utc_at_midnight(2016, 1, 18));
        assert_eq!(window.end, Epoch::from_gregorian_utc_at_midnight(2016, 1, 20));
        assert_eq!(window.period_seconds, 300);
    }

    #[test]
    #[serial]
    fn test_time_window_defaults_to_lookback() {
        let config = SiphonConfig::load().unwrap();
        let now = Epoch::from_gregorian_utc_at_midnight(2016, 1, 20);

        let window = config.time_window(now).unwrap();
        assert_eq!(window.start, Epoch::from_gregorian_utc_at_midnight(2016, 1, 19));
        assert_eq!(window.end, now);
    }

    #[test]
    #[serial]
    fn test_time_window_rejects_bad_date() {
        let mut config = SiphonConfig::load().unwrap();
        config.end_date = Some("tomorrow".to_string());
        let now = Epoch::from_gregorian_utc_at_midnight(2016, 1, 20);
        assert!(config.time_window(now).is_err());
    }
}
