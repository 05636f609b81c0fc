//! Command implementations for the rawfile CLI

pub mod list;
pub mod write;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};
use rawfile_config::{RawFileConfig, RollingInterval};

/// Rolling interval as accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntervalArg {
    /// One file, never rolled by time
    Infinite,
    Year,
    Month,
    Day,
    Hour,
    Minute,
}

impl From<IntervalArg> for RollingInterval {
    fn from(arg: IntervalArg) -> Self {
        match arg {
            IntervalArg::Infinite => Self::Infinite,
            IntervalArg::Year => Self::Year,
            IntervalArg::Month => Self::Month,
            IntervalArg::Day => Self::Day,
            IntervalArg::Hour => Self::Hour,
            IntervalArg::Minute => Self::Minute,
        }
    }
}

/// Overrides for the `[file]` section, shared by every command
#[derive(Args, Debug)]
pub struct FileOverrides {
    /// Path template, e.g. `logs/app-{Date}.log`
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Rolling interval
    #[arg(short, long, value_enum, ignore_case = true)]
    interval: Option<IntervalArg>,
}

impl FileOverrides {
    /// Apply the overrides on top of the loaded configuration
    pub fn apply(&self, mut config: RawFileConfig) -> RawFileConfig {
        if let Some(path) = &self.path {
            config.path = path.clone();
        }
        if let Some(interval) = self.interval {
            config.rolling_interval = interval.into();
        }
        config
    }
}

/// Parse a human-readable duration such as `500ms` or `2s`
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(clap::Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        file: FileOverrides,
    }

    #[test]
    fn test_interval_flag_uses_config_names() {
        use clap::Parser;

        let cli = TestCli::try_parse_from(["rawfile", "--interval", "Hour"]).unwrap();
        assert_eq!(cli.file.interval, Some(IntervalArg::Hour));

        let cli = TestCli::try_parse_from(["rawfile", "-i", "day"]).unwrap();
        let config = cli.file.apply(RawFileConfig::new("a.log"));
        assert_eq!(config.rolling_interval, RollingInterval::Day);

        assert!(TestCli::try_parse_from(["rawfile", "--interval", "weekly"]).is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("2s"), Ok(Duration::from_secs(2)));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let overrides = FileOverrides {
            path: Some(PathBuf::from("other/app.log")),
            interval: Some(IntervalArg::Minute),
        };
        let config = overrides.apply(RawFileConfig::new("logs/app.log").with_buffering());

        assert_eq!(config.path, PathBuf::from("other/app.log"));
        assert_eq!(config.rolling_interval, RollingInterval::Minute);
        assert!(config.buffered);
    }

    #[test]
    fn test_missing_overrides_keep_config() {
        let overrides = FileOverrides {
            path: None,
            interval: None,
        };
        let config = overrides.apply(RawFileConfig::new("logs/app.log"));
        assert_eq!(config, RawFileConfig::new("logs/app.log"));
    }
}
