//! File sink configuration
//!
//! Values consumed by the buffered file engine. Everything except `path` has
//! a default, so the smallest useful config is a single line:
//!
//! ```toml
//! [file]
//! path = "logs/app-{Date}.log"
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! [file]
//! path = "logs/app.log"
//! rolling_interval = "day"
//! file_size_limit_bytes = 104857600
//! roll_on_file_size_limit = true
//! retained_file_count_limit = 31
//! retained_file_time_limit = "7days"
//! buffered = true
//! keep_file_open = true
//! pause_on_error = true
//! flush_to_disk_interval = "2s"
//! encoding = "utf8"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::interval::RollingInterval;

/// Encoding label handed to lifecycle hooks when a file is opened
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// UTF-8 text without a byte order mark (default)
    #[default]
    Utf8,
    /// Opaque binary records; hooks should not inject text
    Binary,
}

/// Configuration for a (possibly rolling) raw file sink
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawFileConfig {
    /// Path template; may contain a single `{Date}` placeholder
    pub path: PathBuf,

    /// Maximum bytes per file; absent = unlimited
    pub file_size_limit_bytes: Option<u64>,

    /// Keep at most this many files, including the active one
    pub retained_file_count_limit: Option<usize>,

    /// Remove files whose checkpoint is older than this
    #[serde(with = "humantime_serde")]
    pub retained_file_time_limit: Option<Duration>,

    /// Time granularity for rolling
    /// Default: infinite
    pub rolling_interval: RollingInterval,

    /// Batch small writes in memory before handing them to the OS
    /// Default: false
    pub buffered: bool,

    /// Open the next sequence file when the size limit is reached
    /// instead of dropping records
    /// Default: false
    pub roll_on_file_size_limit: bool,

    /// Keep the handle open between writes
    /// Default: true
    pub keep_file_open: bool,

    /// Stop touching the disk for a short window after a write fault
    /// Default: false
    pub pause_on_error: bool,

    /// Force pending records to disk this often; absent = only on close
    #[serde(with = "humantime_serde")]
    pub flush_to_disk_interval: Option<Duration>,

    /// Encoding label passed to hooks
    pub encoding: Encoding,
}

impl Default for RawFileConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            file_size_limit_bytes: None,
            retained_file_count_limit: None,
            retained_file_time_limit: None,
            rolling_interval: RollingInterval::Infinite,
            buffered: false,
            roll_on_file_size_limit: false,
            keep_file_open: true,
            pause_on_error: false,
            flush_to_disk_interval: None,
            encoding: Encoding::Utf8,
        }
    }
}

impl RawFileConfig {
    /// Create a config writing to `path` with all other values defaulted
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the rolling interval
    #[must_use]
    pub fn with_rolling_interval(mut self, interval: RollingInterval) -> Self {
        self.rolling_interval = interval;
        self
    }

    /// Limit each file to `bytes`
    #[must_use]
    pub fn with_file_size_limit(mut self, bytes: u64) -> Self {
        self.file_size_limit_bytes = Some(bytes);
        self
    }

    /// Keep at most `count` files
    #[must_use]
    pub fn with_retained_file_count_limit(mut self, count: usize) -> Self {
        self.retained_file_count_limit = Some(count);
        self
    }

    /// Remove files older than `limit`
    #[must_use]
    pub fn with_retained_file_time_limit(mut self, limit: Duration) -> Self {
        self.retained_file_time_limit = Some(limit);
        self
    }

    /// Roll to the next sequence file on size overflow
    #[must_use]
    pub fn with_roll_on_file_size_limit(mut self) -> Self {
        self.roll_on_file_size_limit = true;
        self
    }

    /// Enable in-memory batching
    #[must_use]
    pub fn with_buffering(mut self) -> Self {
        self.buffered = true;
        self
    }

    /// Reopen the file for every write
    #[must_use]
    pub fn with_transient_handle(mut self) -> Self {
        self.keep_file_open = false;
        self
    }

    /// Quarantine the file after a write fault
    #[must_use]
    pub fn with_pause_on_error(mut self) -> Self {
        self.pause_on_error = true;
        self
    }

    /// Flush pending records to disk every `interval`
    #[must_use]
    pub fn with_flush_to_disk_interval(mut self, interval: Duration) -> Self {
        self.flush_to_disk_interval = Some(interval);
        self
    }

    /// Whether a rolling engine is needed, or a single file suffices
    pub fn needs_rolling(&self) -> bool {
        self.rolling_interval != RollingInterval::Infinite || self.roll_on_file_size_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RawFileConfig::default();
        assert!(config.keep_file_open);
        assert!(!config.buffered);
        assert!(!config.roll_on_file_size_limit);
        assert!(!config.pause_on_error);
        assert_eq!(config.file_size_limit_bytes, None);
        assert_eq!(config.flush_to_disk_interval, None);
        assert_eq!(config.rolling_interval, RollingInterval::Infinite);
        assert!(!config.needs_rolling());
    }

    #[test]
    fn test_deserialize_minimal() {
        let config: RawFileConfig = toml::from_str("path = \"logs/app.log\"").unwrap();
        assert_eq!(config.path, PathBuf::from("logs/app.log"));
        assert_eq!(config.retained_file_count_limit, None);
        assert_eq!(config.encoding, Encoding::Utf8);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
path = "logs/app.log"
rolling_interval = "day"
file_size_limit_bytes = 1024
roll_on_file_size_limit = true
retained_file_count_limit = 7
retained_file_time_limit = "2days"
buffered = true
keep_file_open = false
pause_on_error = true
flush_to_disk_interval = "500ms"
encoding = "binary"
"#;
        let config: RawFileConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.rolling_interval, RollingInterval::Day);
        assert_eq!(config.file_size_limit_bytes, Some(1024));
        assert_eq!(config.retained_file_count_limit, Some(7));
        assert_eq!(
            config.retained_file_time_limit,
            Some(Duration::from_secs(2 * 24 * 60 * 60))
        );
        assert!(config.buffered);
        assert!(!config.keep_file_open);
        assert!(config.pause_on_error);
        assert_eq!(
            config.flush_to_disk_interval,
            Some(Duration::from_millis(500))
        );
        assert_eq!(config.encoding, Encoding::Binary);
        assert!(config.needs_rolling());
    }

    #[test]
    fn test_builder_chain() {
        let config = RawFileConfig::new("a.log")
            .with_file_size_limit(10)
            .with_roll_on_file_size_limit()
            .with_retained_file_count_limit(3);
        assert!(config.needs_rolling());
        assert_eq!(config.file_size_limit_bytes, Some(10));
        assert_eq!(config.retained_file_count_limit, Some(3));
    }
}
