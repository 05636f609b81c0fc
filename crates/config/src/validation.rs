//! Configuration validation
//!
//! Rejects values the engine cannot honor before any file is touched:
//! - `path` must be present
//! - `file_size_limit_bytes` must be at least 1 when set
//! - `retained_file_count_limit` must be at least 1 when set
//! - `flush_to_disk_interval` must be non-zero when set

use crate::error::{ConfigError, Result};
use crate::file::RawFileConfig;

const SECTION: &str = "file";

/// Validate a file sink configuration
pub fn validate_file(config: &RawFileConfig) -> Result<()> {
    if config.path.as_os_str().is_empty() {
        return Err(ConfigError::missing_field(SECTION, "path"));
    }

    if config.path.file_name().is_none() {
        return Err(ConfigError::invalid_value(
            SECTION,
            "path",
            format!("'{}' does not name a file", config.path.display()),
        ));
    }

    if config.file_size_limit_bytes == Some(0) {
        return Err(ConfigError::invalid_value(
            SECTION,
            "file_size_limit_bytes",
            "file size limit must be at least 1 byte, or unset",
        ));
    }

    if config.retained_file_count_limit == Some(0) {
        return Err(ConfigError::invalid_value(
            SECTION,
            "retained_file_count_limit",
            "retained file count limit must be at least 1, or unset",
        ));
    }

    if config.flush_to_disk_interval.is_some_and(|interval| interval.is_zero()) {
        return Err(ConfigError::invalid_value(
            SECTION,
            "flush_to_disk_interval",
            "flush interval must be non-zero, or unset",
        ));
    }

    Ok(())
}
