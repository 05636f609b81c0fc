//! rawfile Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only `file.path` is required.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use rawfile_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[file]\npath = \"logs/app.log\"").unwrap();
//! assert_eq!(config.file.path.to_str(), Some("logs/app.log"));
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [file]
//! path = "logs/app-{Date}.log"
//! rolling_interval = "day"
//! retained_file_count_limit = 31
//! ```

mod error;
mod file;
mod interval;
mod logging;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use file::{Encoding, RawFileConfig};
pub use interval::RollingInterval;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use validation::validate_file;

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Diagnostics for rawfile itself
    pub log: LogConfig,

    /// Destination file settings
    pub file: RawFileConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        validation::validate_file(&config.file)?;
        Ok(config)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
