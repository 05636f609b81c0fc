//! Common types shared by the file sinks
//!
//! Errors, counters and I/O error classification.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use rawfile_config::ConfigError;
use thiserror::Error;

/// Result type for sink operations
pub type Result<T> = std::result::Result<T, SinkError>;

/// Counters kept by every sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Records handed to the OS
    pub records_written: AtomicU64,

    /// Records rejected by a full file, or lost with discarded bytes
    pub records_dropped: AtomicU64,

    /// Bytes handed to the OS
    pub bytes_flushed: AtomicU64,

    /// Bytes thrown away unwritten
    pub bytes_discarded: AtomicU64,

    /// Failed flushes
    pub write_errors: AtomicU64,

    /// Files opened after the first one
    pub rolls: AtomicU64,

    /// Files removed by retention
    pub files_deleted: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            records_written: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
            bytes_flushed: AtomicU64::new(0),
            bytes_discarded: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            rolls: AtomicU64::new(0),
            files_deleted: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn records_written(&self, count: u64) {
        self.records_written.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn flushed(&self, bytes: usize) {
        self.bytes_flushed.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Pending bytes and the records they held were thrown away
    #[inline]
    pub fn discarded(&self, bytes: usize, records: u64) {
        self.bytes_discarded.fetch_add(bytes as u64, Ordering::Relaxed);
        self.records_dropped.fetch_add(records, Ordering::Relaxed);
    }

    #[inline]
    pub fn write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn rolled(&self) {
        self.rolls.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn file_deleted(&self) {
        self.files_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_written: self.records_written.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            bytes_flushed: self.bytes_flushed.load(Ordering::Relaxed),
            bytes_discarded: self.bytes_discarded.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            rolls: self.rolls.load(Ordering::Relaxed),
            files_deleted: self.files_deleted.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_written: u64,
    pub records_dropped: u64,
    pub bytes_flushed: u64,
    pub bytes_discarded: u64,
    pub write_errors: u64,
    pub rolls: u64,
    pub files_deleted: u64,
}

/// Sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Invalid construction argument
    #[error("configuration error: {0}")]
    Config(String),

    /// Open, write or flush failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Every candidate file was locked by another process
    #[error("'{path}' is locked after {attempts} attempts: {source}")]
    Locked {
        /// Last path attempted
        path: PathBuf,
        /// Attempts made
        attempts: usize,
        /// Error from the last attempt
        #[source]
        source: io::Error,
    },

    /// A lifecycle hook failed to produce an output stream
    #[error("lifecycle hook failed for '{path}': {source}")]
    Hook {
        /// File being opened
        path: PathBuf,
        /// Error returned by the hook
        #[source]
        source: io::Error,
    },

    /// Emission after the sink was closed
    #[error("sink has been closed")]
    Closed,
}

impl SinkError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<ConfigError> for SinkError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

/// Whether `err` means another process holds the file open exclusively
pub fn is_locked_file(err: &io::Error) -> bool {
    // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
    #[cfg(windows)]
    if matches!(err.raw_os_error(), Some(32) | Some(33)) {
        return true;
    }

    err.kind() == io::ErrorKind::WouldBlock
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;
