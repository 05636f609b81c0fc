//! Rate-limited diagnostics
//!
//! While a file is quarantined every flush discards its bytes. A line per
//! discarded flush would bury the one useful message, so drops are tallied
//! and reported at most once per interval with the accumulated counts.
//!
//! # Example
//!
//! ```ignore
//! let reporter = RateLimitedLogger::new(Duration::from_secs(10));
//!
//! // Logs the first call, then at most once per 10 seconds
//! for _ in 0..1000 {
//!     reporter.dropped(path, 512);
//! }
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between reports
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Reports discarded data without flooding diagnostics
///
/// Thread-safe: counters are atomic, the last report time sits behind a
/// mutex that is only held for the comparison.
pub struct RateLimitedLogger {
    /// Minimum interval between reports
    min_interval: Duration,

    /// Last time we reported
    last_log_time: Mutex<Option<Instant>>,

    /// Drops since the last report
    pending_drops: AtomicU64,

    /// Bytes dropped since the last report
    pending_bytes: AtomicU64,

    /// Bytes dropped over the lifetime of this reporter
    total_bytes: AtomicU64,
}

impl RateLimitedLogger {
    /// Create a reporter with the specified interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_log_time: Mutex::new(None),
            pending_drops: AtomicU64::new(0),
            pending_bytes: AtomicU64::new(0),
            total_bytes: AtomicU64::new(0),
        }
    }

    /// Record `bytes` discarded for `path`, logging if the interval elapsed
    ///
    /// Returns true if a report was emitted.
    pub fn dropped(&self, path: &Path, bytes: usize) -> bool {
        let bytes = bytes as u64;
        self.pending_drops.fetch_add(1, Ordering::Relaxed);
        self.pending_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.total_bytes.fetch_add(bytes, Ordering::Relaxed);

        if !self.due() {
            return false;
        }

        let drops = self.pending_drops.swap(0, Ordering::Relaxed);
        let pending = self.pending_bytes.swap(0, Ordering::Relaxed);
        tracing::warn!(
            path = %path.display(),
            drops,
            bytes = pending,
            total_bytes = self.total_bytes.load(Ordering::Relaxed),
            "discarding buffered records that could not be written"
        );
        true
    }

    fn due(&self) -> bool {
        let mut last = self.last_log_time.lock();
        let now = Instant::now();
        match *last {
            Some(at) if now.duration_since(at) < self.min_interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Drops recorded since the last report
    pub fn pending_drops(&self) -> u64 {
        self.pending_drops.load(Ordering::Relaxed)
    }

    /// Bytes dropped over the reporter's lifetime
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }
}
