//! Sink abstraction and construction from configuration

use rawfile_config::RawFileConfig;

use crate::common::{MetricsSnapshot, Result};
use crate::file::FileSink;
use crate::file::hooks::HookChain;
use crate::flush::PeriodicFlush;
use crate::record::Record;
use crate::rolling::RollingFileSink;

/// A destination for log records
///
/// Implementations are safe to share between threads; every call runs to
/// completion on the calling thread.
pub trait LogSink: Send + Sync {
    /// Persist (or buffer) one record
    ///
    /// A record rejected by a full file is dropped and counted, not reported.
    fn emit(&self, record: &dyn Record) -> Result<()>;

    /// Write pending bytes and force them to durable storage
    fn flush_to_disk(&self) -> Result<()>;

    /// Flush and release the current file; later emits fail
    fn close(&self) -> Result<()>;

    /// Get current metrics snapshot
    fn metrics(&self) -> MetricsSnapshot;
}

/// Build the sink described by `config`
///
/// A single [`FileSink`] suffices unless the configuration rolls by time or
/// size, in which case a [`RollingFileSink`] is returned. Either is wrapped
/// in a [`PeriodicFlush`] when a flush interval is configured.
pub fn build_sink(config: &RawFileConfig, hooks: Option<HookChain>) -> Result<Box<dyn LogSink>> {
    let sink: Box<dyn LogSink> = if config.needs_rolling() {
        tracing::debug!(
            path = %config.path.display(),
            interval = ?config.rolling_interval,
            "using rolling file sink"
        );
        Box::new(RollingFileSink::new(config, hooks)?)
    } else {
        tracing::debug!(path = %config.path.display(), "using single file sink");
        Box::new(FileSink::from_config(config, hooks.as_ref())?)
    };

    match config.flush_to_disk_interval {
        Some(interval) => {
            tracing::debug!(?interval, "flushing to disk periodically");
            Ok(Box::new(PeriodicFlush::new(sink, interval)?))
        }
        None => Ok(sink),
    }
}
