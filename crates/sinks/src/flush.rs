//! Periodic flush to disk
//!
//! Buffered sinks only hand bytes to the OS when their buffer fills up or
//! the sink closes. [`PeriodicFlush`] wraps any [`LogSink`] and calls
//! [`LogSink::flush_to_disk`] from a background thread on a fixed tick, so a
//! slow trickle of records still reaches the disk.
//!
//! ```text
//! emit() ------------------------------> [inner sink]
//!                                              ^
//! [rawfile-flush thread] --tick--> flush_to_disk()
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender, select};
use parking_lot::Mutex;

use crate::common::{MetricsSnapshot, Result, SinkError};
use crate::record::Record;
use crate::sink::LogSink;

/// Background thread plus the channel that stops it
struct Flusher {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Flusher {
    fn spawn(sink: Arc<dyn LogSink>, interval: Duration) -> Result<Self> {
        let (stop, stopped) = channel::bounded::<()>(0);
        let ticker = channel::tick(interval);

        let handle = thread::Builder::new()
            .name("rawfile-flush".into())
            .spawn(move || {
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            if let Err(e) = sink.flush_to_disk() {
                                tracing::warn!(error = %e, "periodic flush to disk failed");
                            }
                        }
                        // Disconnected when the owner drops the sender
                        recv(stopped) -> _ => break,
                    }
                }
            })
            .map_err(SinkError::Io)?;

        Ok(Self { stop, handle })
    }

    fn stop(self) {
        drop(self.stop);
        if self.handle.join().is_err() {
            tracing::error!("flush thread panicked");
        }
    }
}

/// A sink whose pending records are flushed to disk on a timer
pub struct PeriodicFlush {
    inner: Arc<dyn LogSink>,
    interval: Duration,
    flusher: Mutex<Option<Flusher>>,
}

impl PeriodicFlush {
    /// Start flushing `inner` every `interval`
    pub fn new(inner: Box<dyn LogSink>, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(SinkError::config("flush interval must be non-zero"));
        }

        let inner: Arc<dyn LogSink> = Arc::from(inner);
        let flusher = Flusher::spawn(Arc::clone(&inner), interval)?;

        Ok(Self {
            inner,
            interval,
            flusher: Mutex::new(Some(flusher)),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn stop_flusher(&self) {
        if let Some(flusher) = self.flusher.lock().take() {
            flusher.stop();
        }
    }
}

impl LogSink for PeriodicFlush {
    fn emit(&self, record: &dyn Record) -> Result<()> {
        self.inner.emit(record)
    }

    fn flush_to_disk(&self) -> Result<()> {
        self.inner.flush_to_disk()
    }

    fn close(&self) -> Result<()> {
        self.stop_flusher();
        self.inner.close()
    }

    fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics()
    }
}

impl Drop for PeriodicFlush {
    fn drop(&mut self) {
        self.stop_flusher();
    }
}
