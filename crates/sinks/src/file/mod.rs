//! File Sink - one buffered destination file
//!
//! Renders records into a pooled buffer and hands them to a [`FileWriter`]
//! when the buffer is worth flushing. Enforces an optional size limit and,
//! when configured, quarantines the file for a few seconds after a write
//! fault instead of hammering an unavailable disk. Records keep accumulating
//! in memory while quarantined and are written once the window has passed,
//! unless they reach [`MAX_IN_MEMORY_CAPACITY`] first.
//!
//! # Flush policy
//!
//! The buffer is written out when any of these hold after an append:
//!
//! - buffering is disabled
//! - the buffer holds at least half of its capacity
//! - a size limit is set and the pending bytes would reach it
//!
//! # Concurrency
//!
//! ```text
//! emit() --try_lock ok--> [format into shared buffer] --> flush?
//!    |
//!    +--contended--> [format into thread-local scratch] --lock--> [copy] --> flush?
//! ```
//!
//! Under contention the expensive formatting step happens outside the lock,
//! so the lock is only held for the copy and a possible flush.

pub mod hooks;
pub mod writer;

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use parking_lot::Mutex;
use rawfile_config::{Encoding, RawFileConfig, validate_file};

use crate::common::{MetricsSnapshot, Result, SinkError, SinkMetrics};
use crate::record::Record;
use crate::rolling::roller::DATE_PLACEHOLDER;
use crate::sink::LogSink;
use crate::util::{BufferPool, RateLimitedLogger, with_thread_local};

use hooks::HookChain;
use writer::FileWriter;

/// How long disk access stays suspended after a write fault
pub const QUARANTINE_WINDOW: Duration = Duration::from_secs(5);

/// Unwritten bytes kept in memory before they are thrown away
pub const MAX_IN_MEMORY_CAPACITY: usize = 64 * 1024 * 1024;

/// Per-file settings shared by [`FileSink`] and the rolling sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOptions {
    /// Maximum bytes per file; `None` = unlimited
    pub file_size_limit_bytes: Option<u64>,

    /// Batch small writes in memory
    pub buffered: bool,

    /// Keep the handle open between writes
    pub keep_file_open: bool,

    /// Quarantine the file after a write fault
    pub pause_on_error: bool,

    /// Encoding label for hooks
    pub encoding: Encoding,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            file_size_limit_bytes: None,
            buffered: false,
            keep_file_open: true,
            pause_on_error: false,
            encoding: Encoding::Utf8,
        }
    }
}

impl From<&RawFileConfig> for FileOptions {
    fn from(config: &RawFileConfig) -> Self {
        Self {
            file_size_limit_bytes: config.file_size_limit_bytes,
            buffered: config.buffered,
            keep_file_open: config.keep_file_open,
            pause_on_error: config.pause_on_error,
            encoding: config.encoding,
        }
    }
}

impl FileOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.file_size_limit_bytes == Some(0) {
            return Err(SinkError::config(
                "file size limit must be at least 1 byte, or unset",
            ));
        }
        Ok(())
    }
}

/// An open file plus its pending buffer
///
/// Not synchronized; owners serialize access.
pub(crate) struct BufferedFile {
    path: PathBuf,
    writer: FileWriter,
    buffer: BytesMut,
    options: FileOptions,
    bytes_written: u64,
    /// Records rendered into `buffer` but not yet handed to the OS
    pending_records: u64,
    quarantined_at: Option<Instant>,
    metrics: Arc<SinkMetrics>,
    drops: Arc<RateLimitedLogger>,
}

impl BufferedFile {
    /// Open `path`, creating missing parent directories
    pub(crate) fn open(
        path: &Path,
        options: FileOptions,
        hooks: Option<&HookChain>,
        metrics: Arc<SinkMetrics>,
        drops: Arc<RateLimitedLogger>,
    ) -> Result<Self> {
        options.validate()?;

        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
            && !dir.exists()
        {
            fs::create_dir_all(dir)?;
        }

        let (writer, bytes_written) =
            FileWriter::open(path, hooks, options.keep_file_open, options.encoding)?;

        tracing::debug!(
            path = %path.display(),
            length = bytes_written,
            writer = writer.kind(),
            "opened log file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            buffer: BufferPool::global().get(),
            options,
            bytes_written,
            pending_records: 0,
            quarantined_at: None,
            metrics,
            drops,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes the OS has accepted for this file
    pub(crate) fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn is_full(&self) -> bool {
        self.options
            .file_size_limit_bytes
            .is_some_and(|limit| self.bytes_written >= limit)
    }

    /// Format `record` into the buffer unless the file is full
    ///
    /// Returns `Ok(false)` without writing when the size limit was already
    /// reached.
    pub(crate) fn emit_or_overflow(&mut self, record: &dyn Record) -> io::Result<bool> {
        if self.is_full() {
            return Ok(false);
        }

        record.format(&mut self.buffer);
        self.appended()?;
        Ok(true)
    }

    /// Like [`BufferedFile::emit_or_overflow`] for an already rendered record
    pub(crate) fn emit_rendered_or_overflow(&mut self, rendered: &[u8]) -> io::Result<bool> {
        if self.is_full() {
            return Ok(false);
        }

        self.buffer.extend_from_slice(rendered);
        self.appended()?;
        Ok(true)
    }

    fn appended(&mut self) -> io::Result<()> {
        self.pending_records += 1;

        let pending = self.buffer.len();
        let reaches_limit = self
            .options
            .file_size_limit_bytes
            .is_some_and(|limit| self.bytes_written + pending as u64 >= limit);

        if !self.options.buffered || pending >= self.buffer.capacity() / 2 || reaches_limit {
            self.flush()?;
        }
        Ok(())
    }

    fn is_quarantined(&mut self) -> bool {
        match self.quarantined_at {
            Some(at) if at.elapsed() < QUARANTINE_WINDOW => true,
            Some(_) => {
                self.quarantined_at = None;
                false
            }
            None => false,
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.is_quarantined() {
            self.discard_if_oversized();
            return Ok(());
        }

        match self.writer.write(&self.buffer) {
            Ok(length) => {
                self.metrics.flushed(self.buffer.len());
                self.metrics.records_written(mem::take(&mut self.pending_records));
                self.bytes_written = length;
                self.buffer.clear();
            }
            Err(e) => {
                self.metrics.write_error();
                if self.options.pause_on_error {
                    self.quarantined_at = Some(Instant::now());
                    tracing::error!(
                        path = %self.path.display(),
                        error = %e,
                        pause_secs = QUARANTINE_WINDOW.as_secs(),
                        "write failed, pausing disk access"
                    );
                }
                self.discard_if_oversized();
                return Err(e);
            }
        }

        let pool = BufferPool::global();
        if pool.is_oversized(&self.buffer) {
            // The pool drops it rather than keep one huge record's allocation
            let oversized = mem::replace(&mut self.buffer, pool.get());
            pool.put(oversized);
        }
        Ok(())
    }

    fn discard_if_oversized(&mut self) {
        if self.buffer.len() >= MAX_IN_MEMORY_CAPACITY {
            self.discard();
        }
    }

    fn discard(&mut self) {
        let pending = self.buffer.len();
        if pending > 0 {
            self.buffer.clear();
            self.metrics.discarded(pending, mem::take(&mut self.pending_records));
            self.drops.dropped(&self.path, pending);
        }
    }

    /// Write out pending bytes and sync the file
    pub(crate) fn flush_to_disk(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            self.flush()?;
        }
        if self.is_quarantined() {
            return Ok(());
        }
        self.writer.flush_to_disk()
    }

    /// Flush, sync and release the file
    ///
    /// Bytes still held back by a quarantine are discarded.
    pub(crate) fn close(mut self) -> io::Result<()> {
        let flushed = self.flush_to_disk();
        self.discard();
        let closed = self.writer.close();
        BufferPool::global().put(self.buffer);

        tracing::debug!(
            path = %self.path.display(),
            length = self.bytes_written,
            "closed log file"
        );

        flushed.and(closed)
    }
}

/// Thread-safe sink writing every record to a single file
///
/// When the size limit is reached further records are dropped.
pub struct FileSink {
    path: PathBuf,
    state: Mutex<Option<BufferedFile>>,
    metrics: Arc<SinkMetrics>,
}

impl FileSink {
    /// Open `path` for appending
    pub fn new(
        path: impl Into<PathBuf>,
        options: FileOptions,
        hooks: Option<&HookChain>,
    ) -> Result<Self> {
        let path = path.into();
        let metrics = Arc::new(SinkMetrics::new());
        let file = BufferedFile::open(
            &path,
            options,
            hooks,
            Arc::clone(&metrics),
            Arc::new(RateLimitedLogger::default()),
        )?;

        Ok(Self {
            path,
            state: Mutex::new(Some(file)),
            metrics,
        })
    }

    /// Build from a validated configuration
    ///
    /// A `{Date}` placeholder in the file name renders empty, as it does for
    /// a rolling sink that never rolls by time.
    pub fn from_config(config: &RawFileConfig, hooks: Option<&HookChain>) -> Result<Self> {
        validate_file(config)?;
        Self::new(without_placeholder(&config.path), FileOptions::from(config), hooks)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes the OS has accepted for the file so far
    pub fn bytes_written(&self) -> Result<u64> {
        let guard = self.state.lock();
        guard
            .as_ref()
            .map(BufferedFile::bytes_written)
            .ok_or(SinkError::Closed)
    }

    fn accepted(&self, accepted: bool) {
        if !accepted {
            self.metrics.record_dropped();
        }
    }

    #[inline(never)]
    fn prerender_and_emit(&self, record: &dyn Record) -> Result<()> {
        with_thread_local(|scratch| {
            record.format(scratch);

            let mut guard = self.state.lock();
            let file = guard.as_mut().ok_or(SinkError::Closed)?;
            let accepted = file.emit_rendered_or_overflow(&scratch[..])?;
            self.accepted(accepted);
            Ok(())
        })
    }
}

impl LogSink for FileSink {
    fn emit(&self, record: &dyn Record) -> Result<()> {
        let Some(mut guard) = self.state.try_lock() else {
            return self.prerender_and_emit(record);
        };

        let file = guard.as_mut().ok_or(SinkError::Closed)?;
        let accepted = file.emit_or_overflow(record)?;
        self.accepted(accepted);
        Ok(())
    }

    fn flush_to_disk(&self) -> Result<()> {
        let mut guard = self.state.lock();
        match guard.as_mut() {
            Some(file) => Ok(file.flush_to_disk()?),
            None => Ok(()),
        }
    }

    fn close(&self) -> Result<()> {
        let file = self.state.lock().take();
        match file {
            Some(file) => Ok(file.close()?),
            None => Ok(()),
        }
    }

    fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if let Some(file) = self.state.get_mut().take()
            && let Err(e) = file.close()
        {
            tracing::error!(path = %self.path.display(), error = %e, "failed to close log file");
        }
    }
}

fn without_placeholder(path: &Path) -> PathBuf {
    match path.file_name().and_then(OsStr::to_str) {
        Some(name) if name.contains(DATE_PLACEHOLDER) => {
            path.with_file_name(name.replacen(DATE_PLACEHOLDER, "", 1))
        }
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
#[path = "file_test.rs"]
mod file_test;
