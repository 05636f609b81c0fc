//! Rolling File Sink
//!
//! Routes records into a family of files named by [`PathRoller`]: one file
//! per time checkpoint, with numbered siblings when a file fills up or is
//! locked by another process. Old files are pruned by count and age each
//! time a new file is opened.
//!
//! # Lifecycle
//!
//! ```text
//!            first emit / checkpoint passed / file full
//!  [Closed] ------------------------------------------> [Open]
//!     ^                                                   |
//!     +------------------- close() -----------------------+
//! ```
//!
//! Opening picks the highest existing sequence for the checkpoint (or the
//! next one when the current file is full), retries up to three times past
//! locked files, then applies retention.
//!
//! With the infinite interval the deadline is 30 minutes out; it only causes
//! a periodic reopen and retention pass, never a rename. A failed open is not
//! retried before the deadline passes; records arriving in between are
//! dropped.

pub mod roller;

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta};
use parking_lot::Mutex;
use rawfile_config::{RawFileConfig, validate_file};

use crate::common::{MetricsSnapshot, Result, SinkError, SinkMetrics, is_locked_file};
use crate::file::hooks::{FileLifecycleHook, HookChain};
use crate::file::{BufferedFile, FileOptions};
use crate::record::Record;
use crate::sink::LogSink;
use crate::util::{RateLimitedLogger, with_thread_local};

use roller::{PathRoller, RollingLogFile};

/// Attempts to open a file before giving up on locked targets
pub const MAX_OPEN_ATTEMPTS: usize = 3;

/// Deadline used when the interval never rolls
const RECHECK_MINUTES: i64 = 30;

/// Opens one candidate file of the family
type OpenFile = fn(
    &Path,
    FileOptions,
    Option<&HookChain>,
    Arc<SinkMetrics>,
    Arc<RateLimitedLogger>,
) -> Result<BufferedFile>;

/// Mutable state guarded by the sink's lock
#[derive(Default)]
struct RollingState {
    current: Option<BufferedFile>,
    sequence: Option<u32>,
    /// `None` until a file has been opened for the current cycle
    next_checkpoint: Option<NaiveDateTime>,
    closed: bool,
}

/// Thread-safe sink writing to time and size rolled files
pub struct RollingFileSink {
    roller: PathRoller,
    options: FileOptions,
    retained_file_count_limit: Option<usize>,
    retained_file_time_limit: Option<Duration>,
    roll_on_file_size_limit: bool,
    hooks: Option<HookChain>,
    open_file: OpenFile,
    state: Mutex<RollingState>,
    metrics: Arc<SinkMetrics>,
    drops: Arc<RateLimitedLogger>,
}

impl RollingFileSink {
    /// Create a sink for `config`; no file is opened until the first record
    pub fn new(config: &RawFileConfig, hooks: Option<HookChain>) -> Result<Self> {
        validate_file(config)?;

        Ok(Self {
            roller: PathRoller::new(&config.path, config.rolling_interval)?,
            options: FileOptions::from(config),
            retained_file_count_limit: config.retained_file_count_limit,
            retained_file_time_limit: config.retained_file_time_limit,
            roll_on_file_size_limit: config.roll_on_file_size_limit,
            hooks,
            open_file: BufferedFile::open,
            state: Mutex::new(RollingState::default()),
            metrics: Arc::new(SinkMetrics::new()),
            drops: Arc::new(RateLimitedLogger::default()),
        })
    }

    /// Replace how candidate files are opened
    #[cfg(test)]
    pub(crate) fn with_open_file(mut self, open_file: OpenFile) -> Self {
        self.open_file = open_file;
        self
    }

    pub fn roller(&self) -> &PathRoller {
        &self.roller
    }

    /// Path of the file currently open, if any
    pub fn current_path(&self) -> Option<PathBuf> {
        let state = self.state.lock();
        state.current.as_ref().map(|file| file.path().to_path_buf())
    }

    #[inline(never)]
    fn prerender_and_emit(&self, record: &dyn Record) -> Result<()> {
        let now = record.timestamp().naive_local();
        with_thread_local(|scratch| {
            record.format(scratch);

            let mut state = self.state.lock();
            self.emit_locked(&mut state, now, |file| {
                file.emit_rendered_or_overflow(&scratch[..])
            })
        })
    }

    fn emit_locked(
        &self,
        state: &mut RollingState,
        now: NaiveDateTime,
        mut write: impl FnMut(&mut BufferedFile) -> io::Result<bool>,
    ) -> Result<()> {
        if state.closed {
            return Err(SinkError::Closed);
        }

        let deadline_passed = state.next_checkpoint.is_some_and(|next| now >= next);
        if state.current.is_none() || deadline_passed {
            self.align(state, now, false)?;
        }

        loop {
            let Some(file) = state.current.as_mut() else {
                // Waiting out a failed open
                self.metrics.record_dropped();
                return Ok(());
            };

            if write(file)? {
                return Ok(());
            }

            if !self.roll_on_file_size_limit {
                self.metrics.record_dropped();
                return Ok(());
            }

            self.align(state, now, true)?;
        }
    }

    /// Make sure the right file is open for `now`
    fn align(&self, state: &mut RollingState, now: NaiveDateTime, next_sequence: bool) -> Result<()> {
        let Some(deadline) = state.next_checkpoint else {
            return self.open(state, now, None);
        };

        if !next_sequence && now < deadline {
            return Ok(());
        }

        let min_sequence = next_sequence.then(|| state.sequence.map_or(1, |s| s + 1));
        Self::close_current(state)?;
        self.metrics.rolled();
        self.open(state, now, min_sequence)
    }

    fn close_current(state: &mut RollingState) -> Result<()> {
        state.next_checkpoint = None;
        match state.current.take() {
            Some(file) => Ok(file.close()?),
            None => Ok(()),
        }
    }

    fn open(
        &self,
        state: &mut RollingState,
        now: NaiveDateTime,
        min_sequence: Option<u32>,
    ) -> Result<()> {
        let checkpoint = self.roller.current_checkpoint(now);

        // Set before opening so a failing disk is retried once per deadline
        state.next_checkpoint = Some(self.roller.next_checkpoint(now).unwrap_or_else(|| {
            now.checked_add_signed(TimeDelta::minutes(RECHECK_MINUTES))
                .unwrap_or(NaiveDateTime::MAX)
        }));

        let existing = self.roller.list_candidates().unwrap_or_else(|e| {
            tracing::warn!(
                directory = %self.roller.directory().display(),
                error = %e,
                "failed to list existing log files"
            );
            Vec::new()
        });

        let latest = self
            .roller
            .select_matches(existing)
            .into_iter()
            .filter(|file| file.checkpoint == checkpoint)
            .map(|file| file.sequence)
            .max()
            .flatten();

        let mut sequence = match min_sequence {
            Some(min) if latest.is_none_or(|s| s < min) => Some(min),
            _ => latest,
        };

        for attempt in 1..=MAX_OPEN_ATTEMPTS {
            let path = self
                .roller
                .directory()
                .join(self.roller.file_name(checkpoint, sequence));

            match (self.open_file)(
                &path,
                self.options,
                self.hooks.as_ref(),
                Arc::clone(&self.metrics),
                Arc::clone(&self.drops),
            ) {
                Ok(file) => {
                    tracing::debug!(path = %path.display(), ?sequence, "rolled to log file");
                    state.current = Some(file);
                    state.sequence = sequence;
                    self.apply_retention(&path, now);
                    return Ok(());
                }
                Err(SinkError::Io(e)) if is_locked_file(&e) => {
                    if attempt == MAX_OPEN_ATTEMPTS {
                        return Err(SinkError::Locked {
                            path,
                            attempts: attempt,
                            source: e,
                        });
                    }
                    tracing::warn!(
                        path = %path.display(),
                        attempt,
                        "log file is locked, trying next in sequence"
                    );
                    sequence = Some(sequence.map_or(1, |s| s + 1));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }

    /// Delete files that fall outside the count or age limit
    ///
    /// Failures are logged and never reach the caller.
    fn apply_retention(&self, current: &Path, now: NaiveDateTime) {
        if self.retained_file_count_limit.is_none() && self.retained_file_time_limit.is_none() {
            return;
        }

        let Some(current_name) = current.file_name().and_then(OsStr::to_str) else {
            return;
        };

        let mut names = match self.roller.list_candidates() {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(
                    directory = %self.roller.directory().display(),
                    error = %e,
                    "failed to list log files for retention"
                );
                return;
            }
        };

        // The open file counts even before anything reaches the disk
        if !names.iter().any(|name| name == current_name) {
            names.push(current_name.to_string());
        }

        let mut files = self.roller.select_matches(names);
        files.sort_by(|a, b| b.cmp_age(a));

        let cutoff = self
            .retained_file_time_limit
            .and_then(|age| TimeDelta::from_std(age).ok())
            .and_then(|age| now.checked_sub_signed(age));

        let obsolete: Vec<String> = files
            .into_iter()
            .filter(|file| !file.filename.eq_ignore_ascii_case(current_name))
            .enumerate()
            .skip_while(|(index, file)| self.should_retain(file, *index, cutoff))
            .map(|(_, file)| file.filename)
            .collect();

        for name in obsolete {
            let path = self.roller.directory().join(&name);
            match self.remove_obsolete(&path) {
                Ok(()) => {
                    self.metrics.file_deleted();
                    tracing::debug!(path = %path.display(), "removed obsolete log file");
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to remove obsolete log file"
                    );
                }
            }
        }
    }

    fn should_retain(
        &self,
        file: &RollingLogFile,
        index: usize,
        cutoff: Option<NaiveDateTime>,
    ) -> bool {
        if let Some(limit) = self.retained_file_count_limit
            && index >= limit.saturating_sub(1)
        {
            return false;
        }

        if let Some(cutoff) = cutoff
            && let Some(checkpoint) = file.checkpoint
            && checkpoint < cutoff
        {
            return false;
        }

        true
    }

    /// Notify hooks, then delete; a hook failure keeps the file
    fn remove_obsolete(&self, path: &Path) -> io::Result<()> {
        if let Some(hooks) = &self.hooks {
            hooks.on_file_deleting(path)?;
        }
        fs::remove_file(path)
    }
}

impl LogSink for RollingFileSink {
    fn emit(&self, record: &dyn Record) -> Result<()> {
        let Some(mut state) = self.state.try_lock() else {
            return self.prerender_and_emit(record);
        };

        let now = record.timestamp().naive_local();
        self.emit_locked(&mut state, now, |file| file.emit_or_overflow(record))
    }

    fn flush_to_disk(&self) -> Result<()> {
        let mut state = self.state.lock();
        match state.current.as_mut() {
            Some(file) => Ok(file.flush_to_disk()?),
            None => Ok(()),
        }
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.closed = true;
        Self::close_current(&mut state)
    }

    fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Drop for RollingFileSink {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        state.closed = true;
        if let Err(e) = Self::close_current(state) {
            tracing::error!(
                directory = %self.roller.directory().display(),
                error = %e,
                "failed to close log file"
            );
        }
    }
}
