//! Tests for the single-file buffered sink

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rawfile_config::RawFileConfig;
use tempfile::TempDir;

use crate::file::hooks::{FileLifecycleHook, FileOpened, HookChain, HookStream};
use crate::file::{FileOptions, FileSink, MAX_IN_MEMORY_CAPACITY, QUARANTINE_WINDOW};
use crate::test_utils::{Flaky, Lz4Hook, read_lz4};
use crate::util::{BufferPool, MAX_CAPACITY};
use crate::{LogSink, SinkError, TextRecord};

fn unbuffered() -> FileOptions {
    FileOptions::default()
}

fn write_lines(sink: &FileSink, lines: &[&str]) {
    for line in lines {
        sink.emit(&TextRecord::now(*line)).unwrap();
    }
}

// ============================================================================
// Hooks used by the tests
// ============================================================================

/// Writes a header into empty files only
struct HeaderHook(&'static str);

impl FileLifecycleHook for HeaderHook {
    fn on_file_opened(
        &self,
        opened: &FileOpened<'_>,
        mut stream: Box<dyn HookStream>,
    ) -> io::Result<Box<dyn HookStream>> {
        if opened.file.metadata()?.len() == 0 {
            writeln!(stream, "{}", self.0)?;
            stream.flush()?;
        }
        Ok(stream)
    }
}

/// Discards whatever the file held before
struct TruncateHook;

impl FileLifecycleHook for TruncateHook {
    fn on_file_opened(
        &self,
        opened: &FileOpened<'_>,
        stream: Box<dyn HookStream>,
    ) -> io::Result<Box<dyn HookStream>> {
        opened.file.set_len(0)?;
        Ok(stream)
    }
}

/// Remembers which path was opened
#[derive(Default)]
struct CapturePath(Arc<Mutex<Option<PathBuf>>>);

impl FileLifecycleHook for CapturePath {
    fn on_file_opened(
        &self,
        opened: &FileOpened<'_>,
        stream: Box<dyn HookStream>,
    ) -> io::Result<Box<dyn HookStream>> {
        *self.0.lock() = Some(opened.path.to_path_buf());
        Ok(stream)
    }
}

// ============================================================================
// Basic writes
// ============================================================================

#[test]
fn test_file_is_written() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");

    let sink = FileSink::new(&path, unbuffered(), None).unwrap();
    write_lines(&sink, &["Hello, world!"]);
    sink.close().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "Hello, world!\n");
}

#[test]
fn test_reopened_file_is_appended() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");

    {
        let sink = FileSink::new(&path, unbuffered(), None).unwrap();
        write_lines(&sink, &["first"]);
    }
    {
        let sink = FileSink::new(&path, unbuffered(), None).unwrap();
        assert_eq!(sink.bytes_written().unwrap(), 6);
        write_lines(&sink, &["second"]);
    }

    assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
}

#[test]
fn test_missing_directory_is_created() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a").join("b").join("log.txt");

    let sink = FileSink::new(&path, unbuffered(), None).unwrap();
    write_lines(&sink, &["nested"]);
    drop(sink);

    assert_eq!(fs::read_to_string(&path).unwrap(), "nested\n");
}

#[test]
fn test_buffered_bytes_reach_disk_on_close() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let options = FileOptions {
        buffered: true,
        ..FileOptions::default()
    };

    let sink = FileSink::new(&path, options, None).unwrap();
    write_lines(&sink, &["one", "two"]);
    assert_eq!(fs::read(&path).unwrap().len(), 0);

    sink.close().unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
}

#[test]
fn test_flush_to_disk_writes_pending_bytes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let options = FileOptions {
        buffered: true,
        ..FileOptions::default()
    };

    let sink = FileSink::new(&path, options, None).unwrap();
    write_lines(&sink, &["pending"]);
    sink.flush_to_disk().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "pending\n");
}

#[test]
fn test_emit_after_close_fails() {
    let dir = TempDir::new().unwrap();
    let sink = FileSink::new(dir.path().join("log.txt"), unbuffered(), None).unwrap();
    sink.close().unwrap();

    let err = sink.emit(&TextRecord::now("late")).unwrap_err();
    assert!(matches!(err, SinkError::Closed));

    // Closing twice is harmless
    sink.close().unwrap();
}

// ============================================================================
// Size limit
// ============================================================================

#[test]
fn test_size_limit_restricts_growth() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let limit = 100;
    let options = FileOptions {
        file_size_limit_bytes: Some(limit),
        ..FileOptions::default()
    };

    let sink = FileSink::new(&path, options, None).unwrap();
    for _ in 0..50 {
        sink.emit(&TextRecord::now("123456789")).unwrap();
    }
    let metrics = sink.metrics();
    sink.close().unwrap();

    let size = fs::metadata(&path).unwrap().len();
    assert!(size >= limit);
    assert!(size < limit * 2);
    assert_eq!(metrics.records_written, 10);
    assert_eq!(metrics.records_dropped, 40);
}

#[test]
fn test_no_limit_allows_growth() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");

    let sink = FileSink::new(&path, unbuffered(), None).unwrap();
    for _ in 0..50 {
        sink.emit(&TextRecord::now("123456789")).unwrap();
    }
    sink.close().unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 500);
}

#[test]
fn test_buffered_flushes_when_limit_is_reached() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let options = FileOptions {
        file_size_limit_bytes: Some(25),
        buffered: true,
        ..FileOptions::default()
    };

    let sink = FileSink::new(&path, options, None).unwrap();
    for _ in 0..4 {
        sink.emit(&TextRecord::now("123456789")).unwrap();
    }

    // Third record crossed the limit and forced a flush; fourth was dropped
    assert_eq!(sink.bytes_written().unwrap(), 30);
    assert_eq!(sink.metrics().records_dropped, 1);
    sink.close().unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 30);
}

#[test]
fn test_zero_size_limit_is_rejected() {
    let dir = TempDir::new().unwrap();
    let options = FileOptions {
        file_size_limit_bytes: Some(0),
        ..FileOptions::default()
    };

    let err = FileSink::new(dir.path().join("log.txt"), options, None)
        .err()
        .unwrap();
    assert!(matches!(err, SinkError::Config(_)));
}

#[test]
fn test_from_config_validates() {
    let err = FileSink::from_config(&RawFileConfig::new(""), None)
        .err()
        .unwrap();
    assert!(matches!(err, SinkError::Config(_)));
}

// ============================================================================
// Lifecycle hooks
// ============================================================================

#[test]
fn test_hook_wraps_output_stream() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.lz4");
    let hooks = HookChain::new().with(Lz4Hook);

    let sink = FileSink::new(&path, unbuffered(), Some(&hooks)).unwrap();
    write_lines(&sink, &["compressed one", "compressed two"]);
    sink.close().unwrap();

    assert_eq!(read_lz4(&path), "compressed one\ncompressed two\n");
}

#[test]
fn test_header_hook_writes_header_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let hooks = HookChain::new().with(HeaderHook("# header"));

    for line in ["a", "b"] {
        let sink = FileSink::new(&path, unbuffered(), Some(&hooks)).unwrap();
        write_lines(&sink, &[line]);
        sink.close().unwrap();
    }

    assert_eq!(fs::read_to_string(&path).unwrap(), "# header\na\nb\n");
}

#[test]
fn test_truncate_hook_discards_existing_content() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    fs::write(&path, "stale content\n").unwrap();
    let hooks = HookChain::new().with(TruncateHook);

    let sink = FileSink::new(&path, unbuffered(), Some(&hooks)).unwrap();
    assert_eq!(sink.bytes_written().unwrap(), 0);
    write_lines(&sink, &["fresh"]);
    sink.close().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");
}

#[test]
fn test_hook_receives_file_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let captured = Arc::new(Mutex::new(None));
    let hooks = HookChain::new().with(CapturePath(Arc::clone(&captured)));

    let sink = FileSink::new(&path, unbuffered(), Some(&hooks)).unwrap();
    sink.close().unwrap();

    assert_eq!(captured.lock().as_deref(), Some(path.as_path()));
}

// ============================================================================
// Write faults
// ============================================================================

#[test]
fn test_write_fault_propagates_and_keeps_pending_bytes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let failing = Arc::new(AtomicBool::new(true));
    let hooks = HookChain::new().with(Flaky(Arc::clone(&failing)));

    let sink = FileSink::new(&path, unbuffered(), Some(&hooks)).unwrap();
    let err = sink.emit(&TextRecord::now("a")).unwrap_err();
    assert!(matches!(err, SinkError::Io(_)));

    failing.store(false, Ordering::SeqCst);
    write_lines(&sink, &["b"]);
    assert_eq!(sink.metrics().write_errors, 1);
    sink.close().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
}

fn quarantining() -> FileOptions {
    FileOptions {
        pause_on_error: true,
        ..FileOptions::default()
    }
}

#[test]
fn test_pause_on_error_holds_records_until_window_passes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let failing = Arc::new(AtomicBool::new(true));
    let hooks = HookChain::new().with(Flaky(Arc::clone(&failing)));

    let sink = FileSink::new(&path, quarantining(), Some(&hooks)).unwrap();

    // The fault itself is reported
    assert!(sink.emit(&TextRecord::now("a")).is_err());

    // Within the window the disk is left alone and records pile up
    failing.store(false, Ordering::SeqCst);
    write_lines(&sink, &["b"]);
    sink.flush_to_disk().unwrap();
    assert_eq!(fs::read(&path).unwrap().len(), 0);

    thread::sleep(QUARANTINE_WINDOW + Duration::from_millis(200));
    write_lines(&sink, &["c"]);

    let metrics = sink.metrics();
    assert_eq!(metrics.write_errors, 1);
    assert_eq!(metrics.bytes_discarded, 0);
    assert_eq!(metrics.records_written, 3);
    sink.close().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\nc\n");
}

#[test]
fn test_close_during_quarantine_discards_pending_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let failing = Arc::new(AtomicBool::new(true));
    let hooks = HookChain::new().with(Flaky(Arc::clone(&failing)));

    let sink = FileSink::new(&path, quarantining(), Some(&hooks)).unwrap();
    assert!(sink.emit(&TextRecord::now("a")).is_err());
    write_lines(&sink, &["b", "c"]);

    // Still failing and still quarantined: nothing reaches the file
    let _ = sink.close();
    let metrics = sink.metrics();
    assert_eq!(metrics.records_written, 0);
    assert_eq!(metrics.records_dropped, 3);
    assert_eq!(metrics.bytes_discarded, 6);
    assert_eq!(fs::read(&path).unwrap().len(), 0);
}

#[test]
fn test_quarantine_discards_past_memory_ceiling() {
    const CHUNK: usize = 1024 * 1024;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let failing = Arc::new(AtomicBool::new(true));
    let hooks = HookChain::new().with(Flaky(Arc::clone(&failing)));

    let sink = FileSink::new(&path, quarantining(), Some(&hooks)).unwrap();
    assert!(sink.emit(&TextRecord::now("a")).is_err());

    // Each record renders to CHUNK + 1 bytes; 2 bytes are already pending
    let big = TextRecord::now("x".repeat(CHUNK));
    let needed = (MAX_IN_MEMORY_CAPACITY - 2).div_ceil(CHUNK + 1);
    for _ in 0..needed {
        sink.emit(&big).unwrap();
    }

    let metrics = sink.metrics();
    assert_eq!(metrics.bytes_discarded, (2 + needed * (CHUNK + 1)) as u64);
    assert_eq!(metrics.records_dropped, needed as u64 + 1);

    // Below the ceiling again, the next record is held
    write_lines(&sink, &["after"]);
    assert_eq!(sink.metrics().records_dropped, needed as u64 + 1);
}

#[test]
fn test_failed_flush_outside_quarantine_keeps_bytes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let failing = Arc::new(AtomicBool::new(true));
    let hooks = HookChain::new().with(Flaky(Arc::clone(&failing)));

    let sink = FileSink::new(&path, unbuffered(), Some(&hooks)).unwrap();
    for text in ["a", "b"] {
        assert!(sink.emit(&TextRecord::now(text)).is_err());
    }
    assert_eq!(sink.metrics().write_errors, 2);
    assert_eq!(sink.metrics().records_written, 0);

    failing.store(false, Ordering::SeqCst);
    sink.flush_to_disk().unwrap();
    assert_eq!(sink.metrics().records_written, 2);
    sink.close().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
}

// ============================================================================
// Buffer reuse
// ============================================================================

#[test]
fn test_oversized_record_buffer_is_not_pooled() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let pool = BufferPool::global();

    let sink = FileSink::new(&path, unbuffered(), None).unwrap();
    let before = pool.metrics().snapshot();

    let text = "y".repeat(MAX_CAPACITY * 2);
    sink.emit(&TextRecord::now(text.as_str())).unwrap();
    write_lines(&sink, &["small"]);

    let after = pool.metrics().snapshot();
    sink.close().unwrap();

    // The grown buffer went back to the pool, which refused it, and a fresh
    // one was rented in its place
    assert!(after.drops > before.drops);
    assert!(after.hits + after.misses > before.hits + before.misses);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        format!("{text}\nsmall\n")
    );
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_emits_never_interleave() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 1_000;
    const LINE: &str = "the quick brown fox jumps over the lazy dog";

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let options = FileOptions {
        buffered: true,
        ..FileOptions::default()
    };
    let sink = Arc::new(FileSink::new(&path, options, None).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                for _ in 0..PER_THREAD {
                    sink.emit(&TextRecord::now(LINE)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    sink.close().unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), THREADS * PER_THREAD);
    assert!(lines.iter().all(|line| *line == LINE));
}
