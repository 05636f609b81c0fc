//! rawfile - Sinks
//!
//! Buffered, rolling file sinks for pre-structured log records.
//!
//! # Architecture
//!
//! Records are rendered straight into pooled byte buffers and appended to
//! plain files. All work happens synchronously on the emitting thread; each
//! sink guards its state with a single lock and renders outside that lock
//! when it is contended.
//!
//! ```text
//! [Record] --> [RollingFileSink] --checkpoint/sequence--> [PathRoller]
//!                     |
//!                     v
//!               [BufferedFile] --buffer--> [FileWriter] --hooks--> [Disk]
//! ```
//!
//! # Available Sinks
//!
//! | Sink | Purpose | Rolls |
//! |------|---------|-------|
//! | `FileSink` | One file, optional size cap | No |
//! | `RollingFileSink` | Files per time checkpoint and size, with retention | Yes |
//!
//! # Example
//!
//! ```ignore
//! use rawfile_config::{RawFileConfig, RollingInterval};
//! use rawfile_sinks::{LogSink, TextRecord, build_sink};
//!
//! let config = RawFileConfig::new("logs/app-{Date}.log")
//!     .with_rolling_interval(RollingInterval::Day)
//!     .with_retained_file_count_limit(7);
//!
//! let sink = build_sink(&config, None)?;
//! sink.emit(&TextRecord::now("service started"))?;
//! sink.close()?;
//! ```

// =============================================================================
// Sink implementations
// =============================================================================

/// Single-file buffered sink, writers and lifecycle hooks
pub mod file;

/// Rolling orchestrator and path naming
pub mod rolling;

/// Timer-driven flush to disk around any sink
pub mod flush;

// =============================================================================
// Shared pieces
// =============================================================================

/// Buffer pool and rate-limited diagnostics
pub mod util;

/// Common types shared by all sinks (errors, metrics)
mod common;

mod record;
mod sink;

/// Hooks shared by the sink tests
#[cfg(test)]
mod test_utils;

// =============================================================================
// Public re-exports
// =============================================================================

pub use common::{MetricsSnapshot, Result, SinkError, SinkMetrics, is_locked_file};
pub use file::hooks::{FileLifecycleHook, FileOpened, HookChain, HookStream};
pub use file::{FileOptions, FileSink};
pub use flush::PeriodicFlush;
pub use record::{Record, TextRecord};
pub use rolling::RollingFileSink;
pub use rolling::roller::{PathRoller, RollingLogFile};
pub use sink::{LogSink, build_sink};
