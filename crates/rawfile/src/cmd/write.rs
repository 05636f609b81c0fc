//! Write command - append stdin to the configured sink
//!
//! Every line becomes one record stamped with the local time it was read.
//! The sink is flushed and closed at end of input.
//!
//! # Usage
//!
//! ```bash
//! my-service | rawfile write --path 'logs/app-{Date}.log' --interval day
//! tail -f app.out | rawfile write --buffered --flush-interval 1s
//! ```

use std::io::{self, BufRead};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use rawfile_config::RawFileConfig;
use rawfile_sinks::{TextRecord, build_sink};

use super::{FileOverrides, parse_duration};

/// Write command arguments
#[derive(Args, Debug)]
pub struct WriteArgs {
    #[command(flatten)]
    file: FileOverrides,

    /// Batch small writes in memory (flushed at exit)
    #[arg(short, long)]
    buffered: bool,

    /// Also flush pending records to disk this often, e.g. `1s`
    #[arg(short, long, value_parser = parse_duration)]
    flush_interval: Option<Duration>,
}

/// Run the write command
pub fn run(args: WriteArgs, config: RawFileConfig) -> Result<()> {
    let mut config = args.file.apply(config);
    config.buffered |= args.buffered;
    if let Some(interval) = args.flush_interval {
        config.flush_to_disk_interval = Some(interval);
    }

    let sink = build_sink(&config, None)
        .with_context(|| format!("failed to open sink for {}", config.path.display()))?;

    let mut lines = 0u64;
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        lines += 1;

        if let Err(e) = sink.emit(&TextRecord::now(line)) {
            // With pause-on-error the sink recovers by itself
            if !config.pause_on_error {
                return Err(e).context("failed to write record");
            }
            tracing::warn!(error = %e, "write failed, continuing");
        }
    }

    sink.flush_to_disk().context("failed to flush")?;
    sink.close().context("failed to close")?;

    let metrics = sink.metrics();
    tracing::info!(
        lines,
        written = metrics.records_written,
        dropped = metrics.records_dropped,
        bytes = metrics.bytes_flushed,
        rolls = metrics.rolls,
        deleted = metrics.files_deleted,
        "input exhausted"
    );

    Ok(())
}
