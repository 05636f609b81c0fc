//! List command - show rolled files recognized for a template
//!
//! # Usage
//!
//! ```bash
//! rawfile list --path 'logs/app-{Date}.log' --interval day
//! ```

use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use rawfile_config::{RawFileConfig, validate_file};
use rawfile_sinks::PathRoller;

use super::FileOverrides;

/// List command arguments
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    file: FileOverrides,
}

/// Run the list command
pub fn run(args: ListArgs, config: RawFileConfig) -> Result<()> {
    let config = args.file.apply(config);
    validate_file(&config)?;

    let roller = PathRoller::new(&config.path, config.rolling_interval)?;
    let names = roller
        .list_candidates()
        .with_context(|| format!("failed to list {}", roller.directory().display()))?;

    let mut files = roller.select_matches(names);
    files.sort_by(|a, b| b.cmp_age(a));

    let mut out = io::stdout().lock();
    for file in files {
        let size = fs::metadata(roller.directory().join(&file.filename))
            .map(|meta| meta.len())
            .unwrap_or(0);
        let checkpoint = file
            .checkpoint
            .map(|c| c.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let sequence = file
            .sequence
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());

        writeln!(
            out,
            "{:<40} {:>16} {:>5} {:>12}",
            file.filename, checkpoint, sequence, size
        )?;
    }

    Ok(())
}
