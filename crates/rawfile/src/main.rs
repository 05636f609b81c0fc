//! rawfile - Pipe lines into buffered, rolling log files
//!
//! # Usage
//!
//! ```bash
//! # Append stdin to the configured file family
//! tail -f app.out | rawfile --config rawfile.toml write
//! rawfile write --path 'logs/app-{Date}.log' --interval day
//!
//! # Show which rolled files exist, newest first
//! rawfile --config rawfile.toml list
//! ```

mod cmd;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rawfile_config::{Config, LogFormat};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// rawfile - Pipe lines into buffered, rolling log files
#[derive(Parser, Debug)]
#[command(name = "rawfile")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write stdin, one record per line
    Write(cmd::write::WriteArgs),

    /// List rolled files for the configured template
    List(cmd::list::ListArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(config.log.level.as_str());
    init_logging(level, config.log.format)?;

    match cli.command {
        Command::Write(args) => cmd::write::run(args, config.file),
        Command::List(args) => cmd::list::run(args, config.file),
    }
}

/// Load the config file if one was given, defaults otherwise
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Initialize the tracing subscriber for diagnostics on stderr
///
/// Stdout stays free for command output.
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    match format {
        LogFormat::Console => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(io::stderr))
            .with(filter)
            .init(),
    }

    Ok(())
}
