//! Path Roller - naming scheme for rolled files
//!
//! A template such as `logs/app-{Date}.log` splits into a directory, a
//! filename prefix (`app-`) and a suffix (`.log`). Each file is named
//!
//! ```text
//! prefix + checkpoint + ["_" + sequence] + suffix
//! app-   20240115     _002               .log
//! ```
//!
//! Without the `{Date}` placeholder the checkpoint goes before the
//! extension (`app.log` -> `app20240115.log`). The checkpoint is rendered at
//! a fixed width per interval and the sequence with at least three digits,
//! so a name parses back into exactly the pair that produced it.
//!
//! Matching is ASCII case-insensitive on prefix and suffix. Names that do not
//! fit the scheme are skipped, never reported as errors.

use std::cmp::Ordering;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rawfile_config::RollingInterval;

use crate::common::{Result, SinkError};

/// Placeholder marking where the checkpoint goes in a template
pub const DATE_PLACEHOLDER: &str = "{Date}";

/// Minimum digits of a rendered sequence number
const SEQUENCE_DIGITS: usize = 3;

/// A file recognized by the roller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingLogFile {
    /// File name without directory
    pub filename: String,

    /// Checkpoint encoded in the name; `None` for infinite rolling
    pub checkpoint: Option<NaiveDateTime>,

    /// Sequence number; `None` for the primary file of a checkpoint
    pub sequence: Option<u32>,
}

impl RollingLogFile {
    /// Order by checkpoint, then sequence; absent values sort first
    pub fn cmp_age(&self, other: &Self) -> Ordering {
        self.checkpoint
            .cmp(&other.checkpoint)
            .then(self.sequence.cmp(&other.sequence))
    }
}

/// Maps (checkpoint, sequence) pairs to paths and back
#[derive(Debug, Clone)]
pub struct PathRoller {
    directory: PathBuf,
    prefix: String,
    suffix: String,
    interval: RollingInterval,
}

impl PathRoller {
    pub fn new(template: impl AsRef<Path>, interval: RollingInterval) -> Result<Self> {
        let template = template.as_ref();
        let filename = template
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or_else(|| {
                SinkError::config(format!(
                    "path template '{}' must end in a UTF-8 file name",
                    template.display()
                ))
            })?;

        let directory = match template.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (prefix, suffix) = match filename.split_once(DATE_PLACEHOLDER) {
            Some(parts) => parts,
            None => match filename.rfind('.') {
                Some(dot) if dot > 0 => filename.split_at(dot),
                _ => (filename, ""),
            },
        };

        Ok(Self {
            directory,
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            interval,
        })
    }

    /// Directory all rolled files live in
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn interval(&self) -> RollingInterval {
        self.interval
    }

    /// Glob matching every candidate name (`prefix*suffix`)
    pub fn directory_search_pattern(&self) -> String {
        format!("{}*{}", self.prefix, self.suffix)
    }

    /// Checkpoint of the file that should receive records stamped `instant`
    pub fn current_checkpoint(&self, instant: NaiveDateTime) -> Option<NaiveDateTime> {
        self.interval.current_checkpoint(instant)
    }

    /// Instant at which the file for `instant` stops being current
    pub fn next_checkpoint(&self, instant: NaiveDateTime) -> Option<NaiveDateTime> {
        self.interval.next_checkpoint(instant)
    }

    /// Name of the file for `checkpoint` and `sequence`
    pub fn file_name(&self, checkpoint: Option<NaiveDateTime>, sequence: Option<u32>) -> String {
        let mut name = self.prefix.clone();
        if let Some(checkpoint) = checkpoint {
            name.push_str(&self.interval.render(checkpoint));
        }
        if let Some(sequence) = sequence {
            name.push_str(&format!("_{:0width$}", sequence, width = SEQUENCE_DIGITS));
        }
        name.push_str(&self.suffix);
        name
    }

    /// Path of the file receiving records stamped `instant`
    pub fn path_for(&self, instant: NaiveDateTime, sequence: Option<u32>) -> PathBuf {
        let checkpoint = self.current_checkpoint(instant);
        self.directory.join(self.file_name(checkpoint, sequence))
    }

    /// Names in the directory matching the search pattern
    ///
    /// A missing directory yields an empty list.
    pub fn list_candidates(&self) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && self.middle(name).is_some()
            {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Parse every name that fits the scheme, skipping the rest
    pub fn select_matches<I, S>(&self, filenames: I) -> Vec<RollingLogFile>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        filenames
            .into_iter()
            .filter_map(|name| self.parse(name.as_ref()))
            .collect()
    }

    /// Recover (checkpoint, sequence) from a file name
    pub fn parse(&self, filename: &str) -> Option<RollingLogFile> {
        let middle = self.middle(filename)?;

        let width = self.interval.checkpoint_width();
        let checkpoint = match width {
            0 => None,
            _ => Some(self.interval.parse(middle.get(..width)?)?),
        };

        let rest = middle.get(width..)?;
        let sequence = match rest.strip_prefix('_') {
            None if rest.is_empty() => None,
            None => return None,
            Some(digits) => Some(parse_sequence(digits)?),
        };

        Some(RollingLogFile {
            filename: filename.to_string(),
            checkpoint,
            sequence,
        })
    }

    /// The part between prefix and suffix, if both match
    fn middle<'a>(&self, filename: &'a str) -> Option<&'a str> {
        if filename.len() < self.prefix.len() + self.suffix.len() {
            return None;
        }

        let head = filename.get(..self.prefix.len())?;
        let tail = filename.get(filename.len() - self.suffix.len()..)?;
        if !head.eq_ignore_ascii_case(&self.prefix) || !tail.eq_ignore_ascii_case(&self.suffix) {
            return None;
        }

        filename.get(self.prefix.len()..filename.len() - self.suffix.len())
    }
}

fn parse_sequence(digits: &str) -> Option<u32> {
    if digits.len() < SEQUENCE_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
#[path = "roller_test.rs"]
mod roller_test;
