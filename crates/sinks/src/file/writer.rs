//! File writers
//!
//! Two strategies turn a byte span into persisted bytes for one file:
//!
//! - [`HandleWriter`] appends through a plain handle. With `keep_file_open`
//!   the handle lives as long as the writer; without it every write reopens
//!   the file, appends at its current on-disk length and closes it again,
//!   which survives third parties replacing or rotating the file underneath.
//! - [`StreamWriter`] appends through a stream that lifecycle hooks may wrap
//!   (compression, headers). Required whenever hooks are configured.
//!
//! The strategy is fixed when the file is opened and never changes.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rawfile_config::Encoding;

use super::hooks::{FileLifecycleHook, FileOpened, HookChain, HookStream};
use crate::common::{Result, SinkError};

/// Writer for a single open file
pub enum FileWriter {
    /// Positional appends through a raw handle
    Handle(HandleWriter),
    /// Sequential writes through a (possibly wrapped) stream
    Stream(StreamWriter),
}

impl FileWriter {
    /// Open `path`, picking the stream strategy iff `hooks` is non-empty
    ///
    /// Returns the writer and the file's length after opening.
    pub fn open(
        path: &Path,
        hooks: Option<&HookChain>,
        keep_file_open: bool,
        encoding: Encoding,
    ) -> Result<(Self, u64)> {
        match hooks.filter(|chain| !chain.is_empty()) {
            Some(chain) => {
                let (writer, length) = StreamWriter::open(path, chain, encoding)?;
                Ok((Self::Stream(writer), length))
            }
            None => {
                let (writer, length) = HandleWriter::open(path, keep_file_open)?;
                Ok((Self::Handle(writer), length))
            }
        }
    }

    /// Persist `bytes`, returning the file's new total length
    pub fn write(&mut self, bytes: &[u8]) -> io::Result<u64> {
        match self {
            Self::Handle(writer) => writer.write(bytes),
            Self::Stream(writer) => writer.write(bytes),
        }
    }

    /// Force written bytes to durable storage
    pub fn flush_to_disk(&mut self) -> io::Result<()> {
        match self {
            Self::Handle(writer) => writer.flush_to_disk(),
            Self::Stream(writer) => writer.flush_to_disk(),
        }
    }

    /// Release the handle or finish the stream
    pub fn close(self) -> io::Result<()> {
        match self {
            Self::Handle(_) => Ok(()),
            Self::Stream(writer) => writer.close(),
        }
    }

    /// Short name of the strategy, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Handle(writer) if writer.handle.is_some() => "handle",
            Self::Handle(_) => "transient-handle",
            Self::Stream(_) => "stream",
        }
    }
}

/// Appends through a raw file handle
///
/// A kept handle tracks the length from the value seen at open; a transient
/// handle reads it again on every write.
pub struct HandleWriter {
    path: PathBuf,
    handle: Option<File>,
    length: u64,
}

impl HandleWriter {
    /// Open (creating if needed) `path` for appending
    pub fn open(path: &Path, keep_file_open: bool) -> io::Result<(Self, u64)> {
        let handle = open_append(path)?;
        let length = handle.metadata()?.len();

        let handle = if keep_file_open {
            Some(handle)
        } else {
            drop(handle);
            None
        };

        Ok((
            Self {
                path: path.to_path_buf(),
                handle,
                length,
            },
            length,
        ))
    }

    pub fn write(&mut self, bytes: &[u8]) -> io::Result<u64> {
        match &mut self.handle {
            Some(file) => file.write_all(bytes)?,
            None => {
                let mut file = open_append(&self.path)?;
                self.length = file.metadata()?.len();
                file.write_all(bytes)?;
            }
        }
        self.length += bytes.len() as u64;
        Ok(self.length)
    }

    pub fn flush_to_disk(&mut self) -> io::Result<()> {
        match &self.handle {
            Some(file) => file.sync_data(),
            None => Ok(()),
        }
    }
}

/// Sequential writer whose output may be wrapped by hooks
pub struct StreamWriter {
    /// Underlying file, kept for syncing to disk
    file: File,
    output: Box<dyn HookStream>,
    written: u64,
}

impl StreamWriter {
    /// Open `path` and pass its stream through `hooks`
    pub fn open(path: &Path, hooks: &HookChain, encoding: Encoding) -> Result<(Self, u64)> {
        let file = open_append(path)?;
        let raw: Box<dyn HookStream> = Box::new(file.try_clone()?);

        let opened = FileOpened {
            path,
            file: &file,
            encoding,
        };
        let output = hooks
            .on_file_opened(&opened, raw)
            .map_err(|source| SinkError::Hook {
                path: path.to_path_buf(),
                source,
            })?;

        // Hooks may have written a header or truncated the file
        let length = file.metadata()?.len();

        Ok((
            Self {
                file,
                output,
                written: length,
            },
            length,
        ))
    }

    pub fn write(&mut self, bytes: &[u8]) -> io::Result<u64> {
        self.output.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(self.written)
    }

    pub fn flush_to_disk(&mut self) -> io::Result<()> {
        self.output.flush()?;
        self.file.sync_all()
    }

    pub fn close(self) -> io::Result<()> {
        self.output.finish()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
