//! File lifecycle hooks
//!
//! Hooks let third-party code take part in a file's life without touching the
//! engine: wrap the output stream when a file is opened (compression,
//! encryption, headers) and hear about a file before retention deletes it
//! (archiving).
//!
//! Several hooks compose into a [`HookChain`]. On open the chain folds left
//! to right: the first hook receives the raw file stream, each later hook
//! receives the previous hook's result. Deletion notices reach every hook in
//! the same order even when an earlier one fails.
//!
//! # Example
//!
//! ```ignore
//! struct Header;
//!
//! impl FileLifecycleHook for Header {
//!     fn on_file_opened(
//!         &self,
//!         opened: &FileOpened<'_>,
//!         stream: Box<dyn HookStream>,
//!     ) -> io::Result<Box<dyn HookStream>> {
//!         if opened.file.metadata()?.len() == 0 {
//!             (&*opened.file).write_all(b"# header\n")?;
//!         }
//!         Ok(stream)
//!     }
//! }
//!
//! let hooks = HookChain::new().with(Header).with(Compress::default());
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use rawfile_config::Encoding;

/// An output stream produced by the hook chain
pub trait HookStream: Write + Send {
    /// Flush and finalize the stream (e.g., write a compression trailer)
    ///
    /// Called once when the file is closed.
    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.flush()
    }
}

impl HookStream for File {}

/// What a hook can see about a file that was just opened
pub struct FileOpened<'a> {
    /// Path of the opened file
    pub path: &'a Path,

    /// The underlying file, positioned for appending
    ///
    /// Hooks may inspect its length, append a header or truncate it; writes
    /// through `&File` always land at the current end of file.
    pub file: &'a File,

    /// Encoding of the records that will be written
    pub encoding: Encoding,
}

/// Extension points around a file's lifetime
pub trait FileLifecycleHook: Send + Sync {
    /// Wrap (or return unchanged) the stream records will be written to
    ///
    /// An error is fatal for the open: the file is not used.
    fn on_file_opened(
        &self,
        opened: &FileOpened<'_>,
        stream: Box<dyn HookStream>,
    ) -> io::Result<Box<dyn HookStream>> {
        let _ = opened;
        Ok(stream)
    }

    /// Called before retention removes `path`; best effort
    fn on_file_deleting(&self, path: &Path) -> io::Result<()> {
        let _ = path;
        Ok(())
    }
}

/// Ordered composition of lifecycle hooks
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn FileLifecycleHook>>,
}

impl HookChain {
    /// An empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook to the end of the chain
    #[must_use]
    pub fn with(mut self, hook: impl FileLifecycleHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Append an already shared hook
    pub fn push(&mut self, hook: Arc<dyn FileLifecycleHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl FileLifecycleHook for HookChain {
    fn on_file_opened(
        &self,
        opened: &FileOpened<'_>,
        stream: Box<dyn HookStream>,
    ) -> io::Result<Box<dyn HookStream>> {
        self.hooks
            .iter()
            .try_fold(stream, |stream, hook| hook.on_file_opened(opened, stream))
    }

    fn on_file_deleting(&self, path: &Path) -> io::Result<()> {
        let mut first_error = None;

        for (index, hook) in self.hooks.iter().enumerate() {
            if let Err(e) = hook.on_file_deleting(path) {
                tracing::warn!(
                    path = %path.display(),
                    hook = index,
                    error = %e,
                    "lifecycle hook failed on file deletion"
                );
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl FromIterator<Arc<dyn FileLifecycleHook>> for HookChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn FileLifecycleHook>>>(iter: I) -> Self {
        Self {
            hooks: iter.into_iter().collect(),
        }
    }
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookChain")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "hooks_test.rs"]
mod hooks_test;
