//! Hooks shared by the sink tests

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lz4_flex::frame::{FrameDecoder, FrameEncoder};

use crate::file::hooks::{FileLifecycleHook, FileOpened, HookStream};

/// Compresses the file with LZ4 frames
pub struct Lz4Hook;

struct Lz4Stream(FrameEncoder<Box<dyn HookStream>>);

impl Write for Lz4Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl HookStream for Lz4Stream {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let inner = self.0.finish().map_err(io::Error::other)?;
        inner.finish()
    }
}

impl FileLifecycleHook for Lz4Hook {
    fn on_file_opened(
        &self,
        _opened: &FileOpened<'_>,
        stream: Box<dyn HookStream>,
    ) -> io::Result<Box<dyn HookStream>> {
        Ok(Box::new(Lz4Stream(FrameEncoder::new(stream))))
    }
}

/// Decompress a file written through [`Lz4Hook`]
pub fn read_lz4(path: &Path) -> String {
    let mut decoder = FrameDecoder::new(fs::File::open(path).unwrap());
    let mut text = String::new();
    decoder.read_to_string(&mut text).unwrap();
    text
}

/// Fails every write while the switch is on
pub struct Flaky(pub Arc<AtomicBool>);

struct FlakyStream {
    failing: Arc<AtomicBool>,
    inner: Box<dyn HookStream>,
}

impl Write for FlakyStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(io::Error::other("disk unavailable"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl HookStream for FlakyStream {
    fn finish(self: Box<Self>) -> io::Result<()> {
        self.inner.finish()
    }
}

impl FileLifecycleHook for Flaky {
    fn on_file_opened(
        &self,
        _opened: &FileOpened<'_>,
        stream: Box<dyn HookStream>,
    ) -> io::Result<Box<dyn HookStream>> {
        Ok(Box::new(FlakyStream {
            failing: Arc::clone(&self.0),
            inner: stream,
        }))
    }
}
