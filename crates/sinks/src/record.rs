//! Records accepted by the sinks
//!
//! The engine never inspects a record beyond its timestamp, which picks the
//! rolling checkpoint, and its ability to render itself into a byte buffer.

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, Local};

/// A structured log record ready to be persisted
pub trait Record {
    /// When the record was produced; selects the destination file
    fn timestamp(&self) -> DateTime<Local>;

    /// Append the serialized record to `buf`
    fn format(&self, buf: &mut BytesMut);
}

impl<R: Record + ?Sized> Record for &R {
    fn timestamp(&self) -> DateTime<Local> {
        (**self).timestamp()
    }

    fn format(&self, buf: &mut BytesMut) {
        (**self).format(buf)
    }
}

/// A line of text, written followed by `\n`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRecord {
    timestamp: DateTime<Local>,
    text: String,
}

impl TextRecord {
    pub fn new(timestamp: DateTime<Local>, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
        }
    }

    /// A record stamped with the current local time
    pub fn now(text: impl Into<String>) -> Self {
        Self::new(Local::now(), text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Record for TextRecord {
    fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    fn format(&self, buf: &mut BytesMut) {
        buf.reserve(self.text.len() + 1);
        buf.put_slice(self.text.as_bytes());
        buf.put_u8(b'\n');
    }
}
