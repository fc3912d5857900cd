use chrono::{DateTime, Local};

use crate::LogLevel;

pub const MAX_LOG_MESSAGE_SIZE: usize = 1024;
pub const MAX_THREAD_LABEL_SIZE: usize = 64;

/// Inline, fixed-capacity UTF-8 text. Longer input is cut at the last
/// char boundary that fits.
#[derive(Clone, Copy)]
pub struct FixedStr<const N: usize> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> FixedStr<N> {
    pub fn new(text: &str) -> Self {
        let mut end = text.len().min(N);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let mut bytes = [0u8; N];
        bytes[..end].copy_from_slice(&text.as_bytes()[..end]);
        Self { bytes, len: end }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len]).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> std::fmt::Debug for FixedStr<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

/// One log record. Copied by value into and out of the log queue, so it
/// carries no heap data.
#[derive(Clone, Copy, Debug)]
pub struct LogEntry {
    pub index: u64,
    pub level: LogLevel,
    pub timestamp: DateTime<Local>,
    thread_label: FixedStr<MAX_THREAD_LABEL_SIZE>,
    message: FixedStr<MAX_LOG_MESSAGE_SIZE>,
}

impl LogEntry {
    pub fn new(index: u64,
               level: LogLevel,
               thread_label: &str,
               message: &str
    ) -> Self {
        LogEntry {
            index,
            level,
            timestamp: Local::now(),
            thread_label: FixedStr::new(thread_label),
            message: FixedStr::new(message),
        }
    }

    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    pub fn thread_label(&self) -> &str {
        self.thread_label.as_str()
    }

    /// Entries without a thread label are rejected by the queue.
    pub fn is_valid(&self) -> bool {
        !self.thread_label.is_empty()
    }
}
