//! Core types shared by the tailing and streaming components.
//!
//! This module provides:
//! - [`LogLine`] — One complete record read from the watched file
//! - [`ReadCursor`] — Byte offset of content already handed out
//! - [`SubscriberId`] — Identity of a connected subscriber
//! - [`SessionState`] — Lifecycle of a subscriber's stream

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Text of the informational line sent when there is no log file yet.
pub const NO_HISTORY_MESSAGE: &str = r#"{"info": "No previous logs found"}"#;

/// One complete, separator-terminated record from the watched file.
///
/// The separator itself is not part of the payload and a trailing carriage
/// return is stripped. Cloning is cheap; the text is shared between every
/// subscriber that receives the line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LogLine(Arc<str>);

impl LogLine {
    /// Creates a line from raw record text.
    ///
    /// Any trailing `\r` is removed. Callers must not pass text containing
    /// `\n`; [`crate::LineSource`] guarantees this for lines it reads.
    #[must_use]
    pub fn new(text: impl AsRef<str>) -> Self {
        let text = text.as_ref();
        Self(Arc::from(text.strip_suffix('\r').unwrap_or(text)))
    }

    /// The sentinel line sent in place of history when no file exists.
    #[must_use]
    pub fn sentinel() -> Self {
        Self::new(NO_HISTORY_MESSAGE)
    }

    /// Returns the record text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this is the no-history sentinel.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.as_str() == NO_HISTORY_MESSAGE
    }
}

impl AsRef<str> for LogLine {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for LogLine {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Byte offset into the watched file up to which every line has been
/// delivered, either through history replay or the live feed.
///
/// The offset always sits just after a record separator (or at zero).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ReadCursor(u64);

impl ReadCursor {
    /// Creates a cursor at the given offset.
    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self(offset)
    }

    /// Returns the byte offset.
    #[must_use]
    pub const fn offset(self) -> u64 {
        self.0
    }

    /// Moves the cursor forward. Smaller offsets are ignored.
    pub fn advance_to(&mut self, offset: u64) {
        self.0 = self.0.max(offset);
    }

    /// Moves the cursor back to the start of the file after truncation.
    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

impl fmt::Display for ReadCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a connected subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Lifecycle of a single subscriber's stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Identity allocated, nothing sent yet.
    Connecting,
    /// Sending lines that existed before the subscriber registered.
    ReplayingHistory,
    /// Forwarding lines broadcast by the watcher.
    Live,
    /// Disconnected; terminal.
    Closed,
}

impl SessionState {
    /// Returns true once the session can no longer deliver lines.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}
