//! Error types for the streaming engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while tailing the log file or serving subscribers.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The watched file exists but could not be read.
    #[error("log file unavailable: {path}: {source}")]
    FileUnavailable {
        /// Path of the watched file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The filesystem watch could not be established.
    #[error("failed to watch {path}: {reason}")]
    WatchSetup {
        /// Path that was being watched.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// The subscriber limit has been reached.
    #[error("too many subscribers: {0} active, limit is {1}")]
    TooManySubscribers(usize, usize),

    /// A background task failed to complete.
    #[error("background task failed: {0}")]
    Task(String),
}

/// Result type alias for streaming operations.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Reasons a subscriber's sink can reject a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The receiving side has gone away.
    #[error("subscriber sink closed")]
    Closed,

    /// The subscriber is not keeping up and its buffer is full.
    #[error("subscriber sink full")]
    Full,
}

impl StreamError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileUnavailable {
            path: path.into(),
            source,
        }
    }
}
