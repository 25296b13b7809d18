//! Error types for record generation and logging.

use thiserror::Error;

/// Errors that can occur while writing records.
#[derive(Debug, Error)]
pub enum EventError {
    /// Serialization of a record failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred while appending to a log file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for event operations.
pub type Result<T> = std::result::Result<T, EventError>;
