//! Incremental extraction of complete lines from a growing file.
//!
//! [`LineSource`] knows nothing about subscribers or cursors; callers pass
//! the offset they last reached and get back the complete lines after it
//! together with the offset to resume from. Bytes after the final record
//! separator are held back until their separator arrives.

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{trace, warn};

use crate::error::{Result, StreamError};
use crate::types::LogLine;

/// Record separator of the watched file.
pub const RECORD_SEPARATOR: u8 = b'\n';

/// Lines extracted by one [`LineSource::extract_new`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    /// Complete lines in file order.
    pub lines: Vec<LogLine>,
    /// Offset just past the last separator consumed.
    pub new_offset: u64,
    /// The previous offset was beyond the end of the file and was reset.
    pub truncated: bool,
}

/// Reads newly appended lines from one file.
#[derive(Debug, Clone)]
pub struct LineSource {
    path: PathBuf,
}

impl LineSource {
    /// Creates a source for the given path. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the watched path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current byte length of the file, or `None` if it does
    /// not exist.
    pub fn current_size(&self) -> Result<Option<u64>> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StreamError::unavailable(&self.path, e)),
        }
    }

    /// Extracts the complete lines in `[previous_offset, current_size)`.
    ///
    /// A `previous_offset` past `current_size` means the file was truncated
    /// or replaced; reading then restarts from offset zero.
    pub fn extract_new(&self, previous_offset: u64, current_size: u64) -> Result<Extracted> {
        let truncated = previous_offset > current_size;
        let start = if truncated {
            warn!(
                path = %self.path.display(),
                previous_offset,
                current_size,
                "Log file shrank, re-reading from start"
            );
            0
        } else {
            previous_offset
        };

        if start >= current_size {
            return Ok(Extracted {
                lines: Vec::new(),
                new_offset: start,
                truncated,
            });
        }

        let buf = self.read_range(start, current_size)?;
        let (lines, consumed) = split_complete_lines(&buf);

        trace!(
            path = %self.path.display(),
            start,
            read = buf.len(),
            consumed,
            lines = lines.len(),
            "Extracted lines"
        );

        Ok(Extracted {
            lines,
            new_offset: start + consumed as u64,
            truncated,
        })
    }

    /// Reads every complete line in `[0, upto)`.
    pub fn read_history(&self, upto: u64) -> Result<Vec<LogLine>> {
        Ok(self.extract_new(0, upto)?.lines)
    }

    /// Reads at most `end - start` bytes beginning at `start`.
    ///
    /// A file removed between the size check and the read yields no bytes.
    fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StreamError::unavailable(&self.path, e)),
        };

        let len = end - start;
        let mut buf = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
        file.seek(SeekFrom::Start(start))
            .map_err(|e| StreamError::unavailable(&self.path, e))?;
        file.take(len)
            .read_to_end(&mut buf)
            .map_err(|e| StreamError::unavailable(&self.path, e))?;
        Ok(buf)
    }
}

/// Splits `buf` into complete lines.
///
/// Returns the lines and the number of bytes they span, separators
/// included. Whitespace-only lines are consumed but not returned.
pub(crate) fn split_complete_lines(buf: &[u8]) -> (Vec<LogLine>, usize) {
    let Some(last) = buf.iter().rposition(|&b| b == RECORD_SEPARATOR) else {
        return (Vec::new(), 0);
    };

    let lines = buf[..last]
        .split(|&b| b == RECORD_SEPARATOR)
        .map(String::from_utf8_lossy)
        .filter(|line| !line.trim().is_empty())
        .map(LogLine::new)
        .collect();

    (lines, last + 1)
}
