//! JSON-lines record logger.
//!
//! Records are appended to a combined log (every level) and an error log
//! (errors only). Each write is a single complete line so concurrent
//! emitters never produce interleaved or partial records on disk.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::record::{PaymentRecord, RecordLevel};

/// Default metadata service name merged into every line.
pub const DEFAULT_SERVICE_NAME: &str = "Realtime log streaming service";

/// Configuration for [`RecordLogger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLoggerConfig {
    /// Directory holding the log files.
    pub dir: PathBuf,
    /// File receiving every record at or above `min_level`.
    pub combined_file: String,
    /// File receiving error records.
    pub error_file: String,
    /// Service name used when a record carries none.
    pub default_service: String,
    /// Records below this level are dropped.
    pub min_level: RecordLevel,
}

impl Default for RecordLoggerConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            combined_file: "combined.log".to_string(),
            error_file: "error.log".to_string(),
            default_service: DEFAULT_SERVICE_NAME.to_string(),
            min_level: RecordLevel::Info,
        }
    }
}

impl RecordLoggerConfig {
    /// Creates a configuration rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    /// Sets the combined log file name.
    #[must_use]
    pub fn with_combined_file(mut self, name: impl Into<String>) -> Self {
        self.combined_file = name.into();
        self
    }

    /// Sets the error log file name.
    #[must_use]
    pub fn with_error_file(mut self, name: impl Into<String>) -> Self {
        self.error_file = name.into();
        self
    }

    /// Sets the minimum level written.
    #[must_use]
    pub const fn with_min_level(mut self, level: RecordLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Path of the combined log.
    #[must_use]
    pub fn combined_path(&self) -> PathBuf {
        self.dir.join(&self.combined_file)
    }

    /// Path of the error log.
    #[must_use]
    pub fn error_path(&self) -> PathBuf {
        self.dir.join(&self.error_file)
    }
}

/// Appends structured records as JSON lines.
#[derive(Debug)]
pub struct RecordLogger {
    config: RecordLoggerConfig,
    write_lock: Mutex<()>,
}

impl RecordLogger {
    /// Creates a logger. Files are opened lazily on each write.
    #[must_use]
    pub fn new(config: RecordLoggerConfig) -> Self {
        Self {
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RecordLoggerConfig {
        &self.config
    }

    /// Writes a payment record at its own level.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the append fails.
    pub fn log_record(&self, record: &PaymentRecord) -> Result<()> {
        self.log(record.level, record)
    }

    /// Writes any serializable value at `level`.
    ///
    /// Objects are merged with the default metadata; other values are
    /// stored under `message`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the append fails.
    pub fn log<T: Serialize + ?Sized>(&self, level: RecordLevel, value: &T) -> Result<()> {
        if level < self.config.min_level {
            return Ok(());
        }

        let entry = self.build_entry(level, serde_json::to_value(value)?);
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        echo(level, &entry);

        let _guard = self.write_lock.lock();
        fs::create_dir_all(&self.config.dir)?;
        append_line(&self.config.combined_path(), &line)?;
        if level == RecordLevel::Error {
            append_line(&self.config.error_path(), &line)?;
        }
        Ok(())
    }

    fn build_entry(&self, level: RecordLevel, value: Value) -> Map<String, Value> {
        let mut entry = Map::new();
        entry.insert(
            "serviceName".to_string(),
            Value::String(self.config.default_service.clone()),
        );

        match value {
            Value::Object(fields) => entry.extend(fields),
            other => {
                entry.insert("message".to_string(), other);
            }
        }

        entry.insert("level".to_string(), Value::String(level.as_str().to_string()));
        entry.entry("timestamp").or_insert_with(|| {
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
        });
        entry
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file: File = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

fn echo(level: RecordLevel, entry: &Map<String, Value>) {
    let message = entry
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let service = entry
        .get("serviceName")
        .and_then(Value::as_str)
        .unwrap_or_default();

    match level {
        RecordLevel::Info => info!(service, "{message}"),
        RecordLevel::Warn => warn!(service, "{message}"),
        RecordLevel::Error => error!(service, "{message}"),
    }
    debug!(fields = entry.len(), "Record appended");
}
