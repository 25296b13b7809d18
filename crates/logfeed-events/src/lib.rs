//! # logfeed-events
//!
//! Synthetic payment events and the JSON-lines logger that appends them to
//! the files watched by `logfeed-core`.
//!
//! This crate provides:
//!
//! - [`PaymentRecord`] — One payment event
//! - [`EventGenerator`] — Seedable random record source
//! - [`RecordLogger`] — Combined and error log writer

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod generator;
pub mod logger;
pub mod record;

pub use error::{EventError, Result};
pub use generator::{EventGenerator, SERVICE_NAME};
pub use logger::{DEFAULT_SERVICE_NAME, RecordLogger, RecordLoggerConfig};
pub use record::{PaymentMode, PaymentRecord, PaymentStatus, RecordLevel};
