//! # logfeed-core
//!
//! Log tailing and multi-subscriber streaming engine.
//!
//! This crate provides:
//!
//! - [`LineSource`] — Extracts complete lines appended since a known offset
//! - [`FileWatcher`] — Owns the [`ReadCursor`] and reacts to file growth
//! - [`SubscriberRegistry`] — Tracks subscribers and fans lines out
//! - [`StreamSession`] — One subscriber's history-then-live stream
//! - [`StreamingEngine`] — Wires the above into a subscription service
//!
//! ## Example
//!
//! ```rust,no_run
//! use logfeed_core::{EngineConfig, StreamingEngine};
//!
//! # async fn run() -> logfeed_core::Result<()> {
//! let engine = StreamingEngine::new(EngineConfig::new("logs/combined.log"));
//! engine.start()?;
//!
//! let mut session = engine.subscribe().await?;
//! while let Some(line) = session.next_line().await {
//!     println!("{line}");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod line_source;
pub mod registry;
pub mod session;
pub mod types;
pub mod watcher;

// Re-export main types
pub use config::EngineConfig;
pub use engine::StreamingEngine;
pub use error::{Result, SinkError, StreamError};
pub use line_source::{Extracted, LineSource};
pub use registry::{LineSink, Liveness, Subscriber, SubscriberRegistry, SubscriberToken};
pub use session::StreamSession;
pub use types::{LogLine, ReadCursor, SessionState, SubscriberId, NO_HISTORY_MESSAGE};
pub use watcher::{FileWatcher, LinesCallback, WatcherHandle};
