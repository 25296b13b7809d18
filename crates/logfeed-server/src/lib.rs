//! # logfeed-server
//!
//! HTTP transport for the logfeed streaming engine.
//!
//! This crate provides:
//!
//! - `GET /event-stream` — Server-Sent Events: history, then live lines
//! - `GET /emit-event` — Appends a synthetic payment record
//! - `GET /health` — Uptime, subscriber count and watcher state
//!
//! ## Example
//!
//! ```rust,no_run
//! use logfeed_server::{LogfeedServer, ServerConfig};
//!
//! # async fn run() -> logfeed_server::ServerResult<()> {
//! let server = LogfeedServer::new(ServerConfig::default().with_log_dir("logs"));
//! server.serve().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use cli::{Cli, LogFormat};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handlers::{GREETING, HealthResponse};
pub use routes::create_router;
pub use server::LogfeedServer;
pub use state::AppState;
