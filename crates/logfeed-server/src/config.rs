//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use logfeed_core::EngineConfig;
use logfeed_core::config::{DEFAULT_MAX_SUBSCRIBERS, DEFAULT_POLL_INTERVAL};
use logfeed_events::RecordLoggerConfig;

/// Default SSE keep-alive interval.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Configuration for the streaming server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    pub bind_addr: SocketAddr,
    /// Directory holding the log files.
    pub log_dir: PathBuf,
    /// Name of the file that is tailed and written to.
    pub log_file: String,
    /// Replay existing content to new subscribers.
    pub replay_history: bool,
    /// Fallback poll interval of the file watcher.
    pub poll_interval: Duration,
    /// Maximum concurrent stream subscribers.
    pub max_subscribers: usize,
    /// Interval between SSE keep-alive comments.
    pub keep_alive: Duration,
    /// CORS allowed origins (empty means all).
    pub cors_origins: Vec<String>,
    /// Emit a synthetic record on this interval when set.
    pub emit_interval: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_dir: PathBuf::from("logs"),
            log_file: "combined.log".to_string(),
            replay_history: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_subscribers: DEFAULT_MAX_SUBSCRIBERS,
            keep_alive: DEFAULT_KEEP_ALIVE,
            cors_origins: Vec::new(),
            emit_interval: None,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    /// Set the log directory.
    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Set the tailed file name.
    #[must_use]
    pub fn with_log_file(mut self, name: impl Into<String>) -> Self {
        self.log_file = name.into();
        self
    }

    /// Enable or disable history replay.
    #[must_use]
    pub const fn with_replay_history(mut self, replay: bool) -> Self {
        self.replay_history = replay;
        self
    }

    /// Set the watcher poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the maximum number of subscribers.
    #[must_use]
    pub const fn with_max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }

    /// Set the keep-alive interval.
    #[must_use]
    pub const fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }

    /// Add a CORS allowed origin.
    #[must_use]
    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origins.push(origin.into());
        self
    }

    /// Enable the background emitter.
    #[must_use]
    pub const fn with_emit_interval(mut self, interval: Duration) -> Self {
        self.emit_interval = Some(interval);
        self
    }

    /// Path of the tailed file.
    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(&self.log_file)
    }

    /// Engine settings derived from this configuration.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.log_path())
            .with_replay_history(self.replay_history)
            .with_poll_interval(self.poll_interval)
            .with_max_subscribers(self.max_subscribers)
    }

    /// Record logger settings writing into the tailed file.
    #[must_use]
    pub fn logger_config(&self) -> RecordLoggerConfig {
        RecordLoggerConfig::new(&self.log_dir).with_combined_file(self.log_file.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.log_path(), PathBuf::from("logs").join("combined.log"));
        assert!(config.replay_history);
        assert_eq!(config.keep_alive, DEFAULT_KEEP_ALIVE);
        assert!(config.cors_origins.is_empty());
        assert!(config.emit_interval.is_none());
    }

    #[test]
    fn test_config_builder() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9000);
        let config = ServerConfig::new(addr)
            .with_log_dir("/var/log/app")
            .with_log_file("app.log")
            .with_replay_history(false)
            .with_max_subscribers(5)
            .with_keep_alive(Duration::from_secs(30))
            .with_cors_origin("http://localhost:5173")
            .with_emit_interval(Duration::from_secs(1));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.log_path(), PathBuf::from("/var/log/app/app.log"));
        assert_eq!(config.cors_origins, vec!["http://localhost:5173".to_string()]);
        assert_eq!(config.emit_interval, Some(Duration::from_secs(1)));

        let engine = config.engine_config();
        assert_eq!(engine.log_path, PathBuf::from("/var/log/app/app.log"));
        assert!(!engine.replay_history);
        assert_eq!(engine.max_subscribers, 5);
    }

    #[test]
    fn test_logger_writes_into_tailed_file() {
        let config = ServerConfig::default()
            .with_log_dir("/tmp/feed")
            .with_log_file("feed.log");

        assert_eq!(config.logger_config().combined_path(), config.log_path());
    }
}
