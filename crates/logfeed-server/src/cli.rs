//! Command-line argument parsing with clap.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::ServerConfig;

/// Stream an append-only log file to browsers over Server-Sent Events.
#[derive(Parser, Debug, Clone)]
#[command(name = "logfeed")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on.
    #[arg(short, long, env = "LOGFEED_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Directory holding the log files.
    #[arg(long, env = "LOGFEED_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// File inside the log directory to tail.
    #[arg(long, env = "LOGFEED_LOG_FILE", default_value = "combined.log")]
    pub log_file: String,

    /// Do not replay existing content to new subscribers.
    #[arg(long, env = "LOGFEED_NO_REPLAY")]
    pub no_replay: bool,

    /// Fallback poll interval in milliseconds.
    #[arg(long, env = "LOGFEED_POLL_INTERVAL_MS", default_value_t = 250)]
    pub poll_interval_ms: u64,

    /// Maximum concurrent stream subscribers.
    #[arg(long, env = "LOGFEED_MAX_SUBSCRIBERS", default_value_t = 1000)]
    pub max_subscribers: usize,

    /// SSE keep-alive interval in seconds.
    #[arg(long, env = "LOGFEED_KEEP_ALIVE_SECS", default_value_t = 15)]
    pub keep_alive_secs: u64,

    /// Allowed CORS origin; repeat for several. Any origin when omitted.
    #[arg(long = "cors-origin", env = "LOGFEED_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Emit a synthetic payment record every N milliseconds.
    #[arg(long, env = "LOGFEED_EMIT_INTERVAL_MS")]
    pub emit_interval_ms: Option<u64>,

    /// Diagnostic output format.
    #[arg(long, value_enum, env = "LOGFEED_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Diagnostic output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl Cli {
    /// Builds the server configuration from the parsed arguments.
    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::new(self.bind)
            .with_log_dir(&self.log_dir)
            .with_log_file(self.log_file.clone())
            .with_replay_history(!self.no_replay)
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms.max(1)))
            .with_max_subscribers(self.max_subscribers)
            .with_keep_alive(Duration::from_secs(self.keep_alive_secs.max(1)));

        for origin in &self.cors_origins {
            config = config.with_cors_origin(origin.clone());
        }
        if let Some(ms) = self.emit_interval_ms.filter(|ms| *ms > 0) {
            config = config.with_emit_interval(Duration::from_millis(ms));
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["logfeed"]).unwrap();
        let config = cli.server_config();

        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.log_path(), PathBuf::from("logs").join("combined.log"));
        assert!(config.replay_history);
        assert!(config.emit_interval.is_none());
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "logfeed",
            "--bind",
            "127.0.0.1:8081",
            "--log-dir",
            "/tmp/feed",
            "--log-file",
            "app.log",
            "--no-replay",
            "--max-subscribers",
            "3",
            "--cors-origin",
            "http://a.test,http://b.test",
            "--emit-interval-ms",
            "500",
            "--log-format",
            "json",
        ])
        .unwrap();
        let config = cli.server_config();

        assert_eq!(config.bind_addr.port(), 8081);
        assert_eq!(config.log_path(), PathBuf::from("/tmp/feed/app.log"));
        assert!(!config.replay_history);
        assert_eq!(config.max_subscribers, 3);
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(config.emit_interval, Some(Duration::from_millis(500)));
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test_case("0", None ; "zero disables")]
    #[test_case("250", Some(Duration::from_millis(250)) ; "positive enables")]
    fn test_emit_interval(value: &str, expected: Option<Duration>) {
        let cli = Cli::try_parse_from(["logfeed", "--emit-interval-ms", value]).unwrap();
        assert_eq!(cli.server_config().emit_interval, expected);
    }

    #[test]
    fn test_invalid_bind_is_rejected() {
        assert!(Cli::try_parse_from(["logfeed", "--bind", "not-an-addr"]).is_err());
    }
}
