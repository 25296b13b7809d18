//! Streaming engine configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default interval for the fallback size check.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Default number of lines buffered per subscriber before it is dropped.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 1024;

/// Default maximum number of concurrent subscribers.
pub const DEFAULT_MAX_SUBSCRIBERS: usize = 1000;

/// Configuration for a [`crate::StreamingEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// The append-only file to tail.
    pub log_path: PathBuf,
    /// Replay existing file content to a subscriber when it connects.
    pub replay_history: bool,
    /// How often the watcher re-checks the file without a notification.
    pub poll_interval: Duration,
    /// Lines buffered per subscriber; a subscriber that falls this far
    /// behind is disconnected.
    pub subscriber_buffer: usize,
    /// Maximum concurrent subscribers.
    pub max_subscribers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("logs/combined.log"),
            replay_history: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            max_subscribers: DEFAULT_MAX_SUBSCRIBERS,
        }
    }
}

impl EngineConfig {
    /// Create a configuration tailing the given file.
    #[must_use]
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            ..Self::default()
        }
    }

    /// Enable or disable history replay on connect.
    #[must_use]
    pub const fn with_replay_history(mut self, replay: bool) -> Self {
        self.replay_history = replay;
        self
    }

    /// Set the fallback poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the per-subscriber buffer size. Zero is raised to one.
    #[must_use]
    pub const fn with_subscriber_buffer(mut self, lines: usize) -> Self {
        self.subscriber_buffer = if lines == 0 { 1 } else { lines };
        self
    }

    /// Set the maximum number of concurrent subscribers.
    #[must_use]
    pub const fn with_max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }
}
