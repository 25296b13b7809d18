//! Shared state for the streaming server.

use std::sync::Arc;
use std::time::Instant;

use logfeed_core::StreamingEngine;
use logfeed_events::{EventGenerator, PaymentRecord, RecordLogger};
use tokio::task;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// State shared by all handlers.
#[derive(Debug)]
pub struct AppState {
    config: Arc<ServerConfig>,
    engine: Arc<StreamingEngine>,
    generator: Arc<EventGenerator>,
    logger: Arc<RecordLogger>,
    start_time: Instant,
}

impl AppState {
    /// Create state from configuration.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let engine = Arc::new(StreamingEngine::new(config.engine_config()));
        Self::with_parts(config, engine, EventGenerator::new())
    }

    /// Create state around an existing engine and generator.
    #[must_use]
    pub fn with_parts(
        config: ServerConfig,
        engine: Arc<StreamingEngine>,
        generator: EventGenerator,
    ) -> Self {
        let logger = RecordLogger::new(config.logger_config());
        Self {
            config: Arc::new(config),
            engine,
            generator: Arc::new(generator),
            logger: Arc::new(logger),
            start_time: Instant::now(),
        }
    }

    /// Get the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the streaming engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<StreamingEngine> {
        &self.engine
    }

    /// Seconds since the state was created.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generates one record and appends it to the log.
    ///
    /// The file write runs on the blocking pool.
    pub async fn emit(&self) -> ServerResult<PaymentRecord> {
        let generator = Arc::clone(&self.generator);
        let logger = Arc::clone(&self.logger);

        task::spawn_blocking(move || -> ServerResult<PaymentRecord> {
            let record = generator.generate();
            logger.log_record(&record)?;
            Ok(record)
        })
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_emit_appends_to_tailed_file() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(ServerConfig::default().with_log_dir(dir.path()));

        let record = state.emit().await.unwrap();

        let content = std::fs::read_to_string(state.config().log_path()).unwrap();
        let line: serde_json::Value = serde_json::from_str(content.trim_end()).unwrap();
        assert_eq!(line["transactionId"], record.transaction_id.to_string());
        assert_eq!(state.engine().refresh().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_emit_into_unwritable_dir_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let state = AppState::new(ServerConfig::default().with_log_dir(blocker.join("logs")));

        let err = state.emit().await.unwrap_err();
        assert!(matches!(err, ServerError::Emit(_)));
    }

    #[test]
    fn test_uptime_starts_at_zero() {
        let state = AppState::new(ServerConfig::default());
        assert_eq!(state.uptime_secs(), 0);
    }
}
