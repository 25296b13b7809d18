//! The subscription service: one watcher feeding one registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{Result, StreamError};
use crate::line_source::LineSource;
use crate::registry::{Subscriber, SubscriberRegistry};
use crate::session::StreamSession;
use crate::types::{LogLine, ReadCursor, SubscriberId};
use crate::watcher::{FileWatcher, WatcherHandle};

/// Streams one log file to any number of subscribers.
#[derive(Debug)]
pub struct StreamingEngine {
    config: EngineConfig,
    watcher: Arc<FileWatcher>,
    registry: Arc<SubscriberRegistry>,
    next_id: AtomicU64,
    handle: Mutex<Option<WatcherHandle>>,
}

impl StreamingEngine {
    /// Creates an engine. Nothing is watched until [`Self::start`].
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let source = LineSource::new(config.log_path.clone());
        let watcher = Arc::new(FileWatcher::new(source, config.poll_interval));
        Self {
            config,
            watcher,
            registry: Arc::new(SubscriberRegistry::new()),
            next_id: AtomicU64::new(1),
            handle: Mutex::new(None),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the subscriber registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Starts watching the file; new lines are broadcast one at a time in
    /// file order. Calling this while already watching is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::WatchSetup`] if the filesystem watch cannot be
    /// established. The engine still serves history in that case.
    pub fn start(&self) -> Result<()> {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return Ok(());
        }

        let registry = Arc::clone(&self.registry);
        let started = self
            .watcher
            .start(Arc::new(move |lines: Vec<LogLine>| {
                broadcast_lines(&registry, &lines);
            }))?;
        *handle = Some(started);
        Ok(())
    }

    /// Stops watching. Connected subscribers stay registered.
    pub async fn stop(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            handle.stop().await;
            info!(path = %self.config.log_path.display(), "Stopped watching log file");
        }
    }

    /// Ends every open session. Sessions finish delivering their history
    /// and then terminate.
    pub fn disconnect_all(&self) -> usize {
        self.registry.clear()
    }

    /// Returns true while the background watcher is running.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.handle.lock().as_ref().is_some_and(WatcherHandle::is_running)
    }

    /// Checks the file now and broadcasts anything new.
    ///
    /// Returns the number of lines broadcast.
    pub fn refresh(&self) -> Result<usize> {
        self.watcher
            .poll(|lines| broadcast_lines(&self.registry, &lines))
    }

    /// Connects a new subscriber.
    ///
    /// The subscriber is registered and its history read in one critical
    /// section of the read cursor. History is every complete line before
    /// that cursor; everything after it arrives through the live feed, so
    /// no line is delivered twice or skipped. A missing or unreadable file
    /// is reported with a single sentinel line instead of history.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::TooManySubscribers`] when the limit is
    /// reached.
    pub async fn subscribe(&self) -> Result<StreamSession> {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.config.subscriber_buffer);
        let session = StreamSession::connecting(id, Arc::clone(&self.registry), rx);

        let watcher = Arc::clone(&self.watcher);
        let registry = Arc::clone(&self.registry);
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || open_session(&watcher, &registry, &config, session, tx))
            .await
            .map_err(|e| StreamError::Task(e.to_string()))?
    }

    /// Returns the number of connected subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns the watcher's read cursor.
    #[must_use]
    pub fn cursor(&self) -> ReadCursor {
        self.watcher.cursor()
    }
}

/// Registers `session` and queues its history while the cursor is held.
fn open_session(
    watcher: &FileWatcher,
    registry: &SubscriberRegistry,
    config: &EngineConfig,
    mut session: StreamSession,
    tx: mpsc::Sender<LogLine>,
) -> Result<StreamSession> {
    let id = session.id();
    watcher.with_cursor(
        |lines| broadcast_lines(registry, &lines),
        |cursor| {
            let active = registry.len();
            if active >= config.max_subscribers {
                return Err(StreamError::TooManySubscribers(
                    active,
                    config.max_subscribers,
                ));
            }

            let subscriber = Subscriber::new(id, tx);
            let liveness = subscriber.liveness();
            session.attach(registry.register(subscriber), liveness);

            if config.replay_history {
                session.replay(history_before(watcher.source(), cursor, id));
            } else {
                session.go_live();
            }
            Ok(())
        },
    )?;
    Ok(session)
}

fn history_before(source: &LineSource, cursor: ReadCursor, id: SubscriberId) -> Vec<LogLine> {
    match source.current_size() {
        Ok(Some(_)) => source.read_history(cursor.offset()).unwrap_or_else(|e| {
            warn!(subscriber = %id, error = %e, "Failed to read history");
            vec![LogLine::sentinel()]
        }),
        Ok(None) => {
            info!(subscriber = %id, path = %source.path().display(), "No log file yet");
            vec![LogLine::sentinel()]
        }
        Err(e) => {
            warn!(subscriber = %id, error = %e, "Log file unavailable");
            vec![LogLine::sentinel()]
        }
    }
}

fn broadcast_lines(registry: &SubscriberRegistry, lines: &[LogLine]) {
    for line in lines {
        registry.broadcast(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionState;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn append(path: &Path, text: &str) {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    async fn next_text(session: &mut StreamSession) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(1), session.next_line())
            .await
            .ok()
            .flatten()
            .map(|l| l.to_string())
    }

    #[tokio::test]
    async fn subscribe_replays_history_then_live() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, "one\ntwo\n");
        let engine = StreamingEngine::new(EngineConfig::new(&path));
        engine.refresh().unwrap();

        let mut session = engine.subscribe().await.unwrap();
        assert_eq!(session.state(), SessionState::ReplayingHistory);

        append(&path, "three\n");
        engine.refresh().unwrap();

        assert_eq!(next_text(&mut session).await.as_deref(), Some("one"));
        assert_eq!(next_text(&mut session).await.as_deref(), Some("two"));
        assert_eq!(next_text(&mut session).await.as_deref(), Some("three"));
    }

    #[tokio::test]
    async fn unpolled_content_arrives_live_not_in_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, "seen\n");
        let engine = StreamingEngine::new(EngineConfig::new(&path));
        engine.refresh().unwrap();

        // Appended but not yet noticed by the watcher.
        append(&path, "pending\n");
        let mut session = engine.subscribe().await.unwrap();
        assert_eq!(session.history_remaining(), 1);

        engine.refresh().unwrap();

        assert_eq!(next_text(&mut session).await.as_deref(), Some("seen"));
        assert_eq!(next_text(&mut session).await.as_deref(), Some("pending"));
        engine.refresh().unwrap();
        assert_eq!(next_text(&mut session).await, None);
    }

    #[tokio::test]
    async fn missing_file_sends_sentinel() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.log");
        let engine = StreamingEngine::new(EngineConfig::new(&path));

        let mut session = engine.subscribe().await.unwrap();
        let first = session.next_line().await.unwrap();
        assert!(first.is_sentinel());

        append(&path, "created\n");
        engine.refresh().unwrap();

        assert_eq!(next_text(&mut session).await.as_deref(), Some("created"));
        assert_eq!(session.state(), SessionState::Live);
    }

    #[tokio::test]
    async fn replay_disabled_starts_live() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, "old\n");
        let engine =
            StreamingEngine::new(EngineConfig::new(&path).with_replay_history(false));
        engine.refresh().unwrap();

        let mut session = engine.subscribe().await.unwrap();
        assert_eq!(session.state(), SessionState::Live);

        append(&path, "new\n");
        engine.refresh().unwrap();

        assert_eq!(next_text(&mut session).await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn subscriber_limit_is_enforced() {
        let dir = TempDir::new().unwrap();
        let engine = StreamingEngine::new(
            EngineConfig::new(dir.path().join("app.log")).with_max_subscribers(1),
        );

        let first = engine.subscribe().await.unwrap();
        let second = engine.subscribe().await;
        assert!(matches!(second, Err(StreamError::TooManySubscribers(1, 1))));

        drop(first);
        assert!(engine.subscribe().await.is_ok());
    }

    #[tokio::test]
    async fn dropped_session_is_unregistered() {
        let dir = TempDir::new().unwrap();
        let engine = StreamingEngine::new(EngineConfig::new(dir.path().join("app.log")));

        let session = engine.subscribe().await.unwrap();
        assert_eq!(engine.subscriber_count(), 1);

        drop(session);
        assert_eq!(engine.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn disconnect_all_ends_sessions_after_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, "kept\n");
        let engine = StreamingEngine::new(EngineConfig::new(&path));
        engine.refresh().unwrap();

        let mut session = engine.subscribe().await.unwrap();
        assert_eq!(engine.disconnect_all(), 1);
        assert_eq!(engine.subscriber_count(), 0);

        assert_eq!(next_text(&mut session).await.as_deref(), Some("kept"));
        assert!(session.next_line().await.is_none());
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn subscriber_ids_are_unique() {
        let dir = TempDir::new().unwrap();
        let engine = StreamingEngine::new(EngineConfig::new(dir.path().join("app.log")));

        let a = engine.subscribe().await.unwrap();
        let b = engine.subscribe().await.unwrap();

        assert_ne!(a.id(), b.id());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn start_and_stop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        append(&path, "existing\n");
        let engine = StreamingEngine::new(
            EngineConfig::new(&path).with_poll_interval(Duration::from_millis(20)),
        );

        engine.start().unwrap();
        engine.start().unwrap();
        assert!(engine.is_watching());
        assert_eq!(engine.cursor().offset(), 9);

        engine.stop().await;
        assert!(!engine.is_watching());
    }
}
