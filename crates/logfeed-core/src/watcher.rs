//! Change detection for the watched file.
//!
//! [`FileWatcher`] owns the [`ReadCursor`] and is the only component that
//! moves it. Filesystem notifications (via `notify`) and a periodic size
//! check both funnel into [`FileWatcher::poll`], which re-reads the cursor
//! under a per-file mutex. Notification counts therefore do not matter: a
//! burst of events, a duplicated event or a missed one all converge on the
//! same cursor.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Result, StreamError};
use crate::line_source::LineSource;
use crate::types::{LogLine, ReadCursor};

/// Pending notifications kept between polls; extras are redundant.
const NOTIFY_QUEUE: usize = 16;

/// Callback receiving each batch of new lines, in file order.
pub type LinesCallback = Arc<dyn Fn(Vec<LogLine>) + Send + Sync>;

/// Tails one file and reports newly completed lines.
#[derive(Debug)]
pub struct FileWatcher {
    source: LineSource,
    cursor: Mutex<ReadCursor>,
    poll_interval: Duration,
}

impl FileWatcher {
    /// Creates a watcher with its cursor at the start of the file.
    #[must_use]
    pub fn new(source: LineSource, poll_interval: Duration) -> Self {
        Self {
            source,
            cursor: Mutex::new(ReadCursor::default()),
            poll_interval,
        }
    }

    /// Returns the underlying line source.
    #[must_use]
    pub const fn source(&self) -> &LineSource {
        &self.source
    }

    /// Returns the current cursor.
    #[must_use]
    pub fn cursor(&self) -> ReadCursor {
        *self.cursor.lock()
    }

    /// Runs `f` while holding the cursor, so no poll can advance it
    /// until `f` returns.
    ///
    /// If the file shrank below the cursor since the last poll, the
    /// truncation is caught up first and its lines go to `on_new_lines`.
    /// `f` therefore never sees a cursor past the end of the file.
    pub fn with_cursor<R>(
        &self,
        on_new_lines: impl FnOnce(Vec<LogLine>),
        f: impl FnOnce(ReadCursor) -> R,
    ) -> R {
        let mut cursor = self.cursor.lock();
        if let Ok(Some(size)) = self.source.current_size() {
            if size < cursor.offset() {
                if let Err(e) = self.advance(&mut cursor, size, on_new_lines) {
                    warn!(error = %e, "Truncation catch-up failed");
                }
            }
        }
        f(*cursor)
    }

    /// Catches the cursor up with the file.
    ///
    /// `on_new_lines` runs with the cursor still held and must not block.
    /// Returns the number of lines delivered. A missing file, or one whose
    /// size equals the cursor, is a no-op.
    pub fn poll(&self, on_new_lines: impl FnOnce(Vec<LogLine>)) -> Result<usize> {
        let mut cursor = self.cursor.lock();

        let Some(size) = self.source.current_size()? else {
            return Ok(0);
        };
        if size == cursor.offset() {
            return Ok(0);
        }
        self.advance(&mut cursor, size, on_new_lines)
    }

    fn advance(
        &self,
        cursor: &mut ReadCursor,
        size: u64,
        on_new_lines: impl FnOnce(Vec<LogLine>),
    ) -> Result<usize> {
        let extracted = self.source.extract_new(cursor.offset(), size)?;
        if extracted.truncated {
            cursor.reset();
        }
        cursor.advance_to(extracted.new_offset);

        let count = extracted.lines.len();
        if count > 0 {
            debug!(lines = count, cursor = cursor.offset(), "New log lines");
            on_new_lines(extracted.lines);
        }
        Ok(count)
    }

    /// Starts watching in the background.
    ///
    /// Performs one catch-up poll first. If the file's directory does not
    /// exist yet, installing the filesystem watch is retried on every poll
    /// tick. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::WatchSetup`] if the filesystem watch cannot
    /// be established.
    pub fn start(self: &Arc<Self>, on_new_lines: LinesCallback) -> Result<WatcherHandle> {
        if let Err(e) = self.poll(|lines| on_new_lines(lines)) {
            warn!(error = %e, "Initial catch-up failed");
        }

        let (notify_tx, notify_rx) = mpsc::channel(NOTIFY_QUEUE);
        let watch = match install_watch(self.source.path(), notify_tx.clone()) {
            Ok(watch) => Some(watch),
            Err(WatchInstall::Deferred) => {
                debug!(path = %self.source.path().display(), "Log directory missing, deferring watch");
                None
            }
            Err(WatchInstall::Failed(reason)) => {
                error!(path = %self.source.path().display(), %reason, "Failed to watch log file");
                return Err(StreamError::WatchSetup {
                    path: self.source.path().to_path_buf(),
                    reason,
                });
            }
        };

        info!(
            path = %self.source.path().display(),
            cursor = self.cursor().offset(),
            "Watching log file"
        );

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_watch_loop(
            Arc::clone(self),
            on_new_lines,
            watch,
            notify_tx,
            notify_rx,
            cancel.clone(),
        ));

        Ok(WatcherHandle {
            cancel,
            task: Some(task),
        })
    }
}

/// Handle to a running watcher task. Dropping it stops the watcher.
#[derive(Debug)]
pub struct WatcherHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// Stops the watcher and waits for its task to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Watcher task ended abnormally");
            }
        }
    }

    /// Returns true while the watcher task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

enum WatchInstall {
    /// The directory to watch does not exist yet.
    Deferred,
    /// The platform watch primitive failed.
    Failed(String),
}

async fn run_watch_loop(
    watcher: Arc<FileWatcher>,
    on_new_lines: LinesCallback,
    mut watch: Option<RecommendedWatcher>,
    notify_tx: mpsc::Sender<()>,
    mut notify_rx: mpsc::Receiver<()>,
    cancel: CancellationToken,
) {
    let path = watcher.source.path().to_path_buf();
    let mut retry_watch = watch.is_none();
    let mut ticker = tokio::time::interval(watcher.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            Some(()) = notify_rx.recv() => {
                // Coalesce the burst; one poll covers all of it.
                while notify_rx.try_recv().is_ok() {}
            }
            _ = ticker.tick() => {
                if retry_watch {
                    match install_watch(&path, notify_tx.clone()) {
                        Ok(installed) => {
                            info!(path = %path.display(), "Log directory appeared, watch installed");
                            watch = Some(installed);
                            retry_watch = false;
                        }
                        Err(WatchInstall::Deferred) => {}
                        Err(WatchInstall::Failed(reason)) => {
                            error!(path = %path.display(), %reason, "Failed to watch log file, polling only");
                            retry_watch = false;
                        }
                    }
                }
            }
        }

        let step = Arc::clone(&watcher);
        let callback = Arc::clone(&on_new_lines);
        match tokio::task::spawn_blocking(move || step.poll(|lines| callback(lines))).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to read log file"),
            Err(e) => {
                error!(error = %e, "Log poll task failed");
                break;
            }
        }
    }

    drop(watch);
    debug!(path = %path.display(), "Watcher stopped");
}

fn install_watch(
    path: &Path,
    notify_tx: mpsc::Sender<()>,
) -> std::result::Result<RecommendedWatcher, WatchInstall> {
    let dir = watch_dir(path);
    if !dir.is_dir() {
        return Err(WatchInstall::Deferred);
    }

    let file_name = path.file_name().map(OsStr::to_os_string);
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) if is_relevant(&event, file_name.as_deref()) => {
            let _ = notify_tx.try_send(());
        }
        Ok(_) => {}
        Err(e) => debug!(error = %e, "Filesystem watch error"),
    })
    .map_err(classify)?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(classify)?;
    Ok(watcher)
}

fn classify(err: notify::Error) -> WatchInstall {
    match &err.kind {
        notify::ErrorKind::PathNotFound => WatchInstall::Deferred,
        notify::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
            WatchInstall::Deferred
        }
        _ => WatchInstall::Failed(err.to_string()),
    }
}

/// The directory holding `path`; the file itself may not exist yet.
fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn is_relevant(event: &Event, file_name: Option<&OsStr>) -> bool {
    matches!(
        event.kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| p.file_name() == file_name)
}
