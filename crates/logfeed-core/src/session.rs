//! Per-subscriber stream: history first, then live lines.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::registry::{Liveness, SubscriberRegistry, SubscriberToken};
use crate::types::{LogLine, SessionState, SubscriberId};

/// The stream of lines owed to one subscriber.
///
/// Yields the replayed history (or the no-history sentinel) and then every
/// line broadcast while the subscriber is registered. Dropping the session
/// unregisters it.
#[derive(Debug)]
pub struct StreamSession {
    id: SubscriberId,
    state: SessionState,
    registry: Arc<SubscriberRegistry>,
    token: Option<SubscriberToken>,
    liveness: Option<Liveness>,
    history: VecDeque<LogLine>,
    live: mpsc::Receiver<LogLine>,
}

impl StreamSession {
    pub(crate) fn connecting(
        id: SubscriberId,
        registry: Arc<SubscriberRegistry>,
        live: mpsc::Receiver<LogLine>,
    ) -> Self {
        Self {
            id,
            state: SessionState::Connecting,
            registry,
            token: None,
            liveness: None,
            history: VecDeque::new(),
            live,
        }
    }

    /// Records the registration made on this session's behalf.
    pub(crate) fn attach(&mut self, token: SubscriberToken, liveness: Liveness) {
        self.token = Some(token);
        self.liveness = Some(liveness);
    }

    /// Queues history ahead of any live line.
    pub(crate) fn replay(&mut self, history: Vec<LogLine>) {
        if self.state != SessionState::Connecting {
            return;
        }
        debug!(subscriber = %self.id, lines = history.len(), "Replaying history");
        self.history = history.into();
        self.state = if self.history.is_empty() {
            SessionState::Live
        } else {
            SessionState::ReplayingHistory
        };
    }

    /// Skips history entirely.
    pub(crate) fn go_live(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Live;
        }
    }

    /// Returns the subscriber's identity.
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the number of history lines not yet yielded.
    #[must_use]
    pub fn history_remaining(&self) -> usize {
        self.history.len()
    }

    /// Returns true while the session can still deliver lines.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.state.is_terminal() && self.liveness.as_ref().is_some_and(Liveness::is_alive)
    }

    /// Waits for the next line. Returns `None` once the session is closed.
    pub async fn next_line(&mut self) -> Option<LogLine> {
        self.next().await
    }

    /// Unregisters the subscriber and releases its buffers. Idempotent.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        if let Some(token) = self.token.take() {
            self.registry.unregister(token);
        }
        self.history.clear();
        self.live.close();
        info!(subscriber = %self.id, "Stream session closed");
    }
}

impl Stream for StreamSession {
    type Item = LogLine;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        match this.state {
            SessionState::Closed => return Poll::Ready(None),
            SessionState::ReplayingHistory => {
                if let Some(line) = this.history.pop_front() {
                    return Poll::Ready(Some(line));
                }
                debug!(subscriber = %this.id, "History replayed, going live");
                this.state = SessionState::Live;
            }
            SessionState::Connecting | SessionState::Live => {}
        }

        match this.live.poll_recv(cx) {
            Poll::Ready(Some(line)) => Poll::Ready(Some(line)),
            Poll::Ready(None) => {
                this.close();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close();
    }
}
