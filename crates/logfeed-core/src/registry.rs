//! Membership and fan-out for connected subscribers.
//!
//! This module provides:
//! - [`LineSink`] — Where a subscriber's lines are delivered
//! - [`Subscriber`] — Identity, sink and liveness flag of one connection
//! - [`SubscriberRegistry`] — Register, unregister and broadcast

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::SinkError;
use crate::types::{LogLine, SubscriberId};

/// Destination for the lines of one subscriber.
///
/// Implementations must not block: delivery happens while the watcher is
/// fanning a line out to every subscriber.
pub trait LineSink: Send + Sync {
    /// Hands one line to the subscriber.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscriber can no longer accept lines.
    fn deliver(&self, line: &LogLine) -> Result<(), SinkError>;
}

impl LineSink for mpsc::Sender<LogLine> {
    fn deliver(&self, line: &LogLine) -> Result<(), SinkError> {
        self.try_send(line.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

/// Shared liveness flag of a subscriber.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Returns true while the subscriber may still receive lines.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One connected consumer of the live feed.
pub struct Subscriber {
    id: SubscriberId,
    sink: Box<dyn LineSink>,
    liveness: Liveness,
}

impl Subscriber {
    /// Creates a live subscriber delivering to `sink`.
    pub fn new(id: SubscriberId, sink: impl LineSink + 'static) -> Self {
        Self {
            id,
            sink: Box::new(sink),
            liveness: Liveness::new(),
        }
    }

    /// Returns the subscriber's identity.
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Returns a handle to the liveness flag, cleared on removal.
    #[must_use]
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("alive", &self.liveness.is_alive())
            .finish_non_exhaustive()
    }
}

/// Handle returned by [`SubscriberRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberToken(SubscriberId);

impl SubscriberToken {
    /// Returns the registered subscriber's identity.
    #[must_use]
    pub const fn id(self) -> SubscriberId {
        self.0
    }
}

/// The set of currently connected subscribers.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<SubscriberId, Subscriber>>,
}

impl SubscriberRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber; it receives every line broadcast from now on.
    pub fn register(&self, subscriber: Subscriber) -> SubscriberToken {
        let id = subscriber.id;
        let total = {
            let mut subscribers = self.subscribers.write();
            subscribers.insert(id, subscriber);
            subscribers.len()
        };
        info!(subscriber = %id, total, "Subscriber registered");
        SubscriberToken(id)
    }

    /// Removes a subscriber and clears its liveness flag.
    ///
    /// Returns `false` if the token was already removed.
    pub fn unregister(&self, token: SubscriberToken) -> bool {
        let removed = self.subscribers.write().remove(&token.0);
        match removed {
            Some(subscriber) => {
                subscriber.liveness.clear();
                info!(subscriber = %token.0, "Subscriber unregistered");
                true
            }
            None => false,
        }
    }

    /// Removes every subscriber and drops its sink, ending their streams.
    ///
    /// Returns the number removed.
    pub fn clear(&self) -> usize {
        let drained: Vec<Subscriber> = self.subscribers.write().drain().map(|(_, s)| s).collect();
        for subscriber in &drained {
            subscriber.liveness.clear();
        }
        if !drained.is_empty() {
            info!(count = drained.len(), "Disconnected all subscribers");
        }
        drained.len()
    }

    /// Delivers `line` to every registered subscriber.
    ///
    /// Subscribers whose sink fails are removed after the fan-out, without
    /// affecting delivery to the others. Returns the number of subscribers
    /// that accepted the line.
    pub fn broadcast(&self, line: &LogLine) -> usize {
        let mut delivered = 0;
        let mut failed = Vec::new();

        {
            let subscribers = self.subscribers.read();
            for (id, subscriber) in subscribers.iter() {
                if !subscriber.liveness.is_alive() {
                    failed.push((*id, SinkError::Closed));
                    continue;
                }
                match subscriber.sink.deliver(line) {
                    Ok(()) => delivered += 1,
                    Err(e) => failed.push((*id, e)),
                }
            }
        }

        if !failed.is_empty() {
            let mut subscribers = self.subscribers.write();
            for (id, reason) in failed {
                if let Some(subscriber) = subscribers.remove(&id) {
                    subscriber.liveness.clear();
                    match reason {
                        SinkError::Closed => debug!(subscriber = %id, "Subscriber sink closed"),
                        SinkError::Full => {
                            warn!(subscriber = %id, "Subscriber fell behind, disconnecting");
                        }
                    }
                }
            }
        }

        delivered
    }

    /// Returns true if the token is still registered.
    #[must_use]
    pub fn contains(&self, token: SubscriberToken) -> bool {
        self.subscribers.read().contains_key(&token.0)
    }

    /// Returns the number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns true if nobody is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }
}
