//! Streaming server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::routes::create_router;
use crate::state::AppState;

/// HTTP server streaming the tailed log to SSE clients.
#[derive(Debug, Clone)]
pub struct LogfeedServer {
    state: Arc<AppState>,
}

impl LogfeedServer {
    /// Create a new server with the given configuration.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            state: Arc::new(AppState::new(config)),
        }
    }

    /// Create a server around prepared state.
    #[must_use]
    pub const fn with_state(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Get the shared state.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Serve on the configured address until a fatal error.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve(&self) -> ServerResult<()> {
        self.serve_with_shutdown(std::future::pending::<()>()).await
    }

    /// Serve on the configured address until `shutdown` completes.
    ///
    /// The file watcher and the optional emitter are started before the
    /// listener accepts connections and stopped after it drains.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve_with_shutdown<F>(&self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.state.config().bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(addr, e))?;
        self.run(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails while running.
    pub async fn run<F>(&self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: Option<SocketAddr> = listener.local_addr().ok();
        let engine = self.state.engine();

        if let Err(e) = engine.start() {
            // Streams still connect; they see history and the sentinel.
            error!(error = %e, "Failed to start log watcher");
        }

        let cancel = CancellationToken::new();
        let emitter = self
            .state
            .config()
            .emit_interval
            .map(|interval| spawn_emitter(Arc::clone(&self.state), interval, cancel.clone()));

        info!(
            addr = ?addr,
            path = %self.state.config().log_path().display(),
            "Log stream server listening"
        );

        // Open streams never finish on their own; end them so the graceful
        // shutdown can drain.
        let streams = Arc::clone(engine);
        let shutdown = async move {
            shutdown.await;
            let closed = streams.disconnect_all();
            info!(streams = closed, "Shutting down, closing event streams");
        };

        let router = create_router(Arc::clone(&self.state));
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));

        cancel.cancel();
        if let Some(handle) = emitter {
            if let Err(e) = handle.await {
                warn!(error = %e, "Emitter task ended abnormally");
            }
        }
        engine.stop().await;

        info!("Log stream server shut down");
        result
    }

    /// Create the router without starting the server.
    ///
    /// Useful for testing or embedding in another server.
    pub fn router(&self) -> axum::Router {
        create_router(Arc::clone(&self.state))
    }
}

/// Periodically emits a synthetic record until cancelled.
fn spawn_emitter(
    state: Arc<AppState>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        info!(interval_ms = interval.as_millis() as u64, "Background emitter started");
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match state.emit().await {
                        Ok(record) => debug!(transaction = %record.transaction_id, "Emitted record"),
                        Err(e) => warn!(error = %e, "Background emit failed"),
                    }
                }
            }
        }
        debug!("Background emitter stopped");
    })
}
