//! HTTP request handlers.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use logfeed_events::PaymentRecord;
use serde::Serialize;
use tracing::info;

use crate::error::ServerResult;
use crate::state::AppState;

/// First frame sent on every stream.
pub const GREETING: &str = "connected to server";

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status message.
    pub status: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Connected stream subscribers.
    pub subscribers: usize,
    /// Whether the file watcher is running.
    pub watching: bool,
    /// Byte offset delivered so far.
    pub cursor: u64,
}

/// Handle GET /health.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let engine = state.engine();
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.uptime_secs(),
        subscribers: engine.subscriber_count(),
        watching: engine.is_watching(),
        cursor: engine.cursor().offset(),
    })
}

/// Handle GET /event-stream.
///
/// Sends the greeting, then history and live lines until the client goes
/// away. Dropping the response stream drops the session, which unregisters
/// the subscriber.
pub async fn event_stream(
    State(state): State<Arc<AppState>>,
) -> ServerResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let session = state.engine().subscribe().await?;
    info!(subscriber = %session.id(), "Client connected to event stream");

    let greeting = stream::once(async { Event::default().data(GREETING) });
    let lines = session.map(|line| line_event(line.as_str()));
    let stream = greeting.chain(lines).map(Ok);

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(state.config().keep_alive)))
}

/// Wraps one line in a data frame. SSE fields cannot carry carriage returns.
fn line_event(line: &str) -> Event {
    if line.contains('\r') {
        Event::default().data(line.replace('\r', ""))
    } else {
        Event::default().data(line)
    }
}

/// Handle GET /emit-event.
pub async fn emit_event(State(state): State<Arc<AppState>>) -> ServerResult<Json<PaymentRecord>> {
    let record = state.emit().await?;
    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use tempfile::TempDir;

    fn make_test_state(dir: &TempDir) -> Arc<AppState> {
        Arc::new(AppState::new(
            ServerConfig::default().with_log_dir(dir.path()),
        ))
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = TempDir::new().unwrap();
        let state = make_test_state(&dir);

        let Json(health) = health_check(State(state)).await;

        assert_eq!(health.status, "ok");
        assert_eq!(health.subscribers, 0);
        assert!(!health.watching);
        assert_eq!(health.cursor, 0);
    }

    #[tokio::test]
    async fn test_emit_event_returns_record() {
        let dir = TempDir::new().unwrap();
        let state = make_test_state(&dir);

        let Json(record) = emit_event(State(Arc::clone(&state))).await.unwrap();

        assert_eq!(record.service_name, "PaymentService");
        assert!(state.config().log_path().exists());
    }

    #[tokio::test]
    async fn test_event_stream_rejects_over_limit() {
        let dir = TempDir::new().unwrap();
        let state = Arc::new(AppState::new(
            ServerConfig::default()
                .with_log_dir(dir.path())
                .with_max_subscribers(1),
        ));

        let first = event_stream(State(Arc::clone(&state))).await;
        assert!(first.is_ok());

        let second = event_stream(State(Arc::clone(&state))).await;
        assert!(matches!(
            second,
            Err(crate::error::ServerError::TooManySubscribers(1, 1))
        ));
    }

    async fn encode(events: Vec<Event>) -> String {
        use axum::response::IntoResponse;
        use http_body_util::BodyExt;

        let sse = Sse::new(stream::iter(events.into_iter().map(Ok::<_, Infallible>)));
        let body = sse.into_response().into_body().collect().await.unwrap();
        String::from_utf8(body.to_bytes().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_line_event_drops_carriage_returns() {
        let body = encode(vec![line_event("a\rb"), line_event(r#"{"plain":true}"#)]).await;

        assert_eq!(body, "data: ab\n\ndata: {\"plain\":true}\n\n");
    }

    #[test]
    fn test_health_response_serialization() {
        let health = HealthResponse {
            status: "ok".to_string(),
            uptime_secs: 12,
            subscribers: 2,
            watching: true,
            cursor: 512,
        };

        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["uptime_secs"], 12);
        assert_eq!(json["cursor"], 512);
    }
}
