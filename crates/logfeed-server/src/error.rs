//! Error types for the streaming server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use logfeed_core::StreamError;
use logfeed_events::EventError;
use serde::Serialize;
use thiserror::Error;

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the streaming server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(std::net::SocketAddr, std::io::Error),

    /// The subscriber limit has been reached.
    #[error("too many subscribers: {0} active, limit is {1}")]
    TooManySubscribers(usize, usize),

    /// The streaming engine failed.
    #[error("stream error: {0}")]
    Stream(StreamError),

    /// A record could not be produced or written.
    #[error("failed to emit event: {0}")]
    Emit(#[from] EventError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StreamError> for ServerError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::TooManySubscribers(active, limit) => {
                Self::TooManySubscribers(active, limit)
            }
            other => Self::Stream(other),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Self::TooManySubscribers(_, _) => {
                (StatusCode::SERVICE_UNAVAILABLE, "too_many_subscribers")
            }
            Self::Emit(_) => (StatusCode::INTERNAL_SERVER_ERROR, "emit_failed"),
            Self::BindFailed(_, _) | Self::Stream(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        tracing::warn!(status = %status, error = %self, "Request failed");

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        };

        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            r#"{"error":"internal_error","message":"failed to serialize error"}"#.to_string()
        });

        (status, [("content-type", "application/json")], json).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_too_many_subscribers_response() {
        let err = ServerError::from(StreamError::TooManySubscribers(3, 3));
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["error"], "too_many_subscribers");
        assert!(json["message"].as_str().unwrap().contains("limit is 3"));
    }

    #[tokio::test]
    async fn test_emit_error_response() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = ServerError::from(EventError::from(io));
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "emit_failed");
    }

    #[test]
    fn test_stream_error_is_wrapped() {
        let err = ServerError::from(StreamError::Task("join".to_string()));
        assert!(matches!(err, ServerError::Stream(_)));
        assert_eq!(err.to_string(), "stream error: background task failed: join");
    }
}
