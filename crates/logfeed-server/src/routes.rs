//! Route configuration.

use std::sync::Arc;

use axum::routing::{Router, get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handlers::{emit_event, event_stream, health_check};
use crate::state::AppState;

/// Create the server router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(state.config());

    Router::new()
        .route("/event-stream", get(event_stream))
        .route("/emit-event", get(emit_event))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
