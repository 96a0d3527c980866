//! Route definitions

use axum::{Router, routing::get};

use crate::{handlers, state::AppState};

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    let stream_path = state.config.telephony.stream_path.clone();

    Router::new()
        // Status endpoints
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        // Twilio webhook
        .route(
            "/incoming-call",
            get(handlers::incoming_call::incoming_call)
                .post(handlers::incoming_call::incoming_call),
        )
        // Media stream WebSocket
        .route(&stream_path, get(handlers::media_stream::media_stream))
        // Attach state
        .with_state(state)
}
