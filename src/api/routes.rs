use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers::{health, messages, recording, render};
use super::state::AppState;
use super::websocket::ws_handler;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Local-only service; the extension talks to it from its own origin
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost"),
            HeaderValue::from_static("http://127.0.0.1"),
            HeaderValue::from_static("http://localhost:8765"),
            HeaderValue::from_static("http://127.0.0.1:8765"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Recording endpoints
        .route("/recording/start", post(recording::start_recording))
        .route(
            "/recording/:session_id/stop",
            post(recording::stop_recording),
        )
        .route(
            "/recording/:session_id/cancel",
            post(recording::cancel_recording),
        )
        .route(
            "/recording/:session_id/status",
            get(recording::get_recording_status),
        )
        .route(
            "/recording/:session_id/events",
            get(recording::get_events)
                .put(recording::replace_events)
                .post(recording::append_event),
        )
        .route(
            "/recording/:session_id/capture",
            post(recording::capture_event),
        )
        .route(
            "/recording/:session_id/context",
            post(recording::context_action),
        )
        // Page recorder message contract
        .route("/messages", post(messages::handle_message))
        // Stateless helpers
        .route("/render", post(render::render_script))
        .route("/selector", post(render::resolve_selector))
        // WebSocket
        .route("/ws/:client_id", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
