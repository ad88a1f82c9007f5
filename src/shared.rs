use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::room::RoomRegistry;
use crate::websockets::websocket_handler;

/// Shared application state. The registry is the only process-wide mutable
/// resource; it is built once at the composition root and injected here
/// rather than reached through a global.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }
}

/// Builds the HTTP surface: a health probe and the game WebSocket endpoint.
/// Page delivery and room-token display belong to the frontend.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "knightfall" }))
        .route("/ws", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
