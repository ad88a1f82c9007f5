use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::session::ClientSession;
use super::socket::Connection;
use crate::shared::AppState;

/// WebSocket endpoint: GET /ws
///
/// No authentication: the stable user id arrives later in JOIN_ROOM and is a
/// reconnect hint, not a credential.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(app_state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, app_state))
}

/// Handle the upgraded WebSocket connection
async fn handle_websocket_connection(socket: axum::extract::ws::WebSocket, app_state: AppState) {
    // Outbound channel (registry -> client); the registry holds the sender
    // once this connection is seated in a room.
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();

    let session = ClientSession::new(app_state.registry.clone(), outbound_sender);
    let conn_id = session.conn_id();
    info!(conn_id = %conn_id, "WebSocket connection established");

    let connection = Connection::new(session, Box::new(socket), outbound_receiver);
    match connection.run().await {
        Ok(()) => {
            info!(conn_id = %conn_id, "WebSocket connection closed cleanly");
        }
        Err(e) => {
            warn!(conn_id = %conn_id, error = ?e, "WebSocket connection error");
        }
    }
}
