// Test harness: channel-backed client sessions driven straight through the
// dispatch layer, no live sockets involved.
use std::sync::Arc;

use knightfall::{ClientSession, RegistryConfig, RoomRegistry, ServerMessage};
use tokio::sync::mpsc;

pub fn registry() -> Arc<RoomRegistry> {
    Arc::new(RoomRegistry::new(RegistryConfig::default()))
}

/// One simulated browser tab: a session plus the inbox the server writes to.
pub struct TestClient {
    pub session: ClientSession,
    inbox: mpsc::UnboundedReceiver<String>,
}

impl TestClient {
    pub fn connect(registry: &Arc<RoomRegistry>) -> Self {
        let (sender, inbox) = mpsc::unbounded_channel();
        Self {
            session: ClientSession::new(Arc::clone(registry), sender),
            inbox,
        }
    }

    /// Feeds one raw frame to the session, exactly as the transport would.
    pub fn send(&mut self, frame: &str) {
        self.session.handle_text(frame);
    }

    pub fn join(&mut self, room_id: &str, user_id: &str) {
        self.send(&format!(
            r#"{{"type":"JOIN_ROOM","roomId":"{room_id}","userId":"{user_id}"}}"#
        ));
    }

    pub fn move_knight(&mut self, from: (i8, i8), to: (i8, i8)) {
        self.send(&format!(
            r#"{{"type":"MOVE","moveFrom":{{"x":{},"y":{}}},"moveTo":{{"x":{},"y":{}}}}}"#,
            from.0, from.1, to.0, to.1
        ));
    }

    pub fn next_message(&mut self) -> ServerMessage {
        let raw = self.inbox.try_recv().expect("expected a server message");
        serde_json::from_str(&raw).expect("server sent malformed JSON")
    }

    pub fn clear_messages(&mut self) {
        while self.inbox.try_recv().is_ok() {}
    }

    pub fn assert_no_messages(&mut self) {
        assert!(
            self.inbox.try_recv().is_err(),
            "expected no pending messages"
        );
    }

    /// Simulates the tab closing: the transport reports the disconnect and
    /// the outbound channel goes away.
    pub fn disconnect(mut self) {
        self.session.handle_disconnect();
    }
}
