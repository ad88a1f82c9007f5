use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::messages::{ClientMessage, ServerMessage};
use crate::game::PlayerId;
use crate::room::{JoinOutcome, RoomRegistry};

/// A connection's seat in a room, recorded once a join succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomBinding {
    pub token: String,
    pub player: PlayerId,
}

/// Per-connection dispatcher: turns raw inbound frames into registry calls.
///
/// Owns no authoritative state of its own; everything lives behind the
/// registry. Unit-testable with nothing but an mpsc channel standing in for
/// the socket.
pub struct ClientSession {
    conn_id: Uuid,
    registry: Arc<RoomRegistry>,
    outbound: mpsc::UnboundedSender<String>,
    binding: Option<RoomBinding>,
}

impl ClientSession {
    pub fn new(registry: Arc<RoomRegistry>, outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            registry,
            outbound,
            binding: None,
        }
    }

    pub fn conn_id(&self) -> Uuid {
        self.conn_id
    }

    pub fn binding(&self) -> Option<&RoomBinding> {
        self.binding.as_ref()
    }

    /// Handles one inbound text frame. Never panics and never tears down the
    /// connection: a bad frame earns an ERROR reply and is otherwise dropped
    /// without touching any room's state.
    pub fn handle_text(&mut self, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.handle_message(message),
            Err(err) => {
                warn!(conn_id = %self.conn_id, error = %err, "Malformed client frame");
                self.reply(&ServerMessage::error("Malformed message"));
            }
        }
    }

    fn handle_message(&mut self, message: ClientMessage) {
        match message {
            ClientMessage::CreateRoom => {
                let outcome = self
                    .registry
                    .create_room(self.conn_id, self.outbound.clone());
                self.record(outcome);
            }
            ClientMessage::JoinRoom { room_id, user_id } => {
                let outcome = self.registry.join_room(
                    &room_id,
                    &user_id,
                    self.conn_id,
                    self.outbound.clone(),
                );
                self.record(outcome);
            }
            ClientMessage::Move { move_from, move_to } => {
                let Some(binding) = self.binding.clone() else {
                    debug!(conn_id = %self.conn_id, "MOVE before joining a room, dropped");
                    return;
                };
                self.registry
                    .apply_move(&binding.token, binding.player, move_from, move_to);
            }
            ClientMessage::RestartGame => {
                let Some(binding) = self.binding.clone() else {
                    debug!(conn_id = %self.conn_id, "RESTART_GAME before joining a room, dropped");
                    return;
                };
                self.registry.restart(&binding.token, binding.player);
            }
            ClientMessage::ModeChange { mode } => {
                let Some(binding) = self.binding.clone() else {
                    debug!(conn_id = %self.conn_id, "MODE_CHANGE before joining a room, dropped");
                    return;
                };
                self.registry.set_mode(&binding.token, binding.player, mode);
            }
        }
    }

    /// Called by the transport once the socket is gone, in any way.
    pub fn handle_disconnect(&mut self) {
        if let Some(binding) = self.binding.take() {
            self.registry.handle_disconnect(&binding.token, self.conn_id);
        }
    }

    fn record(&mut self, outcome: JoinOutcome) {
        if let JoinOutcome::Joined { token, player } = outcome {
            self.binding = Some(RoomBinding { token, player });
        }
    }

    fn reply(&self, message: &ServerMessage) {
        if let Ok(json) = serde_json::to_string(message) {
            let _ = self.outbound.send(json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RegistryConfig;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn session() -> (ClientSession, UnboundedReceiver<String>) {
        let registry = Arc::new(RoomRegistry::new(RegistryConfig::default()));
        session_on(&registry)
    }

    fn session_on(registry: &Arc<RoomRegistry>) -> (ClientSession, UnboundedReceiver<String>) {
        let (sender, inbox) = mpsc::unbounded_channel();
        (ClientSession::new(Arc::clone(registry), sender), inbox)
    }

    fn next(inbox: &mut UnboundedReceiver<String>) -> ServerMessage {
        serde_json::from_str(&inbox.try_recv().expect("expected a reply")).unwrap()
    }

    #[tokio::test]
    async fn create_room_binds_the_session() {
        let (mut session, mut inbox) = session();
        session.handle_text(r#"{"type":"CREATE_ROOM"}"#);

        let binding = session.binding().expect("session should be seated");
        assert_eq!(binding.player, PlayerId::P1);
        assert!(matches!(next(&mut inbox), ServerMessage::RoomJoined { .. }));
    }

    #[tokio::test]
    async fn malformed_frame_earns_an_error_and_keeps_the_session_usable() {
        let (mut session, mut inbox) = session();

        session.handle_text("not json at all");
        assert_eq!(
            next(&mut inbox),
            ServerMessage::Error {
                message: "Malformed message".to_string()
            }
        );

        session.handle_text(r#"{"type":"JOIN_ROOM","roomId":"room01","userId":"u1"}"#);
        assert!(matches!(next(&mut inbox), ServerMessage::RoomJoined { .. }));
    }

    #[tokio::test]
    async fn room_scoped_frames_before_any_join_are_dropped_silently() {
        let (mut session, mut inbox) = session();

        session.handle_text(r#"{"type":"MOVE","moveFrom":{"x":0,"y":0},"moveTo":{"x":1,"y":2}}"#);
        session.handle_text(r#"{"type":"RESTART_GAME"}"#);
        session.handle_text(r#"{"type":"MODE_CHANGE","mode":"easy"}"#);

        assert!(inbox.try_recv().is_err());
        assert!(session.binding().is_none());
    }

    #[tokio::test]
    async fn a_rejected_join_leaves_the_session_unbound() {
        let registry = Arc::new(RoomRegistry::new(RegistryConfig::default()));
        let (mut a, _inbox_a) = session_on(&registry);
        let (mut b, _inbox_b) = session_on(&registry);
        let (mut c, mut inbox_c) = session_on(&registry);

        a.handle_text(r#"{"type":"JOIN_ROOM","roomId":"room01","userId":"u1"}"#);
        b.handle_text(r#"{"type":"JOIN_ROOM","roomId":"room01","userId":"u2"}"#);
        c.handle_text(r#"{"type":"JOIN_ROOM","roomId":"room01","userId":"u3"}"#);

        assert_eq!(
            next(&mut inbox_c),
            ServerMessage::Error {
                message: "Room is full".to_string()
            }
        );
        assert!(c.binding().is_none());
    }

    #[tokio::test]
    async fn disconnect_without_a_binding_is_a_no_op() {
        let (mut session, _inbox) = session();
        session.handle_disconnect();
        assert!(session.binding().is_none());
    }
}
