use serde::{Deserialize, Serialize};

use crate::game::{GameState, Mode, PlayerId, Position};

/// Client -> server frames, tagged by "type" exactly as the browser client
/// sends them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    CreateRoom,
    JoinRoom { room_id: String, user_id: String },
    Move { move_from: Position, move_to: Position },
    RestartGame,
    ModeChange { mode: Mode },
}

/// Server -> client frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Sent only to the joining connection.
    RoomJoined {
        room_id: String,
        player_id: PlayerId,
        game_state: GameState,
    },
    /// Sent to the other slot when someone (re)joins.
    PlayerJoined { player_id: PlayerId },
    /// Broadcast to both slots after any accepted state-mutating action.
    StateUpdate { game_state: GameState },
    /// Sent only to the offending connection.
    Error { message: String },
    OpponentDisconnected,
}

impl ServerMessage {
    pub fn room_joined(room_id: String, player_id: PlayerId, game_state: GameState) -> Self {
        Self::RoomJoined {
            room_id,
            player_id,
            game_state,
        }
    }

    pub fn player_joined(player_id: PlayerId) -> Self {
        Self::PlayerJoined { player_id }
    }

    pub fn state_update(game_state: GameState) -> Self {
        Self::StateUpdate { game_state }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn opponent_disconnected() -> Self {
        Self::OpponentDisconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_the_browser_client_frames() {
        assert_eq!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"CREATE_ROOM"}"#).unwrap(),
            ClientMessage::CreateRoom
        );
        assert_eq!(
            serde_json::from_str::<ClientMessage>(
                r#"{"type":"JOIN_ROOM","roomId":"AB12CD","userId":"user-1"}"#
            )
            .unwrap(),
            ClientMessage::JoinRoom {
                room_id: "AB12CD".to_string(),
                user_id: "user-1".to_string()
            }
        );
        assert_eq!(
            serde_json::from_str::<ClientMessage>(
                r#"{"type":"MOVE","moveFrom":{"x":0,"y":0},"moveTo":{"x":1,"y":2}}"#
            )
            .unwrap(),
            ClientMessage::Move {
                move_from: Position::new(0, 0),
                move_to: Position::new(1, 2)
            }
        );
        assert_eq!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"RESTART_GAME"}"#).unwrap(),
            ClientMessage::RestartGame
        );
        assert_eq!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"MODE_CHANGE","mode":"easy"}"#)
                .unwrap(),
            ClientMessage::ModeChange { mode: Mode::Easy }
        );
    }

    #[test]
    fn rejects_unknown_or_incomplete_frames() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"TELEPORT"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"JOIN_ROOM"}"#).is_err());
        assert!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"MOVE","moveFrom":{"x":0,"y":0}}"#)
                .is_err()
        );
        assert!(serde_json::from_str::<ClientMessage>("[]").is_err());
    }

    #[test]
    fn server_frames_serialize_with_the_expected_tags() {
        let error = serde_json::to_value(ServerMessage::error("Not your turn")).unwrap();
        assert_eq!(error, json!({"type": "ERROR", "message": "Not your turn"}));

        let gone = serde_json::to_value(ServerMessage::opponent_disconnected()).unwrap();
        assert_eq!(gone, json!({"type": "OPPONENT_DISCONNECTED"}));

        let joined = serde_json::to_value(ServerMessage::room_joined(
            "AB12CD".to_string(),
            PlayerId::P2,
            GameState::default(),
        ))
        .unwrap();
        assert_eq!(joined["type"], "ROOM_JOINED");
        assert_eq!(joined["roomId"], "AB12CD");
        assert_eq!(joined["playerId"], "p2");
        assert_eq!(joined["gameState"]["currentPlayer"], "p1");

        let update =
            serde_json::to_value(ServerMessage::state_update(GameState::default())).unwrap();
        assert_eq!(update["type"], "STATE_UPDATE");
        assert_eq!(
            update["gameState"]["unavailableSquares"],
            json!(["0,0", "7,7"])
        );
    }
}
