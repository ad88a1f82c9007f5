// Process-wide room table. Owned by the composition root and passed down
// explicitly through AppState; the core never reaches it through a global.
//
// The single mutex serializes all handling for a room, so two near-
// simultaneous moves can never both validate against the same pre-move
// snapshot. Nothing awaits while the lock is held.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::token::generate_token;
use crate::game::{GameError, GameState, Mode, PlayerId, Position};
use crate::websockets::ServerMessage;

/// Registry tuning knobs. Tests shrink the grace period or drive it with a
/// paused clock.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// How long a fully disconnected room is kept for reconnects.
    pub grace_period: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(30),
        }
    }
}

/// Outcome of a create/join attempt, as seen by the joining connection. The
/// wire replies are already sent by the time this is returned; the caller
/// only needs it to record its binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined { token: String, player: PlayerId },
    RoomFull,
}

/// The live connection currently filling a slot.
struct SlotConnection {
    conn_id: Uuid,
    sender: mpsc::UnboundedSender<String>,
}

impl SlotConnection {
    fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// One of the two fixed player roles in a room. The recorded user id outlives
/// the connection so the same browser can reclaim its seat after a refresh.
#[derive(Default)]
struct PlayerSlot {
    user_id: Option<String>,
    connection: Option<SlotConnection>,
}

impl PlayerSlot {
    fn is_open(&self) -> bool {
        self.connection.as_ref().is_some_and(SlotConnection::is_open)
    }

    fn bind(&mut self, conn_id: Uuid, sender: mpsc::UnboundedSender<String>) {
        self.connection = Some(SlotConnection { conn_id, sender });
    }
}

struct Room {
    state: GameState,
    p1: PlayerSlot,
    p2: PlayerSlot,
    deletion_timer: Option<JoinHandle<()>>,
}

impl Room {
    fn new() -> Self {
        Self {
            state: GameState::default(),
            p1: PlayerSlot::default(),
            p2: PlayerSlot::default(),
            deletion_timer: None,
        }
    }

    fn slot(&self, player: PlayerId) -> &PlayerSlot {
        match player {
            PlayerId::P1 => &self.p1,
            PlayerId::P2 => &self.p2,
        }
    }

    fn slot_mut(&mut self, player: PlayerId) -> &mut PlayerSlot {
        match player {
            PlayerId::P1 => &mut self.p1,
            PlayerId::P2 => &mut self.p2,
        }
    }

    fn is_abandoned(&self) -> bool {
        !self.p1.is_open() && !self.p2.is_open()
    }

    /// Best-effort delivery to one slot. A closed or missing peer is not an
    /// error and never disturbs room state.
    fn send_to(&self, player: PlayerId, message: &ServerMessage) {
        if let Some(connection) = self.slot(player).connection.as_ref() {
            if let Ok(json) = serde_json::to_string(message) {
                let _ = connection.sender.send(json);
            }
        }
    }

    fn broadcast(&self, message: &ServerMessage) {
        self.send_to(PlayerId::P1, message);
        self.send_to(PlayerId::P2, message);
    }
}

/// Process-wide mapping from room token to room record. Purely in-memory;
/// a process restart loses all rooms.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Room>>,
    config: RegistryConfig,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl RoomRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// CREATE_ROOM: allocate a fresh token and bind the sender as p1.
    ///
    /// The wire message carries no user id, so the seat is only reclaimable
    /// while this connection stays open.
    #[instrument(skip(self, sender))]
    pub fn create_room(&self, conn_id: Uuid, sender: mpsc::UnboundedSender<String>) -> JoinOutcome {
        let mut rooms = self.rooms.lock().unwrap();

        let mut token = generate_token();
        while rooms.contains_key(&token) {
            token = generate_token();
        }

        let mut room = Room::new();
        room.p1.bind(conn_id, sender);
        room.send_to(
            PlayerId::P1,
            &ServerMessage::room_joined(token.clone(), PlayerId::P1, room.state.clone()),
        );
        rooms.insert(token.clone(), room);

        info!(room_id = %token, "Room created");
        JoinOutcome::Joined {
            token,
            player: PlayerId::P1,
        }
    }

    /// JOIN_ROOM resolution: create-if-absent, then reconnect matching on the
    /// stable user id, then first free seat (p1 before p2), else room full.
    #[instrument(skip(self, sender))]
    pub fn join_room(
        &self,
        token: &str,
        user_id: &str,
        conn_id: Uuid,
        sender: mpsc::UnboundedSender<String>,
    ) -> JoinOutcome {
        let token = token.to_uppercase();
        let mut rooms = self.rooms.lock().unwrap();

        let Some(room) = rooms.get_mut(&token) else {
            // Unknown token: joining acts as "create or join".
            let mut room = Room::new();
            room.p1.user_id = Some(user_id.to_string());
            room.p1.bind(conn_id, sender);
            room.send_to(
                PlayerId::P1,
                &ServerMessage::room_joined(token.clone(), PlayerId::P1, room.state.clone()),
            );
            rooms.insert(token.clone(), room);

            info!(room_id = %token, user_id = %user_id, "Room created on first join");
            return JoinOutcome::Joined {
                token,
                player: PlayerId::P1,
            };
        };

        // Someone is interacting with the room again; keep it alive.
        if let Some(timer) = room.deletion_timer.take() {
            debug!(room_id = %token, "Cancelling pending room deletion");
            timer.abort();
        }

        // Reconnect path: a recorded identity always gets its old seat back,
        // overwriting any stale connection still bound to it.
        for player in [PlayerId::P1, PlayerId::P2] {
            if room.slot(player).user_id.as_deref() == Some(user_id) {
                room.slot_mut(player).bind(conn_id, sender);
                room.send_to(
                    player,
                    &ServerMessage::room_joined(token.clone(), player, room.state.clone()),
                );
                room.send_to(player.other(), &ServerMessage::player_joined(player));

                info!(room_id = %token, user_id = %user_id, player = %player, "Player reconnected");
                return JoinOutcome::Joined { token, player };
            }
        }

        // New identity: fill p1 before p2, treating a closed connection as a
        // vacant seat.
        for player in [PlayerId::P1, PlayerId::P2] {
            if !room.slot(player).is_open() {
                let slot = room.slot_mut(player);
                slot.user_id = Some(user_id.to_string());
                slot.bind(conn_id, sender);
                room.send_to(
                    player,
                    &ServerMessage::room_joined(token.clone(), player, room.state.clone()),
                );
                room.send_to(player.other(), &ServerMessage::player_joined(player));

                info!(room_id = %token, user_id = %user_id, player = %player, "Player joined");
                return JoinOutcome::Joined { token, player };
            }
        }

        warn!(room_id = %token, user_id = %user_id, "Join rejected, room is full");
        send_raw(&sender, &ServerMessage::error("Room is full"));
        JoinOutcome::RoomFull
    }

    /// MOVE: validate against the current snapshot and broadcast the result.
    #[instrument(skip(self))]
    pub fn apply_move(&self, token: &str, acting: PlayerId, from: Position, to: Position) {
        self.transition(token, acting, |state| state.apply_move(acting, from, to));
    }

    /// RESTART_GAME: back to the initial configuration, any slot, any status.
    #[instrument(skip(self))]
    pub fn restart(&self, token: &str, acting: PlayerId) {
        self.transition(token, acting, |state| Ok(state.restart()));
    }

    /// MODE_CHANGE: per-player hint mode, broadcast like any other update.
    #[instrument(skip(self))]
    pub fn set_mode(&self, token: &str, acting: PlayerId, mode: Mode) {
        self.transition(token, acting, |state| Ok(state.with_mode(acting, mode)));
    }

    /// Runs one state-machine operation under the room lock. On success the
    /// snapshot is replaced wholesale and both live slots get STATE_UPDATE;
    /// on rejection only the actor hears about it and the snapshot stays.
    fn transition(
        &self,
        token: &str,
        acting: PlayerId,
        operation: impl FnOnce(&GameState) -> Result<GameState, GameError>,
    ) {
        let mut rooms = self.rooms.lock().unwrap();
        let Some(room) = rooms.get_mut(token) else {
            debug!(room_id = %token, "Action on unknown room dropped");
            return;
        };

        match operation(&room.state) {
            Ok(next) => {
                room.state = next;
                room.broadcast(&ServerMessage::state_update(room.state.clone()));
            }
            Err(err) => {
                warn!(room_id = %token, player = %acting, error = %err, "Rejected action");
                room.send_to(acting, &ServerMessage::error(err.to_string()));
            }
        }
    }

    /// Connection teardown for whichever slot `conn_id` still occupies. Never
    /// touches game state, only connectivity; schedules deletion once both
    /// slots are dark.
    #[instrument(skip(self))]
    pub fn handle_disconnect(self: &Arc<Self>, token: &str, conn_id: Uuid) {
        let mut rooms = self.rooms.lock().unwrap();
        let Some(room) = rooms.get_mut(token) else {
            return;
        };

        let occupied = [PlayerId::P1, PlayerId::P2].into_iter().find(|player| {
            room.slot(*player)
                .connection
                .as_ref()
                .is_some_and(|connection| connection.conn_id == conn_id)
        });
        let Some(player) = occupied else {
            // A newer connection already took this seat over.
            return;
        };

        room.slot_mut(player).connection = None;
        info!(room_id = %token, player = %player, "Player disconnected");
        room.send_to(player.other(), &ServerMessage::opponent_disconnected());

        if room.is_abandoned() {
            info!(
                room_id = %token,
                grace_secs = self.config.grace_period.as_secs(),
                "Room fully disconnected, scheduling deletion"
            );
            let registry = Arc::clone(self);
            let token = token.to_string();
            let grace = self.config.grace_period;
            let timer = tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                registry.remove_if_abandoned(&token);
            });
            if let Some(stale) = room.deletion_timer.replace(timer) {
                stale.abort();
            }
        }
    }

    /// Deletion-timer expiry. Re-checks connectivity so a join that raced the
    /// abort cannot lose the room.
    fn remove_if_abandoned(&self, token: &str) {
        let mut rooms = self.rooms.lock().unwrap();
        let Some(room) = rooms.get(token) else {
            return;
        };
        if !room.is_abandoned() {
            return;
        }
        rooms.remove(token);
        info!(room_id = %token, "Room deleted after grace period");
    }

    pub fn room_exists(&self, token: &str) -> bool {
        self.rooms.lock().unwrap().contains_key(&token.to_uppercase())
    }

    /// Snapshot of a room's authoritative state, if the room exists.
    pub fn game_state(&self, token: &str) -> Option<GameState> {
        self.rooms
            .lock()
            .unwrap()
            .get(&token.to_uppercase())
            .map(|room| room.state.clone())
    }
}

fn send_raw(sender: &mpsc::UnboundedSender<String>, message: &ServerMessage) {
    if let Ok(json) = serde_json::to_string(message) {
        let _ = sender.send(json);
    }
}
