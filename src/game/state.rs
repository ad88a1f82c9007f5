// Authoritative game state for one room. Operations never mutate in place:
// each accepted transition returns a fresh snapshot that the room swaps in
// wholesale, so a broadcast can never observe a half-applied move.
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::rules::{valid_moves, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerId {
    P1,
    P2,
}

impl PlayerId {
    pub fn other(self) -> Self {
        match self {
            PlayerId::P1 => PlayerId::P2,
            PlayerId::P2 => PlayerId::P1,
        }
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerId::P1 => write!(f, "p1"),
            PlayerId::P2 => write!(f, "p2"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Playing,
    P1Wins,
    P2Wins,
}

impl GameStatus {
    fn win_for(player: PlayerId) -> Self {
        match player {
            PlayerId::P1 => GameStatus::P1Wins,
            PlayerId::P2 => GameStatus::P2Wins,
        }
    }
}

/// Per-player hint mode. Purely advisory to that player's client (controls
/// move-hint visibility); move validation deliberately ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Easy,
    Hardcore,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Invalid move origin")]
    InvalidOrigin,
    #[error("Invalid move")]
    IllegalMove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub p1_pos: Position,
    pub p2_pos: Position,
    #[serde(with = "square_set")]
    pub unavailable_squares: BTreeSet<Position>,
    pub current_player: PlayerId,
    pub status: GameStatus,
    pub p1_mode: Mode,
    pub p2_mode: Mode,
}

impl Default for GameState {
    /// The initial configuration: knights in opposite corners, both starting
    /// squares already burned, p1 to move.
    fn default() -> Self {
        Self {
            p1_pos: Position::new(0, 0),
            p2_pos: Position::new(7, 7),
            unavailable_squares: BTreeSet::from([Position::new(0, 0), Position::new(7, 7)]),
            current_player: PlayerId::P1,
            status: GameStatus::Playing,
            p1_mode: Mode::Hardcore,
            p2_mode: Mode::Hardcore,
        }
    }
}

impl GameState {
    pub fn position_of(&self, player: PlayerId) -> Position {
        match player {
            PlayerId::P1 => self.p1_pos,
            PlayerId::P2 => self.p2_pos,
        }
    }

    fn position_of_mut(&mut self, player: PlayerId) -> &mut Position {
        match player {
            PlayerId::P1 => &mut self.p1_pos,
            PlayerId::P2 => &mut self.p2_pos,
        }
    }

    /// The square currently occupied by the opponent of `current_player`.
    pub fn opponent_position(&self) -> Position {
        self.position_of(self.current_player.other())
    }

    /// Validates and applies one knight move, returning the next snapshot.
    ///
    /// Validation order: terminal freeze, turn, origin, legality. The origin
    /// check defends against stale client state. Nothing is mutated unless
    /// every check passes.
    pub fn apply_move(
        &self,
        acting: PlayerId,
        from: Position,
        to: Position,
    ) -> Result<Self, GameError> {
        // Terminal states are frozen; only a restart leaves them.
        if self.status != GameStatus::Playing {
            return Err(GameError::IllegalMove);
        }
        if acting != self.current_player {
            return Err(GameError::NotYourTurn);
        }
        if from != self.position_of(acting) {
            return Err(GameError::InvalidOrigin);
        }
        if !valid_moves(from, self).contains(&to) {
            return Err(GameError::IllegalMove);
        }

        let opponent = acting.other();
        let opponent_pos = self.position_of(opponent);

        let mut next = self.clone();
        *next.position_of_mut(acting) = to;
        // Set semantics: re-inserting an already-burned origin is a no-op.
        next.unavailable_squares.insert(from);
        next.current_player = opponent;

        if to == opponent_pos {
            // Capture ends the game immediately; no stalemate check needed.
            next.status = GameStatus::win_for(acting);
        } else if valid_moves(opponent_pos, &next).is_empty() {
            // The new current player is stuck, so the mover wins.
            next.status = GameStatus::win_for(acting);
        }

        Ok(next)
    }

    /// Resets to the initial configuration. Always permitted, in any status;
    /// restarting mid-game forfeits the result.
    pub fn restart(&self) -> Self {
        Self::default()
    }

    /// Updates only `acting`'s hint mode. Permitted in any status; never
    /// touches positions, turn order, or the game status.
    pub fn with_mode(&self, acting: PlayerId, mode: Mode) -> Self {
        let mut next = self.clone();
        match acting {
            PlayerId::P1 => next.p1_mode = mode,
            PlayerId::P2 => next.p2_mode = mode,
        }
        next
    }
}

/// Serializes the visited set as "x,y" value-keys, matching the wire format
/// the browser client renders from.
mod square_set {
    use std::collections::BTreeSet;

    use serde::de::Error as _;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::game::rules::Position;

    pub fn serialize<S: Serializer>(
        set: &BTreeSet<Position>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(set.len()))?;
        for pos in set {
            seq.serialize_element(&pos.to_key())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeSet<Position>, D::Error> {
        let keys = Vec::<String>::deserialize(deserializer)?;
        keys.iter()
            .map(|key| {
                Position::from_key(key)
                    .ok_or_else(|| D::Error::custom(format!("invalid square key: {key}")))
            })
            .collect()
    }
}
