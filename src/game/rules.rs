// Pure move geometry for the 8x8 board. No I/O and no state of its own, so
// everything here is safe to call speculatively (e.g. for client move hints).
use serde::{Deserialize, Serialize};

use super::state::GameState;

pub const BOARD_SIZE: i8 = 8;

/// A square on the board. Compared by value; a position has no identity of
/// its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i8,
    pub y: i8,
}

impl Position {
    pub const fn new(x: i8, y: i8) -> Self {
        Self { x, y }
    }

    /// Wire key used for the visited-square set, e.g. "3,5".
    pub fn to_key(self) -> String {
        format!("{},{}", self.x, self.y)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let (x, y) = key.split_once(',')?;
        Some(Self {
            x: x.parse().ok()?,
            y: y.parse().ok()?,
        })
    }

    pub fn in_bounds(self) -> bool {
        (0..BOARD_SIZE).contains(&self.x) && (0..BOARD_SIZE).contains(&self.y)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
];

/// All 8 L-jump candidates from `pos`, unfiltered (squares may be off-board).
pub fn possible_knight_moves(pos: Position) -> [Position; 8] {
    KNIGHT_OFFSETS.map(|(dx, dy)| Position::new(pos.x + dx, pos.y + dy))
}

/// Candidates from `pos` that are on the board and either unvisited or equal
/// to the current opponent's square (a capture is always a legal target, no
/// matter the square's visit history).
///
/// The opponent is derived from `state.current_player`, i.e. it always means
/// "the other player's current square" regardless of who asks.
pub fn valid_moves(pos: Position, state: &GameState) -> Vec<Position> {
    let opponent_pos = state.opponent_position();

    possible_knight_moves(pos)
        .into_iter()
        .filter(|candidate| candidate.in_bounds())
        .filter(|candidate| {
            !state.unavailable_squares.contains(candidate) || *candidate == opponent_pos
        })
        .collect()
}
