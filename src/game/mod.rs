// Public API
pub use rules::{possible_knight_moves, valid_moves, Position, BOARD_SIZE};
pub use state::{GameError, GameState, GameStatus, Mode, PlayerId};

// Internal modules
mod rules;
mod state;
