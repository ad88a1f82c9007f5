// Library crate for the knightfall game server
// This file exposes the public API for integration tests

pub mod game;
pub mod room;
pub mod shared;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use game::{GameError, GameState, GameStatus, Mode, PlayerId, Position};
pub use room::{JoinOutcome, RegistryConfig, RoomRegistry};
pub use shared::{build_router, AppState};
pub use websockets::{ClientMessage, ClientSession, ServerMessage};
