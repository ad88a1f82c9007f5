// Public API - what other modules can use
pub use registry::{JoinOutcome, RegistryConfig, RoomRegistry};

// Internal modules
mod registry;
mod token;
