pub mod api;
pub mod game;
pub mod messages;
pub mod room;
pub mod user;

// Re-export all types
pub use api::*;
pub use game::*;
pub use messages::*;
pub use room::*;
pub use user::*;

/// Server-assigned user identifier (opaque string, not necessarily a UUID).
pub type UserId = String;

/// Short human-readable join code of a room.
pub type RoomCode = String;
