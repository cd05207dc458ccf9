pub mod handler_registry;
pub mod notifications;
pub mod results;
pub mod room_session;
pub mod room_store;
pub mod validation;

// Re-export main components
pub use handler_registry::*;
pub use notifications::*;
pub use results::*;
pub use room_session::*;
pub use room_store::*;
pub use validation::*;
