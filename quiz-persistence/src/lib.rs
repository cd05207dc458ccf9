pub mod connection;
pub mod entities;
pub mod repositories;

pub use connection::*;
pub use repositories::session_repository::{SessionRepository, StoredSession};

use sea_orm::DbErr;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Stored value for '{key}' is not valid: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize value for '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
