use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue, DatabaseConnection, EntityTrait};
use tracing::{debug, warn};

use crate::StorageError;
use crate::entities::{local_storage, prelude::*};
use quiz_types::User;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Bearer token and cached profile restored on start.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub token: String,
    pub user: User,
}

pub struct SessionRepository {
    db: DatabaseConnection,
}

impl SessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let model = LocalStorage::find_by_id(key.to_string())
            .one(&self.db)
            .await?;
        Ok(model.map(|m| m.value))
    }

    /// Insert or overwrite `key`.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let model = local_storage::ActiveModel {
            key: ActiveValue::Set(key.to_string()),
            value: ActiveValue::Set(value.to_string()),
            updated_at: ActiveValue::Set(chrono::Utc::now()),
        };

        LocalStorage::insert(model)
            .on_conflict(
                OnConflict::column(local_storage::Column::Key)
                    .update_columns([
                        local_storage::Column::Value,
                        local_storage::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let result = LocalStorage::delete_by_id(key.to_string())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn save_session(&self, token: &str, user: &User) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(user).map_err(|source| StorageError::Serialize {
            key: USER_KEY.to_string(),
            source,
        })?;

        self.set(TOKEN_KEY, token).await?;
        self.set(USER_KEY, &user_json).await?;
        debug!("Persisted session for {}", user.id);
        Ok(())
    }

    /// Both keys must be present; a lone token or lone user is no session.
    pub async fn load_session(&self) -> Result<Option<StoredSession>, StorageError> {
        let token = self.get(TOKEN_KEY).await?;
        let user_json = self.get(USER_KEY).await?;

        let (token, user_json) = match (token, user_json) {
            (Some(token), Some(user_json)) => (token, user_json),
            (None, None) => return Ok(None),
            _ => {
                warn!("Incomplete persisted session; ignoring");
                return Ok(None);
            }
        };

        let user = serde_json::from_str(&user_json).map_err(|source| StorageError::Corrupt {
            key: USER_KEY.to_string(),
            source,
        })?;

        Ok(Some(StoredSession { token, user }))
    }

    pub async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(user).map_err(|source| StorageError::Serialize {
            key: USER_KEY.to_string(),
            source,
        })?;
        self.set(USER_KEY, &user_json).await
    }

    pub async fn clear_session(&self) -> Result<(), StorageError> {
        self.remove(TOKEN_KEY).await?;
        self.remove(USER_KEY).await?;
        Ok(())
    }
}
