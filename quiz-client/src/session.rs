use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use validator::ValidationErrors;

use crate::api::{ApiClient, ApiError};
use crate::channel::EventChannel;
use quiz_core::{ChangePasswordForm, LoginForm, RegisterForm, VerifyEmailForm};
use quiz_persistence::{SessionRepository, StorageError, StoredSession};
use quiz_types::{AuthResponse, ProfileUpdate, User, UserStatsPatch};

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: User,
    pub token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Not logged in")]
    NotAuthenticated,
    #[error("Session expired, please log in again")]
    Expired,
    #[error("{}", quiz_core::describe_errors(.0))]
    Invalid(#[from] ValidationErrors),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Deserialize)]
struct TokenClaims {
    exp: Option<u64>,
}

/// `exp` claim of a JWT, read without verifying the signature.
pub fn token_expiry(token: &str) -> Option<u64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<TokenClaims>(&bytes).ok()?.exp
}

pub fn is_token_expired(token: &str, now_secs: u64) -> bool {
    token_expiry(token).is_some_and(|exp| exp <= now_secs)
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Who is logged in. Persists across restarts and owns the channel lifecycle.
pub struct AuthContext {
    api: ApiClient,
    channel: Arc<EventChannel>,
    store: Option<SessionRepository>,
    session: RwLock<Option<Session>>,
}

impl AuthContext {
    pub fn new(api: ApiClient, channel: Arc<EventChannel>, store: Option<SessionRepository>) -> Self {
        Self {
            api,
            channel,
            store,
            session: RwLock::new(None),
        }
    }

    /// Load a persisted session and reconnect the channel if it is still valid.
    pub async fn restore(&self) -> Result<Option<User>, SessionError> {
        let Some(store) = &self.store else {
            return Ok(None);
        };

        let stored = match store.load_session().await {
            Ok(Some(stored)) => stored,
            Ok(None) => return Ok(None),
            Err(StorageError::Corrupt { key, source }) => {
                warn!("Discarding unreadable persisted '{}': {}", key, source);
                store.clear_session().await?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let StoredSession { token, user } = stored;
        self.api.set_token(Some(token.clone()));

        if is_token_expired(&token, now_secs()) {
            info!("Persisted session for {} has expired", user.username);
        } else {
            info!("Restored session for {}", user.username);
            self.channel.connect(&token, &user.id);
        }

        *self.session.write().await = Some(Session {
            user: user.clone(),
            token,
        });
        Ok(Some(user))
    }

    pub async fn login(&self, form: LoginForm) -> Result<AuthResponse, SessionError> {
        let request = form.into_request()?;
        let response = self.api.login(&request).await?;
        self.establish(&response).await?;
        Ok(response)
    }

    pub async fn register(&self, form: RegisterForm) -> Result<AuthResponse, SessionError> {
        let request = form.into_request()?;
        let response = self.api.register(&request).await?;
        self.establish(&response).await?;
        Ok(response)
    }

    async fn establish(&self, response: &AuthResponse) -> Result<(), SessionError> {
        let AuthResponse { user, token, .. } = response;
        info!("Logged in as {}", user.username);

        self.api.set_token(Some(token.clone()));
        if let Some(store) = &self.store {
            store.save_session(token, user).await?;
        }
        *self.session.write().await = Some(Session {
            user: user.clone(),
            token: token.clone(),
        });

        self.channel.connect(token, &user.id);
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), SessionError> {
        if let Some(session) = self.session.write().await.take() {
            info!("Logging out {}", session.user.username);
        }
        self.api.set_token(None);
        self.channel.disconnect();
        if let Some(store) = &self.store {
            store.clear_session().await?;
        }
        Ok(())
    }

    /// Route guard: the current session, if present and not expired.
    pub async fn require_session(&self) -> Result<Session, SessionError> {
        let session = self
            .session
            .read()
            .await
            .clone()
            .ok_or(SessionError::NotAuthenticated)?;

        if is_token_expired(&session.token, now_secs()) {
            debug!("Rejecting expired session for {}", session.user.id);
            return Err(SessionError::Expired);
        }
        Ok(session)
    }

    pub async fn current_user(&self) -> Option<User> {
        self.session.read().await.as_ref().map(|s| s.user.clone())
    }

    pub async fn update_user(&self, user: User) -> Result<(), SessionError> {
        {
            let mut guard = self.session.write().await;
            let Some(session) = guard.as_mut() else {
                return Err(SessionError::NotAuthenticated);
            };
            session.user = user.clone();
        }
        if let Some(store) = &self.store {
            store.update_user(&user).await?;
        }
        Ok(())
    }

    pub async fn update_stats(&self, patch: &UserStatsPatch) -> Result<(), SessionError> {
        let mut user = self
            .current_user()
            .await
            .ok_or(SessionError::NotAuthenticated)?;
        user.stats.apply(patch);
        self.update_user(user).await
    }

    /// Re-read the profile from the server into the cached session.
    pub async fn refresh_profile(&self) -> Result<User, SessionError> {
        self.require_session().await?;
        let user = self.api.me().await?;
        self.update_user(user.clone()).await?;
        Ok(user)
    }

    /// Confirm the account with the emailed code and mark the cached profile verified.
    pub async fn verify_email(&self, form: VerifyEmailForm) -> Result<Option<String>, SessionError> {
        let otp = form.into_otp()?;
        let session = self.require_session().await?;
        let message = self.api.verify_email(&otp).await?;

        let mut user = session.user;
        user.is_verified = Some(true);
        self.update_user(user).await?;
        Ok(message)
    }

    pub async fn change_password(
        &self,
        form: ChangePasswordForm,
    ) -> Result<Option<String>, SessionError> {
        let request = form.into_request()?;
        self.require_session().await?;
        Ok(self.api.change_password(&request).await?)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, SessionError> {
        self.require_session().await?;
        let user = self.api.update_profile(update).await?;
        self.update_user(user.clone()).await?;
        Ok(user)
    }

    /// Upload a new avatar image. The cached profile takes the server's user
    /// when returned, otherwise just the new avatar path.
    pub async fn upload_avatar(
        &self,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<User, SessionError> {
        let session = self.require_session().await?;
        let payload = self.api.upload_avatar(file_name, mime, bytes).await?;

        let user = match (payload.user, payload.avatar) {
            (Some(user), _) => user,
            (None, Some(avatar)) => User {
                avatar,
                ..session.user
            },
            (None, None) => {
                warn!("Avatar upload returned neither a user nor a path");
                session.user
            }
        };
        self.update_user(user.clone()).await?;
        Ok(user)
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn channel(&self) -> &Arc<EventChannel> {
        &self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with(claims: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(claims)
        )
    }

    #[test]
    fn test_token_expiry_reads_exp_claim() {
        let token = jwt_with(r#"{"id":"u1","exp":1700000000}"#);
        assert_eq!(token_expiry(&token), Some(1_700_000_000));
        assert!(is_token_expired(&token, 1_700_000_001));
        assert!(!is_token_expired(&token, 1_600_000_000));
    }

    #[test]
    fn test_opaque_tokens_never_expire_locally() {
        assert_eq!(token_expiry("not-a-jwt"), None);
        assert!(!is_token_expired("not-a-jwt", u64::MAX));

        let no_exp = jwt_with(r#"{"id":"u1"}"#);
        assert!(!is_token_expired(&no_exp, u64::MAX));
    }
}
