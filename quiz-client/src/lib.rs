pub mod api;
pub mod channel;
pub mod config;
pub mod render;
pub mod room_view;
pub mod session;
pub mod telemetry;
pub mod timer;

pub use api::{ApiClient, ApiError};
pub use channel::{ChannelConfig, ChannelError, ChannelStatus, EventChannel, ReconnectPolicy};
pub use config::{Config, ConfigError};
pub use room_view::{RoomChannel, RoomError, RoomExit, RoomGateway, RoomView, RoomViewState};
pub use session::{AuthContext, Session, SessionError};
pub use timer::PhaseTimer;

use std::sync::Arc;

use quiz_persistence::{SessionRepository, StorageError, connect_and_migrate};

/// Everything a front-end needs, wired from one [`Config`].
pub struct AppContext {
    pub config: Config,
    pub auth: AuthContext,
}

impl AppContext {
    /// Build the context with a persistent session store.
    pub async fn new(config: Config) -> Result<Self, StorageError> {
        let db = connect_and_migrate(&config.session_db_url).await?;
        Ok(Self::with_store(config, Some(SessionRepository::new(db))))
    }

    /// Build the context; `None` keeps the session in memory only.
    pub fn with_store(config: Config, store: Option<SessionRepository>) -> Self {
        let api = ApiClient::new(config.api_url.clone());
        let channel = Arc::new(EventChannel::new(ChannelConfig::from(&config)));
        Self {
            auth: AuthContext::new(api, channel, store),
            config,
        }
    }

    pub fn api(&self) -> &ApiClient {
        self.auth.api()
    }

    pub fn channel(&self) -> &Arc<EventChannel> {
        self.auth.channel()
    }

    /// Open the room view for `code` as the logged-in user.
    pub async fn open_room(&self, code: &str) -> Result<RoomView, RoomError> {
        let session = self.auth.require_session().await?;
        let gateway: Arc<dyn RoomGateway> = Arc::new(self.api().clone());
        let channel: Arc<dyn RoomChannel> = self.channel().clone();
        RoomView::open(gateway, channel, code, &session.user.id).await
    }
}
