//! Process-wide event channel: one WebSocket per logged-in session, shared by
//! every view through named-event subscriptions.

use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use quiz_core::{HandlerId, HandlerRegistry};
use quiz_types::{ChannelFrame, ClientEvent, ServerEvent};

use crate::config::Config;

mod connection;
pub mod reconnect;

use connection::ConnectionTask;
pub use reconnect::ReconnectPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Disconnected,
    Connecting,
    Reconnecting { attempt: u32 },
    Connected,
    /// Reconnect budget exhausted; a new `connect` is required.
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("could not encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub url: String,
    pub policy: ReconnectPolicy,
    pub connect_timeout: Duration,
}

impl From<&Config> for ChannelConfig {
    fn from(config: &Config) -> Self {
        Self {
            url: config.socket_url.clone(),
            policy: ReconnectPolicy::new(config.reconnect_attempts, config.reconnect_delay),
            connect_timeout: config.connect_timeout,
        }
    }
}

pub(crate) fn lock_registry(
    handlers: &Mutex<HandlerRegistry<ServerEvent>>,
) -> MutexGuard<'_, HandlerRegistry<ServerEvent>> {
    handlers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct EventChannel {
    config: ChannelConfig,
    handlers: Arc<Mutex<HandlerRegistry<ServerEvent>>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<ChannelFrame>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    user_id: Mutex<Option<String>>,
    status: watch::Sender<ChannelStatus>,
}

impl EventChannel {
    pub fn new(config: ChannelConfig) -> Self {
        let (status, _) = watch::channel(ChannelStatus::Disconnected);
        Self {
            config,
            handlers: Arc::new(Mutex::new(HandlerRegistry::new())),
            outbound: Mutex::new(None),
            task: Mutex::new(None),
            user_id: Mutex::new(None),
            status,
        }
    }

    /// Open the connection in the background, replacing any previous one.
    /// Authentication and the personal `user:join` are sent on every (re)connect.
    pub fn connect(&self, token: &str, user_id: &str) {
        self.stop_task();
        info!("Connecting event channel for user {}", user_id);

        let (tx, rx) = mpsc::unbounded_channel();
        let task = ConnectionTask {
            url: self.config.url.clone(),
            token: token.to_string(),
            user_id: user_id.to_string(),
            policy: self.config.policy,
            connect_timeout: self.config.connect_timeout,
            handlers: self.handlers.clone(),
            outbound: rx,
            status: self.status.clone(),
        };

        *lock(&self.outbound) = Some(tx);
        *lock(&self.user_id) = Some(user_id.to_string());
        *lock(&self.task) = Some(tokio::spawn(task.run()));
    }

    /// Close the connection and forget every subscription. Safe to repeat.
    pub fn disconnect(&self) {
        if self.stop_task() {
            info!("Event channel disconnected");
        }
        lock_registry(&self.handlers).clear();
        *lock(&self.user_id) = None;
        self.status.send_replace(ChannelStatus::Disconnected);
    }

    fn stop_task(&self) -> bool {
        lock(&self.outbound).take();
        match lock(&self.task).take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    pub fn on<F>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        lock_registry(&self.handlers).on(event, handler)
    }

    /// Remove one handler, or all handlers for `event` when `id` is `None`.
    pub fn off(&self, event: &str, id: Option<HandlerId>) -> usize {
        lock_registry(&self.handlers).off(event, id)
    }

    pub fn handler_count(&self, event: &str) -> usize {
        lock_registry(&self.handlers).handler_count(event)
    }

    /// Queue an outbound event. Dropped when the channel is not connected.
    pub fn send(&self, event: ClientEvent) -> bool {
        if !self.is_connected() {
            debug!("Not connected; dropping {}", event.name());
            return false;
        }
        match lock(&self.outbound).as_ref() {
            Some(tx) => tx.send(event.to_frame()).is_ok(),
            None => {
                debug!("No connection task; dropping {}", event.name());
                false
            }
        }
    }

    pub fn emit(&self, event: &str, data: Value) -> bool {
        self.send(ClientEvent::Custom {
            event: event.to_string(),
            data,
        })
    }

    pub fn join_room(&self, room_code: &str) -> bool {
        info!("Joining room channel {}", room_code);
        self.send(ClientEvent::RoomJoin {
            room_code: room_code.to_string(),
        })
    }

    pub fn leave_room(&self) -> bool {
        info!("Leaving room channel");
        self.send(ClientEvent::RoomLeave)
    }

    pub fn status(&self) -> ChannelStatus {
        *self.status.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ChannelStatus::Connected
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ChannelStatus> {
        self.status.subscribe()
    }

    pub fn user_id(&self) -> Option<String> {
        lock(&self.user_id).clone()
    }
}

impl Drop for EventChannel {
    fn drop(&mut self) {
        self.stop_task();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
