use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::reconnect::ReconnectPolicy;
use super::{ChannelError, ChannelStatus, lock_registry};
use quiz_core::HandlerRegistry;
use quiz_types::{ChannelFrame, ClientEvent, ServerEvent};

/// Everything the background task needs; moved into it on spawn.
pub(crate) struct ConnectionTask {
    pub url: String,
    pub token: String,
    pub user_id: String,
    pub policy: ReconnectPolicy,
    pub connect_timeout: Duration,
    pub handlers: Arc<Mutex<HandlerRegistry<ServerEvent>>>,
    pub outbound: mpsc::UnboundedReceiver<ChannelFrame>,
    pub status: watch::Sender<ChannelStatus>,
}

enum SessionEnd {
    /// The owner dropped the outbound sender; stop for good.
    Shutdown,
    /// The socket went away; try again.
    Dropped,
}

impl ConnectionTask {
    pub async fn run(mut self) {
        let mut attempt = 0u32;

        loop {
            self.status.send_replace(if attempt == 0 {
                ChannelStatus::Connecting
            } else {
                ChannelStatus::Reconnecting { attempt }
            });

            match self.open().await {
                Ok(socket) => {
                    info!("Event channel connected to {}", self.url);
                    attempt = 0;

                    match self.serve(socket).await {
                        SessionEnd::Shutdown => {
                            self.status.send_replace(ChannelStatus::Disconnected);
                            return;
                        }
                        SessionEnd::Dropped => {
                            info!("Event channel disconnected");
                            self.status.send_replace(ChannelStatus::Disconnected);
                        }
                    }
                }
                Err(e) => warn!("Event channel connect error: {}", e),
            }

            attempt += 1;
            match self.policy.delay_for(attempt) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => {
                    error!(
                        "Event channel gave up after {} reconnect attempts",
                        self.policy.max_attempts
                    );
                    self.status.send_replace(ChannelStatus::Failed);
                    return;
                }
            }
        }
    }

    async fn open(
        &self,
    ) -> Result<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        ChannelError,
    > {
        let (socket, _response) =
            tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()))
                .await
                .map_err(|_| ChannelError::Timeout(self.connect_timeout))??;
        Ok(socket)
    }

    async fn serve<S>(&mut self, socket: S) -> SessionEnd
    where
        S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
            + futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error>
            + Unpin,
    {
        let (mut sink, mut stream) = socket.split();

        // Identify on every (re)connect
        let handshake = [
            ClientEvent::Authenticate {
                token: self.token.clone(),
            },
            ClientEvent::UserJoin {
                user_id: self.user_id.clone(),
            },
        ];
        for event in handshake {
            if let Err(e) = send_frame(&mut sink, &event.to_frame()).await {
                warn!("Failed to send {}: {}", event.name(), e);
                return SessionEnd::Dropped;
            }
        }
        self.status.send_replace(ChannelStatus::Connected);

        loop {
            tokio::select! {
                frame = self.outbound.recv() => {
                    let Some(frame) = frame else {
                        let _ = sink.close().await;
                        return SessionEnd::Shutdown;
                    };
                    if let Err(e) = send_frame(&mut sink, &frame).await {
                        warn!("Failed to send {}: {}", frame.event, e);
                        return SessionEnd::Dropped;
                    }
                }
                message = stream.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => dispatch(&self.handlers, &text),
                        Some(Ok(Message::Close(_))) | None => return SessionEnd::Dropped,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("Event channel error: {}", e);
                            return SessionEnd::Dropped;
                        }
                    }
                }
            }
        }
    }
}

async fn send_frame<K>(sink: &mut K, frame: &ChannelFrame) -> Result<(), ChannelError>
where
    K: futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let text = frame.to_text()?;
    debug!("-> {}", frame.event);
    sink.send(Message::Text(text)).await?;
    Ok(())
}

/// Decode one inbound frame and hand it to every subscriber of its name.
pub(crate) fn dispatch(handlers: &Mutex<HandlerRegistry<ServerEvent>>, text: &str) {
    let event = match ServerEvent::decode(text) {
        Ok(event) => event,
        Err(e) => {
            warn!("Dropping inbound frame: {}", e);
            return;
        }
    };

    match &event {
        ServerEvent::AuthSuccess => info!("Event channel authenticated"),
        ServerEvent::AuthError(payload) => {
            error!("Event channel authentication failed: {}", payload.message)
        }
        _ => debug!("<- {}", event.name()),
    }

    // Invoke outside the lock so handlers may (un)subscribe
    let subscribers = lock_registry(handlers).handlers_for(event.name());
    for handler in subscribers {
        handler(&event);
    }
}
