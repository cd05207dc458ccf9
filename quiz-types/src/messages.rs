use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::{GameResult, Notification, PlayerScore, Question, Room, RoomCode, UserId};

/// Event names carried on the channel, shared by both directions.
pub mod event_names {
    pub const AUTH_AUTHENTICATE: &str = "auth:authenticate";
    pub const USER_JOIN: &str = "user:join";
    pub const ROOM_JOIN: &str = "room:join";
    pub const ROOM_LEAVE: &str = "room:leave";

    pub const AUTH_SUCCESS: &str = "auth:success";
    pub const AUTH_ERROR: &str = "auth:error";
    pub const ROOM_UPDATED: &str = "room:updated";
    pub const GAME_STARTED: &str = "game:started";
    pub const GAME_QUESTION: &str = "game:question";
    pub const GAME_ANSWER_REVEAL: &str = "game:answer-reveal";
    pub const GAME_SCORES: &str = "game:scores";
    pub const GAME_ENDED: &str = "game:ended";
    pub const PLAYER_ANSWERED: &str = "player:answered";
    pub const ROOM_KICKED: &str = "room:kicked";
    pub const ROOM_DELETED: &str = "room:deleted";
    pub const NOTIFICATION_NEW: &str = "notification:new";
}

use event_names::*;

/// One text message on the event channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChannelFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl ChannelFrame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MessagePayload {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AnswerRevealPayload {
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GameEndedPayload {
    #[serde(default)]
    pub results: Vec<GameResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlayerAnsweredPayload {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NotificationPayload {
    pub notification: Notification,
}

/// Inbound events pushed by the server, one variant per event name.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    AuthSuccess,
    AuthError(MessagePayload),
    RoomUpdated(Room),
    GameStarted,
    Question(Question),
    AnswerReveal(AnswerRevealPayload),
    Scores(Vec<PlayerScore>),
    GameEnded(GameEndedPayload),
    PlayerAnswered(PlayerAnsweredPayload),
    Kicked(MessagePayload),
    RoomDeleted(MessagePayload),
    NotificationNew(NotificationPayload),
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("Unknown event '{0}'")]
    UnknownEvent(String),
    #[error("Invalid payload for '{event}': {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

fn payload<T: DeserializeOwned>(data: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(data)
}

impl ServerEvent {
    /// All inbound event names, in the order the room view subscribes to them.
    pub const ROOM_EVENTS: [&'static str; 9] = [
        ROOM_UPDATED,
        GAME_STARTED,
        GAME_QUESTION,
        GAME_ANSWER_REVEAL,
        GAME_SCORES,
        GAME_ENDED,
        PLAYER_ANSWERED,
        ROOM_KICKED,
        ROOM_DELETED,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::AuthSuccess => AUTH_SUCCESS,
            ServerEvent::AuthError(_) => AUTH_ERROR,
            ServerEvent::RoomUpdated(_) => ROOM_UPDATED,
            ServerEvent::GameStarted => GAME_STARTED,
            ServerEvent::Question(_) => GAME_QUESTION,
            ServerEvent::AnswerReveal(_) => GAME_ANSWER_REVEAL,
            ServerEvent::Scores(_) => GAME_SCORES,
            ServerEvent::GameEnded(_) => GAME_ENDED,
            ServerEvent::PlayerAnswered(_) => PLAYER_ANSWERED,
            ServerEvent::Kicked(_) => ROOM_KICKED,
            ServerEvent::RoomDeleted(_) => ROOM_DELETED,
            ServerEvent::NotificationNew(_) => NOTIFICATION_NEW,
        }
    }

    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let frame = ChannelFrame::from_text(text).map_err(FrameError::Malformed)?;
        Self::from_frame(frame)
    }

    pub fn from_frame(frame: ChannelFrame) -> Result<Self, FrameError> {
        let ChannelFrame { event, data } = frame;

        let parsed = match event.as_str() {
            AUTH_SUCCESS => Ok(ServerEvent::AuthSuccess),
            // Payload is `{}` and carries nothing we use
            GAME_STARTED => Ok(ServerEvent::GameStarted),
            AUTH_ERROR => payload(data).map(ServerEvent::AuthError),
            ROOM_UPDATED => payload(data).map(ServerEvent::RoomUpdated),
            GAME_QUESTION => payload(data).map(ServerEvent::Question),
            GAME_ANSWER_REVEAL => payload(data).map(ServerEvent::AnswerReveal),
            GAME_SCORES => payload(data).map(ServerEvent::Scores),
            GAME_ENDED => payload(data).map(ServerEvent::GameEnded),
            PLAYER_ANSWERED => payload(data).map(ServerEvent::PlayerAnswered),
            ROOM_KICKED => payload(data).map(ServerEvent::Kicked),
            ROOM_DELETED => payload(data).map(ServerEvent::RoomDeleted),
            NOTIFICATION_NEW => payload(data).map(ServerEvent::NotificationNew),
            _ => return Err(FrameError::UnknownEvent(event.clone())),
        };

        parsed.map_err(|source| FrameError::InvalidPayload { event, source })
    }

    /// Encode as a frame, the way the server sends it.
    pub fn to_frame(&self) -> Result<ChannelFrame, serde_json::Error> {
        let data = match self {
            ServerEvent::AuthSuccess => Value::Null,
            ServerEvent::GameStarted => Value::Object(Default::default()),
            ServerEvent::AuthError(p) => serde_json::to_value(p)?,
            ServerEvent::RoomUpdated(room) => serde_json::to_value(room)?,
            ServerEvent::Question(q) => serde_json::to_value(q)?,
            ServerEvent::AnswerReveal(p) => serde_json::to_value(p)?,
            ServerEvent::Scores(scores) => serde_json::to_value(scores)?,
            ServerEvent::GameEnded(p) => serde_json::to_value(p)?,
            ServerEvent::PlayerAnswered(p) => serde_json::to_value(p)?,
            ServerEvent::Kicked(p) => serde_json::to_value(p)?,
            ServerEvent::RoomDeleted(p) => serde_json::to_value(p)?,
            ServerEvent::NotificationNew(p) => serde_json::to_value(p)?,
        };
        Ok(ChannelFrame::new(self.name(), data))
    }
}

/// Outbound events sent by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Authenticate { token: String },
    UserJoin { user_id: UserId },
    RoomJoin { room_code: RoomCode },
    RoomLeave,
    Custom { event: String, data: Value },
}

impl ClientEvent {
    pub fn name(&self) -> &str {
        match self {
            ClientEvent::Authenticate { .. } => AUTH_AUTHENTICATE,
            ClientEvent::UserJoin { .. } => USER_JOIN,
            ClientEvent::RoomJoin { .. } => ROOM_JOIN,
            ClientEvent::RoomLeave => ROOM_LEAVE,
            ClientEvent::Custom { event, .. } => event,
        }
    }

    pub fn to_frame(&self) -> ChannelFrame {
        let data = match self {
            ClientEvent::Authenticate { token } => Value::String(token.clone()),
            ClientEvent::UserJoin { user_id } => Value::String(user_id.clone()),
            ClientEvent::RoomJoin { room_code } => Value::String(room_code.clone()),
            ClientEvent::RoomLeave => Value::Null,
            ClientEvent::Custom { data, .. } => data.clone(),
        };
        ChannelFrame::new(self.name(), data)
    }

    /// Parse a frame sent by a client; used by servers and test backends.
    pub fn from_frame(frame: ChannelFrame) -> Result<Self, FrameError> {
        let ChannelFrame { event, data } = frame;
        let as_string = |data: Value| payload::<String>(data);

        let parsed = match event.as_str() {
            AUTH_AUTHENTICATE => as_string(data).map(|token| ClientEvent::Authenticate { token }),
            USER_JOIN => as_string(data).map(|user_id| ClientEvent::UserJoin { user_id }),
            ROOM_JOIN => as_string(data).map(|room_code| ClientEvent::RoomJoin { room_code }),
            ROOM_LEAVE => Ok(ClientEvent::RoomLeave),
            _ => {
                return Ok(ClientEvent::Custom {
                    event: event.clone(),
                    data,
                });
            }
        };

        parsed.map_err(|source| FrameError::InvalidPayload { event, source })
    }
}
