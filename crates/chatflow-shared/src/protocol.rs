use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SharedError;
use crate::types::InboundMessage;

/// Envelope used on the wire: `{ "event": <name>, "data": <payload> }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Payload of the peer typing notifications
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypingPayload {
    pub username: String,
}

/// Announcement of a successfully uploaded file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileShare {
    pub text: String,
    pub filename: String,
    pub original_name: String,
}

/// Events emitted by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Full roster, replaces whatever the client displayed before
    UserUpdate(Vec<String>),
    Message(InboundMessage),
    UserTyping(TypingPayload),
    UserStoppedTyping(TypingPayload),
    /// The session is not authenticated; the client must hand off to login
    AuthRequired,
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserUpdate(_) => "user_update",
            Self::Message(_) => "message",
            Self::UserTyping(_) => "user_typing",
            Self::UserStoppedTyping(_) => "user_stopped_typing",
            Self::AuthRequired => "auth_required",
        }
    }

    /// Decode a text frame received from the channel.
    pub fn from_frame(text: &str) -> Result<Self, SharedError> {
        let frame: Frame = serde_json::from_str(text)?;
        let data = frame.data;
        let event = match frame.event.as_str() {
            "user_update" => Self::UserUpdate(payload(&frame.event, data)?),
            "message" => Self::Message(payload(&frame.event, data)?),
            "user_typing" => Self::UserTyping(payload(&frame.event, data)?),
            "user_stopped_typing" => Self::UserStoppedTyping(payload(&frame.event, data)?),
            "auth_required" => Self::AuthRequired,
            _ => return Err(SharedError::UnknownEvent(frame.event)),
        };
        Ok(event)
    }

    /// Encode as a text frame. Used by test servers and loopback channels.
    pub fn to_frame(&self) -> Result<String, SharedError> {
        let data = match self {
            Self::UserUpdate(users) => serde_json::to_value(users)?,
            Self::Message(msg) => serde_json::to_value(msg)?,
            Self::UserTyping(p) | Self::UserStoppedTyping(p) => serde_json::to_value(p)?,
            Self::AuthRequired => Value::Null,
        };
        encode(self.name(), data)
    }
}

/// Events emitted by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Announce this client. Servers that identify users by session ignore the name.
    Join { username: Option<String> },
    Message { text: String },
    FileMessage(FileShare),
    Typing,
    StopTyping,
    UserActive,
    UserAway,
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Message { .. } => "message",
            Self::FileMessage(_) => "file_message",
            Self::Typing => "typing",
            Self::StopTyping => "stop_typing",
            Self::UserActive => "user_active",
            Self::UserAway => "user_away",
        }
    }

    pub fn to_frame(&self) -> Result<String, SharedError> {
        let data = match self {
            Self::Join { username } => serde_json::to_value(username)?,
            Self::Message { text } => serde_json::json!({ "text": text }),
            Self::FileMessage(share) => serde_json::to_value(share)?,
            Self::Typing | Self::StopTyping | Self::UserActive | Self::UserAway => Value::Null,
        };
        encode(self.name(), data)
    }

    /// Decode a client frame. Used by test servers and loopback channels.
    pub fn from_frame(text: &str) -> Result<Self, SharedError> {
        let frame: Frame = serde_json::from_str(text)?;
        let data = frame.data;
        let event = match frame.event.as_str() {
            "join" => Self::Join {
                username: payload(&frame.event, data)?,
            },
            "message" => {
                #[derive(Deserialize)]
                struct Text {
                    text: String,
                }
                let t: Text = payload(&frame.event, data)?;
                Self::Message { text: t.text }
            }
            "file_message" => Self::FileMessage(payload(&frame.event, data)?),
            "typing" => Self::Typing,
            "stop_typing" => Self::StopTyping,
            "user_active" => Self::UserActive,
            "user_away" => Self::UserAway,
            _ => return Err(SharedError::UnknownEvent(frame.event)),
        };
        Ok(event)
    }
}

fn payload<T: serde::de::DeserializeOwned>(event: &str, data: Value) -> Result<T, SharedError> {
    serde_json::from_value(data).map_err(|source| SharedError::Payload {
        event: event.to_string(),
        source,
    })
}

fn encode(event: &str, data: Value) -> Result<String, SharedError> {
    let frame = Frame {
        event: event.to_string(),
        data,
    };
    Ok(serde_json::to_string(&frame)?)
}
