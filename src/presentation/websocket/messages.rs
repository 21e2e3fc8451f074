//! WebSocket Message Types
//!
//! Every frame on the wire is a JSON object `{"type": ..., "payload": ...}`.
//! Inbound frames are decoded in two steps: the envelope first, then the
//! payload according to its `type`, so an unknown type can be told apart
//! from a malformed payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Identity, Message};

/// Inbound frame type names
pub const JOIN_CHANNEL: &str = "join_channel";
pub const NEW_MESSAGE: &str = "new_message";
pub const LEAVE_CHANNEL: &str = "leave_channel";

/// Untyped inbound envelope
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// `join_channel` payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinChannelPayload {
    pub channel_id: i64,
    pub token: String,
}

/// `new_message` payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessagePayload {
    pub channel_id: i64,
    pub content: String,
    #[serde(default)]
    pub parent_message_id: Option<i64>,
}

/// `leave_channel` payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveChannelPayload {
    pub channel_id: i64,
}

/// Decoded client -> server frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    JoinChannel(JoinChannelPayload),
    NewMessage(NewMessagePayload),
    LeaveChannel(LeaveChannelPayload),
}

/// Inbound decoding failures. None of them are fatal to the connection.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("unknown frame type '{0}'")]
    UnknownType(String),

    #[error("invalid '{kind}' payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientFrame {
    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let envelope: Envelope = serde_json::from_str(text).map_err(FrameError::Malformed)?;
        Self::decode(envelope)
    }

    /// Decode the payload of an envelope according to its type.
    pub fn decode(envelope: Envelope) -> Result<Self, FrameError> {
        let Envelope { kind, payload } = envelope;

        let decoded = match kind.as_str() {
            JOIN_CHANNEL => serde_json::from_value(payload).map(Self::JoinChannel),
            NEW_MESSAGE => serde_json::from_value(payload).map(Self::NewMessage),
            LEAVE_CHANNEL => serde_json::from_value(payload).map(Self::LeaveChannel),
            _ => return Err(FrameError::UnknownType(kind.clone())),
        };

        decoded.map_err(|source| FrameError::InvalidPayload { kind, source })
    }

    /// Wire name of this frame's type
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinChannel(_) => JOIN_CHANNEL,
            Self::NewMessage(_) => NEW_MESSAGE,
            Self::LeaveChannel(_) => LEAVE_CHANNEL,
        }
    }
}

/// Server -> client frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerFrame {
    JoinSuccess(ChannelAck),
    LeaveSuccess(ChannelAck),
    Error(ErrorPayload),
    NewMessage(MessageBroadcast),
}

impl ServerFrame {
    pub fn join_success(channel_id: i64) -> Self {
        Self::JoinSuccess(ChannelAck {
            channel_id,
            message: "subscribed to channel".into(),
        })
    }

    pub fn leave_success(channel_id: i64) -> Self {
        Self::LeaveSuccess(ChannelAck {
            channel_id,
            message: "unsubscribed from channel".into(),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }

    pub fn new_message(message: &Message, author: &Identity) -> Self {
        Self::NewMessage(MessageBroadcast::new(message, author))
    }
}

/// `join_success` / `leave_success` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAck {
    pub channel_id: i64,
    pub message: String,
}

/// `error` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Message fan-out payload: the persisted message plus its author.
///
/// Message ids are snowflakes and exceed the integer range JavaScript
/// clients can represent exactly, so they go out as strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBroadcast {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub channel_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<String>,
    pub author: AuthorPayload,
}

impl MessageBroadcast {
    pub fn new(message: &Message, author: &Identity) -> Self {
        Self {
            id: message.id.to_string(),
            content: message.content.clone(),
            created_at: message.created_at,
            channel_id: message.channel_id,
            parent_message_id: message.parent_message_id.map(|id| id.to_string()),
            author: AuthorPayload::from(author),
        }
    }
}

/// Abbreviated author
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorPayload {
    pub id: i64,
    pub username: String,
    #[serde(rename = "avatarURL", skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl From<&Identity> for AuthorPayload {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.user_id,
            username: identity.username.clone(),
            avatar_url: identity.avatar_url.clone(),
        }
    }
}
