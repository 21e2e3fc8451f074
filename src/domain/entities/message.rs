//! Message entity and repository trait.
//!
//! Maps to the `messages` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Represents a persisted message in a channel.
///
/// Maps to the `messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - channel_id: BIGINT NOT NULL REFERENCES channels(id)
/// - author_id: BIGINT NOT NULL REFERENCES users(id)
/// - content: TEXT NOT NULL
/// - parent_message_id: BIGINT REFERENCES messages(id) -- For replies
/// - created_at: TIMESTAMPTZ NOT NULL
///
/// Immutable once created. Within a channel, `id` orders messages by
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Channel ID where the message was sent
    pub channel_id: i64,

    /// Author user ID
    pub author_id: i64,

    /// Message content
    pub content: String,

    /// ID of the message being replied to
    pub parent_message_id: Option<i64>,

    /// Timestamp when message was sent
    pub created_at: DateTime<Utc>,
}

/// A message about to be written. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub channel_id: i64,
    pub author_id: i64,
    pub content: String,
    pub parent_message_id: Option<i64>,
}

/// Repository trait for Message persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Durably create a message and return it with its assigned id.
    ///
    /// Successive calls for the same channel return strictly increasing ids.
    async fn create(&self, message: &NewMessage) -> Result<Message, AppError>;
}
