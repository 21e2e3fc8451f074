//! Channel entity and repository trait.
//!
//! Maps to the `channels` table in the database schema.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Channel types stored in `channels.channel_type`.
///
/// ```sql
/// channel_type VARCHAR(50) NOT NULL CHECK (channel_type IN ('text', 'voice'))
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// A text channel
    #[default]
    Text,
    /// A voice channel
    Voice,
}

impl ChannelType {
    /// Convert from database string representation.
    ///
    /// Returns `None` for values this service does not know about.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "voice" => Some(Self::Voice),
            _ => None,
        }
    }
}

/// Represents a channel messages are posted to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Channel ID (primary key)
    pub id: i64,

    /// Channel name
    pub name: String,

    /// Channel type
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
}

impl Channel {
    /// Check if this channel accepts text messages.
    pub fn is_text_based(&self) -> bool {
        matches!(self.channel_type, ChannelType::Text)
    }
}

/// Repository trait for Channel lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// Find a channel by ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<Channel>, AppError>;
}
