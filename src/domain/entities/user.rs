//! User entity, the connection identity derived from it, and the repository trait.
//!
//! Maps to the `users` table in the database schema. Only the columns the
//! hub reads are modelled here; registration and profile editing live
//! outside this service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Represents a user account.
///
/// Maps to the `users` table:
/// - id: BIGINT PRIMARY KEY
/// - username: VARCHAR(100) NOT NULL UNIQUE
/// - avatar_url: TEXT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User ID (primary key)
    pub id: i64,

    /// Unique username
    pub username: String,

    /// URL to the user's avatar image
    pub avatar_url: Option<String>,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

/// The authenticated user bound to a live connection.
///
/// Immutable once attached; a connection carries at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub avatar_url: Option<String>,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            avatar_url: user.avatar_url,
        }
    }
}

/// Repository trait for User lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
}
