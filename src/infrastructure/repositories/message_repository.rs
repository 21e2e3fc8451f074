//! Message Repository Implementation
//!
//! PostgreSQL implementation of message persistence. Ids come from the
//! snowflake generator so that messages created through one repository are
//! strictly ordered by id. `created_at` is taken from the id itself so the
//! two orderings always agree.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Message, MessageRepository, NewMessage};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// PostgreSQL message repository implementation.
pub struct PgMessageRepository {
    pool: PgPool,
    ids: Arc<SnowflakeGenerator>,
}

impl PgMessageRepository {
    /// Creates a new PgMessageRepository with the given connection pool.
    pub fn new(pool: PgPool, ids: Arc<SnowflakeGenerator>) -> Self {
        Self { pool, ids }
    }
}

/// Internal row type for message queries.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    channel_id: i64,
    author_id: i64,
    content: String,
    parent_message_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    /// Converts database row to domain Message entity.
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            channel_id: self.channel_id,
            author_id: self.author_id,
            content: self.content,
            parent_message_id: self.parent_message_id,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: &NewMessage) -> Result<Message, AppError> {
        let started = Instant::now();
        let id = self.ids.generate();
        let created_at = self.ids.timestamp_of(id);

        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (id, channel_id, author_id, content, parent_message_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, channel_id, author_id, content, parent_message_id, created_at
            "#,
        )
        .bind(id)
        .bind(message.channel_id)
        .bind(message.author_id)
        .bind(&message.content)
        .bind(message.parent_message_id)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await;

        metrics::record_db_query("insert", "messages", started.elapsed().as_secs_f64());

        Ok(row?.into_message())
    }
}
