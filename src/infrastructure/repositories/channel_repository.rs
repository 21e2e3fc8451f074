//! Channel Repository Implementation
//!
//! PostgreSQL lookup of channel metadata used for message policy checks.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{Channel, ChannelRepository, ChannelType};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// PostgreSQL channel repository implementation.
#[derive(Clone)]
pub struct PgChannelRepository {
    pool: PgPool,
}

impl PgChannelRepository {
    /// Create a new PgChannelRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ChannelRow {
    id: i64,
    name: String,
    channel_type: String,
}

impl ChannelRow {
    fn into_channel(self) -> Result<Channel, AppError> {
        let channel_type = ChannelType::parse(&self.channel_type).ok_or_else(|| {
            AppError::Internal(format!(
                "channel {} has unknown type '{}'",
                self.id, self.channel_type
            ))
        })?;

        Ok(Channel {
            id: self.id,
            name: self.name,
            channel_type,
        })
    }
}

#[async_trait]
impl ChannelRepository for PgChannelRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Channel>, AppError> {
        let started = Instant::now();

        let row = sqlx::query_as::<_, ChannelRow>(
            r#"
            SELECT id, name, channel_type
            FROM channels
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;

        metrics::record_db_query("select", "channels", started.elapsed().as_secs_f64());

        row?.map(ChannelRow::into_channel).transpose()
    }
}
