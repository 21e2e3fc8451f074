//! Repository Implementations
//!
//! PostgreSQL implementations of the domain repository traits.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{
//!     PgChannelRepository, PgMessageRepository, PgUserRepository,
//! };
//!
//! fn setup_repositories(pool: PgPool, ids: Arc<SnowflakeGenerator>) {
//!     let users = PgUserRepository::new(pool.clone());
//!     let channels = PgChannelRepository::new(pool.clone());
//!     let messages = PgMessageRepository::new(pool, ids);
//! }
//! ```

pub mod channel_repository;
pub mod message_repository;
pub mod user_repository;

pub use channel_repository::PgChannelRepository;
pub use message_repository::PgMessageRepository;
pub use user_repository::PgUserRepository;
