//! # Domain Entities
//!
//! The entities the hub reads and writes through the persistence store.
//!
//! - **User**: account lookup, and the `Identity` a connection is bound to
//! - **Channel**: the destination of a message, with its text/voice type
//! - **Message**: a persisted chat message
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer.

mod channel;
mod message;
mod user;

pub use channel::{Channel, ChannelRepository, ChannelType};
pub use message::{Message, MessageRepository, NewMessage};
pub use user::{Identity, User, UserRepository};

#[cfg(test)]
pub use channel::MockChannelRepository;
#[cfg(test)]
pub use message::MockMessageRepository;
#[cfg(test)]
pub use user::MockUserRepository;
