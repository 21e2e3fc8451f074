//! Connection Registry
//!
//! Every live connection from upgrade until teardown, with the outbound
//! queue its writer task drains, the token that stops its socket loop and,
//! once authenticated, its identity.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::messages::ServerFrame;
use crate::domain::Identity;

/// Handle used to enqueue frames for one connection's writer task
pub type OutboundSender = mpsc::Sender<ServerFrame>;

/// Opaque identifier of one live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Binding failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("connection is not registered")]
    UnknownConnection,

    #[error("connection is already bound to user {user_id}")]
    AlreadyBound { user_id: i64 },
}

struct ConnectionEntry {
    outbound: OutboundSender,
    /// Cancelled when the entry is removed
    evicted: CancellationToken,
    identity: Option<Identity>,
    connected_at: Instant,
}

/// What was left of a connection when it was removed
#[derive(Debug)]
pub struct RemovedConnection {
    pub identity: Option<Identity>,
    pub connected_for: Duration,
}

/// Registry of live connections
///
/// Backed by a sharded map; every operation locks one shard briefly and
/// never across an await point.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    /// Entries with an identity; only changed under the entry's shard lock
    authenticated: AtomicUsize,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly upgraded connection
    pub fn register(&self, id: ConnectionId, outbound: OutboundSender) {
        self.connections.insert(
            id,
            ConnectionEntry {
                outbound,
                evicted: CancellationToken::new(),
                identity: None,
                connected_at: Instant::now(),
            },
        );
    }

    /// Attach an identity. Never overwrites an existing one.
    pub fn bind(&self, id: ConnectionId, identity: Identity) -> Result<(), BindError> {
        let mut entry = self
            .connections
            .get_mut(&id)
            .ok_or(BindError::UnknownConnection)?;

        if let Some(existing) = &entry.identity {
            return Err(BindError::AlreadyBound {
                user_id: existing.user_id,
            });
        }

        entry.identity = Some(identity);
        self.authenticated.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn identity_of(&self, id: ConnectionId) -> Option<Identity> {
        self.connections
            .get(&id)
            .and_then(|entry| entry.identity.clone())
    }

    /// Remove a connection. Safe for unknown and never-bound connections.
    ///
    /// Dropping the entry drops the registry's outbound sender, which ends
    /// the connection's writer task once its queue is drained. The eviction
    /// token is cancelled so the socket loop stops reading as well.
    pub fn remove(&self, id: ConnectionId) -> Option<RemovedConnection> {
        let (_, entry) = self.connections.remove(&id)?;
        if entry.identity.is_some() {
            self.authenticated.fetch_sub(1, Ordering::Relaxed);
        }
        entry.evicted.cancel();

        Some(RemovedConnection {
            identity: entry.identity,
            connected_for: entry.connected_at.elapsed(),
        })
    }

    /// Token cancelled once the connection is removed
    pub fn eviction(&self, id: ConnectionId) -> Option<CancellationToken> {
        self.connections.get(&id).map(|entry| entry.evicted.clone())
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Clone of the connection's outbound handle, taken without holding the
    /// shard lock beyond the lookup.
    pub fn outbound(&self, id: ConnectionId) -> Option<OutboundSender> {
        self.connections.get(&id).map(|entry| entry.outbound.clone())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn authenticated_count(&self) -> usize {
        self.authenticated.load(Ordering::Relaxed)
    }
}
