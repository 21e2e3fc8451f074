//! WebSocket Gateway
//!
//! Owns the connection registry and the subscription table and is the only
//! place that mutates them, so the teardown ordering below holds everywhere.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::dispatcher::{self, BroadcastReport, DeliveryError, Dispatcher};
use super::messages::ServerFrame;
use super::registry::{BindError, ConnectionId, ConnectionRegistry};
use super::subscriptions::SubscriptionTable;
use crate::domain::Identity;
use crate::infrastructure::metrics;

/// The connection was torn down while an operation was in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection {0} is no longer registered")]
pub struct ConnectionGone(pub ConnectionId);

/// WebSocket gateway managing all connections
pub struct Gateway {
    registry: ConnectionRegistry,
    subscriptions: SubscriptionTable,
    /// Frames buffered per connection
    outbound_capacity: usize,
}

impl Gateway {
    pub fn new(outbound_capacity: usize) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            subscriptions: SubscriptionTable::new(),
            outbound_capacity: outbound_capacity.max(1),
        }
    }

    /// Register a new connection. The receiver feeds its writer task.
    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<ServerFrame>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.outbound_capacity);
        self.registry.register(id, tx);
        metrics::connection_opened();

        tracing::debug!(connection_id = %id, "Connection registered");
        (id, rx)
    }

    /// Tear a connection down: identity first, then every subscription.
    ///
    /// Idempotent. Returns `true` only for the call that removed it.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let removed = self.registry.remove(id);
        let channels = self.subscriptions.unsubscribe(id);

        let Some(removed) = removed else {
            return false;
        };
        metrics::connection_closed(removed.identity.is_some());

        tracing::info!(
            connection_id = %id,
            user_id = removed.identity.as_ref().map(|i| i.user_id),
            channels = ?channels,
            connected_secs = removed.connected_for.as_secs(),
            "Connection torn down"
        );
        true
    }

    pub fn bind(&self, id: ConnectionId, identity: Identity) -> Result<(), BindError> {
        self.registry.bind(id, identity)?;
        metrics::connection_authenticated();
        Ok(())
    }

    pub fn identity_of(&self, id: ConnectionId) -> Option<Identity> {
        self.registry.identity_of(id)
    }

    /// Token the socket loop selects on; cancelled by `disconnect`, including
    /// teardowns triggered by a failed broadcast delivery.
    pub fn eviction(&self, id: ConnectionId) -> Option<CancellationToken> {
        self.registry.eviction(id)
    }

    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.registry.contains(id)
    }

    /// Subscribe a live connection to a channel.
    ///
    /// `disconnect` removes the registry entry before clearing subscriptions,
    /// so re-checking registration after inserting catches a teardown that
    /// raced with this call; the stray entry is rolled back.
    pub fn subscribe(&self, channel_id: i64, id: ConnectionId) -> Result<bool, ConnectionGone> {
        let added = self.subscriptions.subscribe(channel_id, id);
        if !self.registry.contains(id) {
            self.subscriptions.unsubscribe(id);
            return Err(ConnectionGone(id));
        }
        Ok(added)
    }

    /// Drop a single subscription
    pub fn leave(&self, channel_id: i64, id: ConnectionId) -> bool {
        self.subscriptions.unsubscribe_channel(channel_id, id)
    }

    /// Send a frame to one connection
    pub fn send_to(&self, id: ConnectionId, frame: ServerFrame) -> Result<(), DeliveryError> {
        dispatcher::deliver(&self.registry, id, frame)
    }

    /// Fan a frame out to the current subscribers of a channel, tearing down
    /// every recipient that cannot take it.
    pub fn broadcast(&self, channel_id: i64, frame: &ServerFrame) -> BroadcastReport {
        Dispatcher::new(&self.registry, &self.subscriptions).broadcast(channel_id, frame, |id| {
            self.disconnect(id);
        })
    }

    pub fn snapshot(&self, channel_id: i64) -> Vec<ConnectionId> {
        self.subscriptions.snapshot(channel_id)
    }

    pub fn channels_of(&self, id: ConnectionId) -> Vec<i64> {
        self.subscriptions.channels_of(id)
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    pub fn authenticated_count(&self) -> usize {
        self.registry.authenticated_count()
    }

    pub fn channel_count(&self) -> usize {
        self.subscriptions.channel_count()
    }
}
