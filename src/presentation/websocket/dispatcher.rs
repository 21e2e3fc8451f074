//! Broadcast Dispatcher
//!
//! Fans one frame out to every subscriber of a channel. Delivery means
//! enqueueing on the recipient's bounded outbound queue; the socket write
//! itself happens on the recipient's writer task, so a stalled peer can
//! only fill its own queue.

use tokio::sync::mpsc::error::TrySendError;

use super::messages::ServerFrame;
use super::registry::{ConnectionId, ConnectionRegistry};
use super::subscriptions::SubscriptionTable;
use crate::infrastructure::metrics;

/// Per-recipient delivery failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("outbound queue is full")]
    QueueFull,

    #[error("connection writer has shut down")]
    Closed,

    #[error("connection is no longer registered")]
    UnknownConnection,
}

impl DeliveryError {
    /// Metric label
    pub fn reason(&self) -> &'static str {
        match self {
            Self::QueueFull => "queue_full",
            Self::Closed => "closed",
            Self::UnknownConnection => "unknown_connection",
        }
    }
}

/// Outcome of one broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub channel_id: i64,
    /// Size of the snapshot the broadcast was taken against
    pub recipients: usize,
    pub delivered: usize,
    pub failed: Vec<(ConnectionId, DeliveryError)>,
}

/// Enqueue a frame for a single connection.
pub fn deliver(
    registry: &ConnectionRegistry,
    id: ConnectionId,
    frame: ServerFrame,
) -> Result<(), DeliveryError> {
    let outbound = registry
        .outbound(id)
        .ok_or(DeliveryError::UnknownConnection)?;

    outbound.try_send(frame).map_err(|e| match e {
        TrySendError::Full(_) => DeliveryError::QueueFull,
        TrySendError::Closed(_) => DeliveryError::Closed,
    })
}

/// Dispatcher over a registry and a subscription table
pub struct Dispatcher<'a> {
    registry: &'a ConnectionRegistry,
    subscriptions: &'a SubscriptionTable,
}

impl<'a> Dispatcher<'a> {
    pub fn new(registry: &'a ConnectionRegistry, subscriptions: &'a SubscriptionTable) -> Self {
        Self {
            registry,
            subscriptions,
        }
    }

    /// Deliver `frame` to every connection subscribed to `channel_id` when
    /// the call starts. Each failed recipient is handed to `teardown` right
    /// away and delivery carries on with the rest.
    pub fn broadcast<F>(&self, channel_id: i64, frame: &ServerFrame, mut teardown: F) -> BroadcastReport
    where
        F: FnMut(ConnectionId),
    {
        let recipients = self.subscriptions.snapshot(channel_id);
        let mut report = BroadcastReport {
            channel_id,
            recipients: recipients.len(),
            delivered: 0,
            failed: Vec::new(),
        };

        for id in recipients {
            match deliver(self.registry, id, frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        connection_id = %id,
                        channel_id = channel_id,
                        error = %e,
                        "Broadcast delivery failed, tearing down connection"
                    );
                    metrics::record_delivery_failure(e.reason());
                    teardown(id);
                    report.failed.push((id, e));
                }
            }
        }

        metrics::record_broadcast(report.delivered);
        report
    }
}
