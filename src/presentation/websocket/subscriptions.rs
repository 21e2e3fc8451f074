//! Subscription Table
//!
//! Channel id -> connections subscribed to it, plus the reverse index used
//! at teardown. A connection may be subscribed to any number of channels.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use super::registry::ConnectionId;

#[derive(Default)]
struct Inner {
    channels: HashMap<i64, HashSet<ConnectionId>>,
    memberships: HashMap<ConnectionId, HashSet<i64>>,
}

/// Channel subscriptions
///
/// One mutex guards both maps so they never disagree. Critical sections are
/// plain map operations; callers get copies, never a view into the sets.
#[derive(Default)]
pub struct SubscriptionTable {
    inner: Mutex<Inner>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a connection to a channel. Returns `false` if it already was.
    pub fn subscribe(&self, channel_id: i64, conn: ConnectionId) -> bool {
        let mut inner = self.inner.lock();
        let added = inner.channels.entry(channel_id).or_default().insert(conn);
        if added {
            inner.memberships.entry(conn).or_default().insert(channel_id);
        }
        added
    }

    /// Remove a single subscription. Returns `false` if there was none.
    pub fn unsubscribe_channel(&self, channel_id: i64, conn: ConnectionId) -> bool {
        let mut inner = self.inner.lock();

        let removed = match inner.channels.get_mut(&channel_id) {
            Some(members) => {
                let removed = members.remove(&conn);
                if members.is_empty() {
                    inner.channels.remove(&channel_id);
                }
                removed
            }
            None => false,
        };

        if removed {
            if let Some(channels) = inner.memberships.get_mut(&conn) {
                channels.remove(&channel_id);
                if channels.is_empty() {
                    inner.memberships.remove(&conn);
                }
            }
        }
        removed
    }

    /// Remove a connection from every channel. Returns the channels it left.
    pub fn unsubscribe(&self, conn: ConnectionId) -> Vec<i64> {
        let mut inner = self.inner.lock();
        let Some(channels) = inner.memberships.remove(&conn) else {
            return Vec::new();
        };

        for channel_id in &channels {
            if let Some(members) = inner.channels.get_mut(channel_id) {
                members.remove(&conn);
                if members.is_empty() {
                    inner.channels.remove(channel_id);
                }
            }
        }

        let mut left: Vec<i64> = channels.into_iter().collect();
        left.sort_unstable();
        left
    }

    /// Point-in-time copy of a channel's subscribers
    pub fn snapshot(&self, channel_id: i64) -> Vec<ConnectionId> {
        self.inner
            .lock()
            .channels
            .get(&channel_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Channels a connection is subscribed to, sorted
    pub fn channels_of(&self, conn: ConnectionId) -> Vec<i64> {
        let mut channels: Vec<i64> = self
            .inner
            .lock()
            .memberships
            .get(&conn)
            .map(|channels| channels.iter().copied().collect())
            .unwrap_or_default();
        channels.sort_unstable();
        channels
    }

    pub fn is_subscribed(&self, channel_id: i64, conn: ConnectionId) -> bool {
        self.inner
            .lock()
            .channels
            .get(&channel_id)
            .is_some_and(|members| members.contains(&conn))
    }

    pub fn subscriber_count(&self, channel_id: i64) -> usize {
        self.inner
            .lock()
            .channels
            .get(&channel_id)
            .map_or(0, HashSet::len)
    }

    /// Number of channels with at least one subscriber
    pub fn channel_count(&self) -> usize {
        self.inner.lock().channels.len()
    }
}
