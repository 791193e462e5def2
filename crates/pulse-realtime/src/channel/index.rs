//! Channel name → subscriber set, the derived side of the subscription state.
//!
//! This is a plain map with no locking of its own: it lives inside the
//! registry's critical section, which updates it and the connection-side
//! subscription maps together. A channel exists only while it has at least
//! one subscriber.

use std::collections::{HashMap, HashSet};

use pulse_core::types::ConnectionId;

/// Index of all active channels and their subscriber sets.
#[derive(Debug, Default)]
pub struct ChannelIndex {
    /// Channel name → set of subscribed connection ids.
    channels: HashMap<String, HashSet<ConnectionId>>,
}

impl ChannelIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
        }
    }

    /// Add a subscriber, creating the channel on first subscribe.
    pub fn add(&mut self, channel: &str, conn_id: ConnectionId) {
        self.channels
            .entry(channel.to_string())
            .or_default()
            .insert(conn_id);
    }

    /// Remove a subscriber, deleting the channel once empty.
    pub fn remove(&mut self, channel: &str, conn_id: ConnectionId) {
        if let Some(subscribers) = self.channels.get_mut(channel) {
            subscribers.remove(&conn_id);
            if subscribers.is_empty() {
                self.channels.remove(channel);
            }
        }
    }

    /// Subscriber set for a channel, if the channel exists.
    pub fn subscribers(&self, channel: &str) -> Option<&HashSet<ConnectionId>> {
        self.channels.get(channel)
    }

    /// Subscriber count for a channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, HashSet::len)
    }

    /// Whether a connection is in a channel's subscriber set.
    pub fn is_subscribed(&self, channel: &str, conn_id: ConnectionId) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|subscribers| subscribers.contains(&conn_id))
    }

    /// Number of active channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
