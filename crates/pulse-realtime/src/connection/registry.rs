//! Connection registry — the single owner of all shared connection state.
//!
//! The primary map, the user → connections map, and the channel index are
//! guarded by one lock. Every operation that touches more than one of them
//! (admit, disconnect, subscribe, unsubscribe) runs as one critical section,
//! which is what upholds the two structural invariants:
//!
//! - a connection id appears in a user's set iff it carries that user id,
//!   and no user set is ever empty
//! - a connection id is in a channel's subscriber set iff the channel is in
//!   that connection's own subscription map
//!
//! Iteration for fan-out works on snapshots taken under the same lock;
//! delivery to individual connections always happens outside it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use pulse_core::error::AppError;
use pulse_core::result::AppResult;
use pulse_core::types::{ConnectionId, UserId};

use crate::channel::index::ChannelIndex;
use crate::message::frames::SubscriptionConfig;

use super::handle::ConnectionHandle;

/// State guarded by the registry lock.
#[derive(Debug, Default)]
struct RegistryInner {
    /// Primary map: connection id → handle.
    by_id: HashMap<ConnectionId, Arc<ConnectionHandle>>,
    /// User id → set of that user's connection ids. Never holds empty sets.
    by_user: HashMap<UserId, HashSet<ConnectionId>>,
    /// Channel name → subscriber set.
    channels: ChannelIndex,
}

/// Registry of all live connections, with per-user admission caps.
#[derive(Debug)]
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
    /// Hard cap on concurrent connections per authenticated user.
    max_connections_per_user: usize,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new(max_connections_per_user: usize) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            max_connections_per_user,
        }
    }

    /// Register a new connection.
    ///
    /// The cap check and the insertions run under one write lock, so no
    /// concurrent admission can slip a (cap+1)-th connection through. On a
    /// cap hit nothing is mutated and `CapacityExceeded` is returned.
    pub fn admit(&self, handle: Arc<ConnectionHandle>) -> AppResult<()> {
        let mut inner = self.write();

        if let Some(user_id) = &handle.user_id {
            let current = inner.by_user.get(user_id).map_or(0, HashSet::len);
            if current >= self.max_connections_per_user {
                return Err(AppError::capacity_exceeded(format!(
                    "User {user_id} is at the connection cap ({})",
                    self.max_connections_per_user
                )));
            }
            inner
                .by_user
                .entry(user_id.clone())
                .or_default()
                .insert(handle.id);
        }

        inner.by_id.insert(handle.id, handle);
        Ok(())
    }

    /// Remove a connection and all of its subscriptions.
    ///
    /// Idempotent: unknown or already-removed ids return `None` with no
    /// effect, since the client-close path and the liveness supervisor may
    /// race to evict the same id. Returns the removed handle and the
    /// channels it was subscribed to, for store cleanup outside the lock.
    pub fn disconnect(
        &self,
        conn_id: ConnectionId,
    ) -> Option<(Arc<ConnectionHandle>, Vec<String>)> {
        let mut inner = self.write();

        let handle = inner.by_id.remove(&conn_id)?;

        let channels = handle.clear_subscriptions();
        for channel in &channels {
            inner.channels.remove(channel, conn_id);
        }

        if let Some(user_id) = &handle.user_id {
            if let Some(connections) = inner.by_user.get_mut(user_id) {
                connections.remove(&conn_id);
                if connections.is_empty() {
                    inner.by_user.remove(user_id);
                }
            }
        }

        handle.mark_closed();
        Some((handle, channels))
    }

    /// Subscribe a connection to a channel.
    ///
    /// Both sides of the bidirectional invariant are updated in one critical
    /// section. Re-subscribing overwrites the stored config and is not an
    /// error. Fails with `UnknownConnection` for unregistered ids.
    pub fn subscribe(
        &self,
        conn_id: ConnectionId,
        channel: &str,
        config: SubscriptionConfig,
    ) -> AppResult<Arc<ConnectionHandle>> {
        let mut inner = self.write();

        let handle = inner
            .by_id
            .get(&conn_id)
            .cloned()
            .ok_or_else(|| AppError::unknown_connection(format!("Connection {conn_id}")))?;

        inner.channels.add(channel, conn_id);
        handle.set_subscription(channel, config);
        Ok(handle)
    }

    /// Unsubscribe a connection from a channel.
    ///
    /// Removing a non-existent subscription is a no-op. Returns the handle
    /// when an actual subscription was removed.
    pub fn unsubscribe(
        &self,
        conn_id: ConnectionId,
        channel: &str,
    ) -> Option<Arc<ConnectionHandle>> {
        let mut inner = self.write();

        let handle = inner.by_id.get(&conn_id).cloned()?;
        inner.channels.remove(channel, conn_id);
        if handle.remove_subscription(channel) {
            Some(handle)
        } else {
            None
        }
    }

    /// Look up a connection by id.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.read().by_id.get(conn_id).cloned()
    }

    /// All connections of one user.
    pub fn user_connections(&self, user_id: &UserId) -> Vec<Arc<ConnectionHandle>> {
        let inner = self.read();
        let Some(ids) = inner.by_user.get(user_id) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| inner.by_id.get(id).cloned())
            .collect()
    }

    /// Snapshot of every live connection.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.read().by_id.values().cloned().collect()
    }

    /// Snapshot of a channel's subscriber ids with the user-level broadcast
    /// filters already applied.
    ///
    /// The include filter narrows delivery to the named users' connections,
    /// even when other users are subscribed; the exclude filter then
    /// subtracts its users' connections. A user in both lists ends up
    /// excluded.
    pub fn filtered_subscribers(
        &self,
        channel: &str,
        include_user_ids: Option<&[UserId]>,
        exclude_user_ids: Option<&[UserId]>,
    ) -> Vec<ConnectionId> {
        let inner = self.read();
        let Some(subscribers) = inner.channels.subscribers(channel) else {
            return Vec::new();
        };
        let mut candidates: HashSet<ConnectionId> = subscribers.clone();

        if let Some(include) = include_user_ids {
            let mut included = HashSet::new();
            for user_id in include {
                if let Some(connections) = inner.by_user.get(user_id) {
                    included.extend(connections.intersection(&candidates).copied());
                }
            }
            candidates = included;
        }

        if let Some(exclude) = exclude_user_ids {
            for user_id in exclude {
                if let Some(connections) = inner.by_user.get(user_id) {
                    for conn_id in connections {
                        candidates.remove(conn_id);
                    }
                }
            }
        }

        candidates.into_iter().collect()
    }

    /// Total live connection count.
    pub fn connection_count(&self) -> usize {
        self.read().by_id.len()
    }

    /// Number of active channels.
    pub fn channel_count(&self) -> usize {
        self.read().channels.channel_count()
    }

    /// Subscriber count for a channel.
    pub fn channel_subscriber_count(&self, channel: &str) -> usize {
        self.read().channels.subscriber_count(channel)
    }

    /// Whether a connection is in a channel's subscriber set.
    pub fn is_subscribed(&self, channel: &str, conn_id: ConnectionId) -> bool {
        self.read().channels.is_subscribed(channel, conn_id)
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    use crate::connection::handle::ConnectionMeta;
    use crate::message::frames::OutboundFrame;

    fn new_handle(user: Option<&str>) -> Arc<ConnectionHandle> {
        let (tx, rx) = mpsc::channel::<OutboundFrame>(16);
        // Receivers are dropped deliberately; these tests never deliver.
        std::mem::forget(rx);
        Arc::new(ConnectionHandle::new(
            user.map(UserId::from),
            ConnectionMeta::default(),
            tx,
        ))
    }

    #[test]
    fn admit_rejects_the_cap_plus_one_connection_without_mutation() {
        let registry = ConnectionRegistry::new(2);
        registry.admit(new_handle(Some("u1"))).expect("first");
        registry.admit(new_handle(Some("u1"))).expect("second");

        let err = registry
            .admit(new_handle(Some("u1")))
            .expect_err("third must be rejected");
        assert_eq!(err.kind, pulse_core::error::ErrorKind::CapacityExceeded);
        assert_eq!(registry.connection_count(), 2);

        // Other users and anonymous connections are unaffected by the cap hit.
        registry.admit(new_handle(Some("u2"))).expect("other user");
        registry.admit(new_handle(None)).expect("anonymous");
        assert_eq!(registry.connection_count(), 4);
    }

    #[test]
    fn anonymous_connections_are_not_capped() {
        let registry = ConnectionRegistry::new(1);
        for _ in 0..5 {
            registry.admit(new_handle(None)).expect("anonymous admit");
        }
        assert_eq!(registry.connection_count(), 5);
    }

    #[test]
    fn disconnect_is_idempotent() {
        let registry = ConnectionRegistry::new(4);
        let handle = new_handle(Some("u1"));
        let conn_id = handle.id;
        registry.admit(handle).expect("admit");

        assert!(registry.disconnect(conn_id).is_some());
        assert!(registry.disconnect(conn_id).is_none());
        assert!(registry.disconnect(ConnectionId::new()).is_none());
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn disconnect_frees_a_cap_slot() {
        let registry = ConnectionRegistry::new(1);
        let handle = new_handle(Some("u1"));
        let conn_id = handle.id;
        registry.admit(handle).expect("admit");
        assert!(registry.admit(new_handle(Some("u1"))).is_err());

        registry.disconnect(conn_id);
        registry.admit(new_handle(Some("u1"))).expect("slot freed");
    }

    #[test]
    fn bidirectional_invariant_holds_after_every_operation() {
        let registry = ConnectionRegistry::new(4);
        let handle = new_handle(Some("u1"));
        let conn_id = handle.id;
        registry.admit(handle.clone()).expect("admit");

        let invariant = |channel: &str| {
            assert_eq!(
                registry.is_subscribed(channel, conn_id),
                handle.is_subscribed(channel),
                "index and connection disagree on {channel}"
            );
        };

        registry
            .subscribe(conn_id, "room-1", SubscriptionConfig::default())
            .expect("subscribe");
        invariant("room-1");

        registry
            .subscribe(conn_id, "room-2", SubscriptionConfig::default())
            .expect("subscribe");
        invariant("room-1");
        invariant("room-2");

        registry.unsubscribe(conn_id, "room-1");
        invariant("room-1");
        invariant("room-2");

        registry.unsubscribe(conn_id, "room-1");
        invariant("room-1");

        let (_, channels) = registry.disconnect(conn_id).expect("disconnect");
        assert_eq!(channels, vec!["room-2".to_string()]);
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn subscribe_unknown_connection_is_rejected() {
        let registry = ConnectionRegistry::new(4);
        let err = registry
            .subscribe(
                ConnectionId::new(),
                "room-1",
                SubscriptionConfig::default(),
            )
            .expect_err("must fail");
        assert_eq!(err.kind, pulse_core::error::ErrorKind::UnknownConnection);
    }

    #[test]
    fn resubscribe_overwrites_the_config() {
        let registry = ConnectionRegistry::new(4);
        let handle = new_handle(None);
        let conn_id = handle.id;
        registry.admit(handle).expect("admit");

        registry
            .subscribe(conn_id, "room-1", SubscriptionConfig::default())
            .expect("subscribe");
        registry
            .subscribe(
                conn_id,
                "room-1",
                SubscriptionConfig {
                    send_history: true,
                    event: None,
                },
            )
            .expect("resubscribe");

        assert_eq!(registry.channel_subscriber_count("room-1"), 1);
    }

    #[test]
    fn filtered_subscribers_applies_include_then_exclude() {
        let registry = ConnectionRegistry::new(4);
        let a = new_handle(Some("alice"));
        let b = new_handle(Some("bob"));
        let c = new_handle(None);
        for handle in [&a, &b, &c] {
            registry.admit(handle.clone()).expect("admit");
            registry
                .subscribe(handle.id, "room-1", SubscriptionConfig::default())
                .expect("subscribe");
        }

        let alice = UserId::from("alice");
        let bob = UserId::from("bob");

        // Exclude removes only bob's connection.
        let targets =
            registry.filtered_subscribers("room-1", None, Some(std::slice::from_ref(&bob)));
        assert_eq!(targets.len(), 2);
        assert!(!targets.contains(&b.id));

        // Include narrows to alice even though others are subscribed.
        let targets =
            registry.filtered_subscribers("room-1", Some(std::slice::from_ref(&alice)), None);
        assert_eq!(targets, vec![a.id]);

        // Include naming a non-subscribed user delivers to nobody.
        let stranger = UserId::from("stranger");
        let targets =
            registry.filtered_subscribers("room-1", Some(std::slice::from_ref(&stranger)), None);
        assert!(targets.is_empty());

        // A user in both lists is excluded.
        let targets = registry.filtered_subscribers(
            "room-1",
            Some(std::slice::from_ref(&alice)),
            Some(std::slice::from_ref(&alice)),
        );
        assert!(targets.is_empty());
    }
}
