//! Individual connection handle.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use pulse_core::error::AppError;
use pulse_core::result::AppResult;
use pulse_core::types::{ConnectionId, UserId};

use crate::message::frames::{OutboundFrame, SubscriptionConfig};

/// Transport metadata captured once at admission, immutable thereafter.
#[derive(Debug, Clone, Default)]
pub struct ConnectionMeta {
    /// Client agent string.
    pub user_agent: Option<String>,
    /// Origin address.
    pub remote_addr: Option<String>,
}

/// A handle to a single live connection.
///
/// Holds the sender half of the outbound buffer plus the connection's own
/// subscription map. The subscription map is mutated only inside the
/// registry's critical section, which is what keeps it consistent with the
/// channel index.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Generated connection id, never reused.
    pub id: ConnectionId,
    /// Owning user; `None` for anonymous connections.
    pub user_id: Option<UserId>,
    /// Transport metadata.
    pub meta: ConnectionMeta,
    /// Admission timestamp.
    pub connected_at: DateTime<Utc>,
    /// Last successful send or receive, unix milliseconds.
    last_seen: AtomicI64,
    /// Whether the connection is still alive.
    alive: AtomicBool,
    /// Sender for outbound frames.
    sender: mpsc::Sender<OutboundFrame>,
    /// Channel name → subscription config.
    subscriptions: Mutex<HashMap<String, SubscriptionConfig>>,
}

impl ConnectionHandle {
    /// Create a new connection handle.
    pub fn new(
        user_id: Option<UserId>,
        meta: ConnectionMeta,
        sender: mpsc::Sender<OutboundFrame>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ConnectionId::new(),
            user_id,
            meta,
            connected_at: now,
            last_seen: AtomicI64::new(now.timestamp_millis()),
            alive: AtomicBool::new(true),
            sender,
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Push an outbound frame to this connection.
    ///
    /// A successful push counts as outbound traffic and refreshes the
    /// last-seen timestamp. A full buffer or a closed transport is a
    /// delivery failure.
    pub fn send(&self, frame: OutboundFrame) -> AppResult<()> {
        if !self.is_alive() {
            return Err(AppError::delivery(format!(
                "Connection {} is closed",
                self.id
            )));
        }
        match self.sender.try_send(frame) {
            Ok(()) => {
                self.touch();
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(AppError::delivery(format!(
                "Connection {} send buffer full",
                self.id
            ))),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_closed();
                Err(AppError::delivery(format!(
                    "Connection {} transport closed",
                    self.id
                )))
            }
        }
    }

    /// Check if the connection is alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the connection as closed.
    pub fn mark_closed(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Refresh the last-seen timestamp.
    pub fn touch(&self) {
        self.last_seen
            .store(Utc::now().timestamp_millis(), Ordering::SeqCst);
    }

    /// Last successful traffic timestamp.
    pub fn last_seen(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_seen.load(Ordering::SeqCst))
            .unwrap_or_else(Utc::now)
    }

    /// Elapsed time since the last successful traffic.
    pub fn idle_for(&self) -> Duration {
        let elapsed_ms = Utc::now().timestamp_millis() - self.last_seen.load(Ordering::SeqCst);
        Duration::from_millis(elapsed_ms.max(0) as u64)
    }

    /// Rewind the last-seen timestamp, for timeout tests.
    #[doc(hidden)]
    pub fn set_last_seen(&self, at: DateTime<Utc>) {
        self.last_seen
            .store(at.timestamp_millis(), Ordering::SeqCst);
    }

    /// Store a subscription config, overwriting any existing one.
    pub(crate) fn set_subscription(&self, channel: &str, config: SubscriptionConfig) {
        self.lock_subscriptions()
            .insert(channel.to_string(), config);
    }

    /// Remove a subscription. Returns whether it existed.
    pub(crate) fn remove_subscription(&self, channel: &str) -> bool {
        self.lock_subscriptions().remove(channel).is_some()
    }

    /// Drain all subscriptions, returning the channel names.
    pub(crate) fn clear_subscriptions(&self) -> Vec<String> {
        self.lock_subscriptions().drain().map(|(ch, _)| ch).collect()
    }

    /// Channels this connection is subscribed to.
    pub fn subscribed_channels(&self) -> Vec<String> {
        self.lock_subscriptions().keys().cloned().collect()
    }

    /// Whether this connection is subscribed to a channel.
    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.lock_subscriptions().contains_key(channel)
    }

    /// Snapshot of connection info.
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            connection_id: self.id,
            user_id: self.user_id.clone(),
            connected_at: self.connected_at,
            last_seen: self.last_seen(),
            channels: self.subscribed_channels(),
            user_agent: self.meta.user_agent.clone(),
            remote_addr: self.meta.remote_addr.clone(),
        }
    }

    fn lock_subscriptions(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, SubscriptionConfig>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Serializable snapshot of connection info.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Connection id.
    pub connection_id: ConnectionId,
    /// Owning user, if authenticated.
    pub user_id: Option<UserId>,
    /// Admission timestamp.
    pub connected_at: DateTime<Utc>,
    /// Last successful traffic timestamp.
    pub last_seen: DateTime<Utc>,
    /// Subscribed channels.
    pub channels: Vec<String>,
    /// Client agent string.
    pub user_agent: Option<String>,
    /// Origin address.
    pub remote_addr: Option<String>,
}
