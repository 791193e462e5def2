//! Inbound and outbound frame type definitions.
//!
//! Frames are internally tagged JSON objects. The inbound enum is closed:
//! adding a frame kind is a compile-time-checked change, and anything that
//! does not parse into it is treated as malformed and skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pulse_core::types::{ConnectionId, MessageId, UserId};

/// Frames sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    /// Subscribe to a channel.
    Subscribe {
        /// Channel name.
        channel: String,
        /// Optional event filter, folded into the subscription config.
        #[serde(default)]
        event: Option<String>,
        /// Per-channel subscription configuration.
        #[serde(default)]
        config: Option<SubscriptionConfig>,
    },
    /// Unsubscribe from a channel.
    Unsubscribe {
        /// Channel name.
        channel: String,
    },
    /// Liveness probe; answered with a pong immediately.
    Ping,
    /// Publish to a channel. Only honored for authenticated connections.
    Broadcast {
        /// Target channel.
        channel: String,
        /// Event name.
        event: String,
        /// Opaque payload.
        payload: serde_json::Value,
    },
}

/// Frames sent by the server to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Admission confirmed; carries the generated connection id.
    ConnectionAck {
        /// Connection id.
        connection_id: ConnectionId,
        /// Admission timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Subscription confirmed.
    SubscriptionAck {
        /// Channel name.
        channel: String,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Unsubscription confirmed.
    UnsubscriptionAck {
        /// Channel name.
        channel: String,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Reply to a client ping.
    Pong {
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Live channel broadcast.
    Broadcast {
        /// The channel message.
        #[serde(flatten)]
        message: ChannelMessage,
    },
    /// Replayed persisted channel message.
    History {
        /// The channel message.
        #[serde(flatten)]
        message: ChannelMessage,
    },
    /// End marker after history replay.
    HistoryEnd {
        /// Channel name.
        channel: String,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Point-to-point message outside channel semantics.
    Direct {
        /// Event name.
        event: String,
        /// Opaque payload.
        payload: serde_json::Value,
        /// Message id.
        message_id: MessageId,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Server liveness probe.
    Heartbeat {
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Error report for one failed frame; the connection stays open.
    Error {
        /// Error description.
        message: String,
        /// Timestamp.
        timestamp: DateTime<Utc>,
    },
}

/// One channel message — the wire and persisted form are identical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMessage {
    /// Target channel.
    pub channel: String,
    /// Event name.
    pub event: String,
    /// Opaque payload.
    pub payload: serde_json::Value,
    /// Generated message id.
    pub message_id: MessageId,
    /// Publish timestamp.
    pub timestamp: DateTime<Utc>,
}

impl ChannelMessage {
    /// Build a new channel message with a fresh id and timestamp.
    pub fn new(channel: String, event: String, payload: serde_json::Value) -> Self {
        Self {
            channel,
            event,
            payload,
            message_id: MessageId::new(),
            timestamp: Utc::now(),
        }
    }
}

/// Per-channel subscription configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Whether to replay persisted channel history on subscribe.
    #[serde(default)]
    pub send_history: bool,
    /// Event filter. Accepted and stored; not used for delivery filtering.
    #[serde(default)]
    pub event: Option<String>,
}

/// A broadcast request, from a client frame or the administrative surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastRequest {
    /// Target channel.
    pub channel: String,
    /// Event name.
    pub event: String,
    /// Opaque payload.
    pub payload: serde_json::Value,
    /// Narrow delivery to these users' connections only.
    #[serde(default)]
    pub include_user_ids: Option<Vec<UserId>>,
    /// Remove these users' connections from delivery.
    #[serde(default)]
    pub exclude_user_ids: Option<Vec<UserId>>,
    /// Whether to persist the message to the channel history.
    #[serde(default = "default_persist")]
    pub persist: bool,
}

fn default_persist() -> bool {
    true
}

/// Aggregate result of one broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastOutcome {
    /// Generated message id.
    pub message_id: MessageId,
    /// Number of connections the message was delivered to.
    pub sent_count: usize,
    /// Number of connections where delivery failed.
    pub failed_count: usize,
}

/// Aggregate result of a point-to-point send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    /// Number of connections the message was delivered to.
    pub sent_count: usize,
    /// Number of connections where delivery failed.
    pub failed_count: usize,
}

/// Channel statistics for the administrative surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Channel name.
    pub channel: String,
    /// Current subscriber count (in-memory index).
    pub subscriber_count: usize,
    /// Persisted message count (store).
    pub message_count: u64,
    /// Last activity timestamp (store).
    pub last_activity: Option<DateTime<Utc>>,
}
