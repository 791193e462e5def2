//! Real-time engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection, broadcast, and history settings for the real-time engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Maximum concurrent connections per authenticated user.
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
    /// Maximum inbound frame size in bytes. Larger frames are a protocol
    /// violation and terminate the offending connection.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
    /// Interval between liveness sweeps in seconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// Idle ceiling in seconds before a connection is evicted.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
    /// Outbound buffer size per connection.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Maximum persisted messages replayed on subscribe.
    #[serde(default = "default_history_replay_limit")]
    pub history_replay_limit: usize,
    /// Cap on persisted messages per channel (store-side trim).
    #[serde(default = "default_max_messages_per_channel")]
    pub max_messages_per_channel: u64,
    /// Retention window for persisted channel messages in days.
    #[serde(default = "default_message_retention_days")]
    pub message_retention_days: u64,
}

impl RealtimeConfig {
    /// Liveness sweep interval as a [`Duration`].
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }

    /// Connection idle timeout as a [`Duration`].
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }

    /// Persisted-message retention window as a [`Duration`].
    pub fn message_retention(&self) -> Duration {
        Duration::from_secs(self.message_retention_days * 24 * 3600)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_connections_per_user: default_max_connections_per_user(),
            max_message_bytes: default_max_message_bytes(),
            heartbeat_interval_seconds: default_heartbeat_interval(),
            connection_timeout_seconds: default_connection_timeout(),
            channel_buffer_size: default_channel_buffer(),
            history_replay_limit: default_history_replay_limit(),
            max_messages_per_channel: default_max_messages_per_channel(),
            message_retention_days: default_message_retention_days(),
        }
    }
}

fn default_max_connections_per_user() -> usize {
    10
}

fn default_max_message_bytes() -> usize {
    64 * 1024
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_connection_timeout() -> u64 {
    300
}

fn default_channel_buffer() -> usize {
    256
}

fn default_history_replay_limit() -> usize {
    50
}

fn default_max_messages_per_channel() -> u64 {
    1000
}

fn default_message_retention_days() -> u64 {
    7
}
