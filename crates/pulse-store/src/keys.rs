//! Store key builders for all Pulse entries.
//!
//! Centralising key construction prevents typos and makes it easy to find
//! every key the service uses. Keys are unprefixed here; the Redis client
//! applies the configured namespace prefix.

use pulse_core::types::ConnectionId;

/// Key of the capped, newest-first message list for a channel.
pub fn channel_messages(channel: &str) -> String {
    format!("channel:{channel}:messages")
}

/// Key of the subscriber-membership set for a channel.
pub fn channel_subscribers(channel: &str) -> String {
    format!("channel:{channel}:subscribers")
}

/// Key of the last-activity timestamp for a channel.
pub fn channel_last_activity(channel: &str) -> String {
    format!("channel:{channel}:last_activity")
}

/// Key of the presence record for a connection.
pub fn connection(conn_id: &ConnectionId) -> String {
    format!("connection:{conn_id}")
}
