//! History replay of persisted channel messages.
//!
//! The store keeps each channel's history newest-first, so the replay reads
//! the head slice and reverses it to deliver oldest-first. Replay is
//! best-effort: a store failure or a dead connection ends it quietly, and
//! entries that no longer decode are skipped rather than aborting the rest.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use pulse_core::traits::StoreProvider;
use pulse_store::keys;

use crate::connection::handle::ConnectionHandle;
use crate::message::frames::{ChannelMessage, OutboundFrame};

/// Replays persisted channel messages to a freshly subscribed connection.
#[derive(Debug, Clone)]
pub struct HistoryReplayer {
    store: Arc<dyn StoreProvider>,
    /// Maximum messages replayed per subscribe.
    limit: usize,
}

impl HistoryReplayer {
    /// Create a replayer over a store backend.
    pub fn new(store: Arc<dyn StoreProvider>, limit: usize) -> Self {
        Self { store, limit }
    }

    /// Replay up to `limit` persisted messages to one connection, oldest
    /// first, followed by an end marker. Returns the number of messages
    /// delivered.
    pub async fn replay(&self, handle: &ConnectionHandle, channel: &str) -> usize {
        if self.limit == 0 {
            return 0;
        }

        let key = keys::channel_messages(channel);
        let entries = match self.store.range(&key, 0, self.limit as i64 - 1).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(channel, error = %err, "Failed to read channel history");
                return 0;
            }
        };

        let mut replayed = 0;
        for entry in entries.iter().rev() {
            let message: ChannelMessage = match serde_json::from_str(entry) {
                Ok(message) => message,
                Err(err) => {
                    warn!(channel, error = %err, "Skipping undecodable history entry");
                    continue;
                }
            };
            if handle.send(OutboundFrame::History { message }).is_err() {
                // The connection is gone or backed up; stop replaying.
                return replayed;
            }
            replayed += 1;
        }

        let _ = handle.send(OutboundFrame::HistoryEnd {
            channel: channel.to_string(),
            timestamp: Utc::now(),
        });
        debug!(channel, replayed, "History replay complete");
        replayed
    }
}
