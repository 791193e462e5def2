//! Channel broadcast engine.
//!
//! A broadcast is best-effort by construction: the subscriber snapshot is
//! taken under the registry lock, but every delivery happens outside it and
//! a failed push to one connection never blocks or aborts the others.
//! Persistence runs before fan-out so that a subscriber replaying history
//! immediately afterwards sees the message it may have missed.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use pulse_core::config::RealtimeConfig;
use pulse_core::result::AppResult;
use pulse_core::traits::StoreProvider;
use pulse_core::types::UserId;
use pulse_store::keys;

use crate::connection::registry::ConnectionRegistry;
use crate::message::frames::{
    BroadcastOutcome, BroadcastRequest, ChannelMessage, DeliveryOutcome, OutboundFrame,
};

/// Fans channel messages out to filtered subscriber sets.
#[derive(Debug, Clone)]
pub struct BroadcastEngine {
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn StoreProvider>,
    config: RealtimeConfig,
}

impl BroadcastEngine {
    /// Create a broadcast engine over a registry and a store backend.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        store: Arc<dyn StoreProvider>,
        config: RealtimeConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
        }
    }

    /// Publish a message to a channel.
    ///
    /// Persists first (when requested), then snapshots the filtered
    /// subscriber set and delivers to each connection in turn. Connections
    /// that disappear between snapshot and delivery are skipped and counted
    /// in neither tally.
    pub async fn broadcast(&self, request: BroadcastRequest) -> AppResult<BroadcastOutcome> {
        let message = ChannelMessage::new(request.channel, request.event, request.payload);

        if request.persist {
            self.persist(&message).await;
        }

        let targets = self.registry.filtered_subscribers(
            &message.channel,
            request.include_user_ids.as_deref(),
            request.exclude_user_ids.as_deref(),
        );

        let message_id = message.message_id;
        let mut sent_count = 0;
        let mut failed_count = 0;
        for conn_id in targets {
            let Some(handle) = self.registry.get(&conn_id) else {
                continue;
            };
            match handle.send(OutboundFrame::Broadcast {
                message: message.clone(),
            }) {
                Ok(()) => sent_count += 1,
                Err(err) => {
                    debug!(connection_id = %conn_id, error = %err, "Broadcast delivery failed");
                    failed_count += 1;
                }
            }
        }

        debug!(
            channel = %message.channel,
            message_id = %message_id,
            sent_count,
            failed_count,
            "Broadcast complete"
        );
        Ok(BroadcastOutcome {
            message_id,
            sent_count,
            failed_count,
        })
    }

    /// Deliver a frame to every connection of one user.
    pub fn send_to_user(&self, user_id: &UserId, frame: OutboundFrame) -> DeliveryOutcome {
        let mut sent_count = 0;
        let mut failed_count = 0;
        for handle in self.registry.user_connections(user_id) {
            match handle.send(frame.clone()) {
                Ok(()) => sent_count += 1,
                Err(err) => {
                    debug!(connection_id = %handle.id, error = %err, "Direct delivery failed");
                    failed_count += 1;
                }
            }
        }
        DeliveryOutcome {
            sent_count,
            failed_count,
        }
    }

    /// Append a message to the channel's capped history and refresh the
    /// channel activity marker. Store failures are logged and swallowed;
    /// delivery does not depend on persistence.
    async fn persist(&self, message: &ChannelMessage) {
        let encoded = match serde_json::to_string(message) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(channel = %message.channel, error = %err, "Failed to encode message for persistence");
                return;
            }
        };

        let retention = self.config.message_retention();
        let messages_key = keys::channel_messages(&message.channel);
        if let Err(err) = self
            .store
            .push_capped(&messages_key, &encoded, self.config.max_messages_per_channel)
            .await
        {
            warn!(channel = %message.channel, error = %err, "Failed to persist channel message");
            return;
        }
        if let Err(err) = self.store.expire(&messages_key, retention).await {
            warn!(channel = %message.channel, error = %err, "Failed to set history retention");
        }

        let activity_key = keys::channel_last_activity(&message.channel);
        if let Err(err) = self
            .store
            .set(&activity_key, &Utc::now().to_rfc3339(), retention)
            .await
        {
            warn!(channel = %message.channel, error = %err, "Failed to record channel activity");
        }
    }
}
