//! The realtime hub, the single entry point the transport and the
//! administrative surface talk to.
//!
//! The hub composes the registry, the broadcast engine, and the history
//! replayer, and owns the store side effects of the connection lifecycle.
//! Registry state is authoritative; every store write here is a best-effort
//! mirror that is logged and swallowed on failure.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use pulse_core::config::RealtimeConfig;
use pulse_core::error::AppError;
use pulse_core::result::AppResult;
use pulse_core::traits::StoreProvider;
use pulse_core::types::{ConnectionId, UserId};
use pulse_store::keys;

use crate::broadcast::BroadcastEngine;
use crate::connection::handle::{ConnectionHandle, ConnectionInfo, ConnectionMeta};
use crate::connection::registry::ConnectionRegistry;
use crate::history::HistoryReplayer;
use crate::message::frames::{
    BroadcastOutcome, BroadcastRequest, ChannelStats, DeliveryOutcome, InboundFrame,
    OutboundFrame, SubscriptionConfig,
};

/// Coordinates connections, channels, broadcast, and liveness state.
#[derive(Debug)]
pub struct RealtimeHub {
    registry: Arc<ConnectionRegistry>,
    engine: BroadcastEngine,
    history: HistoryReplayer,
    store: Arc<dyn StoreProvider>,
    config: RealtimeConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl RealtimeHub {
    /// Build a hub over a store backend.
    pub fn new(store: Arc<dyn StoreProvider>, config: RealtimeConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(config.max_connections_per_user));
        let engine = BroadcastEngine::new(registry.clone(), store.clone(), config.clone());
        let history = HistoryReplayer::new(store.clone(), config.history_replay_limit);
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            registry,
            engine,
            history,
            store,
            config,
            shutdown_tx,
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Admit a new connection.
    ///
    /// Applies the per-user cap, sends the admission acknowledgement, and
    /// mirrors a presence record into the store. Returns the handle plus the
    /// receiver half of the connection's outbound buffer, which the
    /// transport task drains.
    pub async fn admit(
        &self,
        user_id: Option<UserId>,
        meta: ConnectionMeta,
    ) -> AppResult<(Arc<ConnectionHandle>, mpsc::Receiver<OutboundFrame>)> {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(user_id, meta, tx));
        self.registry.admit(handle.clone())?;

        info!(
            connection_id = %handle.id,
            user_id = ?handle.user_id,
            "Connection admitted"
        );

        handle.send(OutboundFrame::ConnectionAck {
            connection_id: handle.id,
            timestamp: Utc::now(),
        })?;

        self.write_presence(&handle).await;
        Ok((handle, rx))
    }

    /// Tear a connection down and clean up its subscriptions.
    ///
    /// Safe to call more than once for the same id; only the first call has
    /// any effect.
    pub async fn disconnect(&self, conn_id: ConnectionId) {
        let Some((handle, channels)) = self.registry.disconnect(conn_id) else {
            return;
        };

        info!(connection_id = %conn_id, channels = channels.len(), "Connection closed");

        if let Some(user_id) = &handle.user_id {
            for channel in &channels {
                if let Err(err) = self
                    .store
                    .set_remove(&keys::channel_subscribers(channel), user_id.as_str())
                    .await
                {
                    warn!(channel, error = %err, "Failed to drop store membership");
                }
            }
        }
        if let Err(err) = self.store.delete(&keys::connection(&conn_id)).await {
            warn!(connection_id = %conn_id, error = %err, "Failed to drop presence record");
        }
    }

    /// Subscribe a connection to a channel and acknowledge it.
    ///
    /// When the subscription config asks for history, persisted messages are
    /// replayed after the acknowledgement.
    pub async fn subscribe(
        &self,
        conn_id: ConnectionId,
        channel: &str,
        config: SubscriptionConfig,
    ) -> AppResult<()> {
        let send_history = config.send_history;
        let handle = self.registry.subscribe(conn_id, channel, config)?;

        debug!(connection_id = %conn_id, channel, "Subscribed");

        if let Some(user_id) = &handle.user_id {
            if let Err(err) = self
                .store
                .set_add(&keys::channel_subscribers(channel), user_id.as_str())
                .await
            {
                warn!(channel, error = %err, "Failed to mirror store membership");
            }
        }

        handle.send(OutboundFrame::SubscriptionAck {
            channel: channel.to_string(),
            timestamp: Utc::now(),
        })?;

        if send_history {
            self.history.replay(&handle, channel).await;
        }
        Ok(())
    }

    /// Unsubscribe a connection from a channel and acknowledge it.
    ///
    /// Unsubscribing from a channel the connection never joined is a no-op
    /// without acknowledgement.
    pub async fn unsubscribe(&self, conn_id: ConnectionId, channel: &str) {
        let Some(handle) = self.registry.unsubscribe(conn_id, channel) else {
            return;
        };

        debug!(connection_id = %conn_id, channel, "Unsubscribed");

        if let Some(user_id) = &handle.user_id {
            if let Err(err) = self
                .store
                .set_remove(&keys::channel_subscribers(channel), user_id.as_str())
                .await
            {
                warn!(channel, error = %err, "Failed to drop store membership");
            }
        }

        let _ = handle.send(OutboundFrame::UnsubscriptionAck {
            channel: channel.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Publish a message to a channel.
    pub async fn broadcast(&self, request: BroadcastRequest) -> AppResult<BroadcastOutcome> {
        self.engine.broadcast(request).await
    }

    /// Deliver a point-to-point message to every connection of one user.
    pub fn send_to_user(&self, user_id: &UserId, event: String, payload: serde_json::Value) -> DeliveryOutcome {
        self.engine.send_to_user(
            user_id,
            OutboundFrame::Direct {
                event,
                payload,
                message_id: pulse_core::types::MessageId::new(),
                timestamp: Utc::now(),
            },
        )
    }

    /// Handle one inbound text frame from a connection.
    ///
    /// Any inbound traffic counts as liveness. A malformed frame earns an
    /// error frame back but never terminates the connection.
    pub async fn handle_frame(&self, conn_id: ConnectionId, raw: &str) -> AppResult<()> {
        let handle = self
            .registry
            .get(&conn_id)
            .ok_or_else(|| AppError::unknown_connection(format!("Connection {conn_id}")))?;
        handle.touch();

        let frame: InboundFrame = match serde_json::from_str(raw) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(connection_id = %conn_id, error = %err, "Malformed inbound frame");
                let _ = handle.send(OutboundFrame::Error {
                    message: "Malformed frame".to_string(),
                    timestamp: Utc::now(),
                });
                return Ok(());
            }
        };

        match frame {
            InboundFrame::Subscribe {
                channel,
                event,
                config,
            } => {
                let mut config = config.unwrap_or_default();
                if config.event.is_none() {
                    config.event = event;
                }
                self.subscribe(conn_id, &channel, config).await?;
            }
            InboundFrame::Unsubscribe { channel } => {
                self.unsubscribe(conn_id, &channel).await;
            }
            InboundFrame::Ping => {
                let _ = handle.send(OutboundFrame::Pong {
                    timestamp: Utc::now(),
                });
            }
            InboundFrame::Broadcast {
                channel,
                event,
                payload,
            } => {
                // Anonymous connections may listen but not publish.
                if handle.user_id.is_none() {
                    debug!(connection_id = %conn_id, "Ignoring broadcast from anonymous connection");
                    return Ok(());
                }
                self.broadcast(BroadcastRequest {
                    channel,
                    event,
                    payload,
                    include_user_ids: None,
                    exclude_user_ids: None,
                    persist: true,
                })
                .await?;
            }
        }
        Ok(())
    }

    /// Look up one connection's info snapshot.
    pub fn connection_info(&self, conn_id: &ConnectionId) -> Option<ConnectionInfo> {
        self.registry.get(conn_id).map(|handle| handle.info())
    }

    /// Info snapshots for every live connection.
    pub fn list_connections(&self) -> Vec<ConnectionInfo> {
        self.registry
            .all_connections()
            .iter()
            .map(|handle| handle.info())
            .collect()
    }

    /// Statistics for one channel, combining the in-memory subscriber count
    /// with the store-side history length and activity marker.
    pub async fn channel_stats(&self, channel: &str) -> ChannelStats {
        let subscriber_count = self.registry.channel_subscriber_count(channel);
        let message_count = self
            .store
            .list_len(&keys::channel_messages(channel))
            .await
            .unwrap_or(0);
        let last_activity = match self
            .store
            .get(&keys::channel_last_activity(channel))
            .await
        {
            Ok(Some(raw)) => chrono::DateTime::parse_from_rfc3339(&raw)
                .ok()
                .map(|at| at.with_timezone(&Utc)),
            _ => None,
        };
        ChannelStats {
            channel: channel.to_string(),
            subscriber_count,
            message_count,
            last_activity,
        }
    }

    /// Total live connection count.
    pub fn connection_count(&self) -> usize {
        self.registry.connection_count()
    }

    /// Number of active channels.
    pub fn channel_count(&self) -> usize {
        self.registry.channel_count()
    }

    /// Whether the store backend is reachable.
    pub async fn store_healthy(&self) -> bool {
        self.store.health_check().await.unwrap_or(false)
    }

    /// Snapshot of every live connection handle, for the liveness sweep.
    pub(crate) fn all_handles(&self) -> Vec<Arc<ConnectionHandle>> {
        self.registry.all_connections()
    }

    /// Receiver that fires once on shutdown.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Disconnect everything and signal the supervisor to stop.
    pub async fn shutdown(&self) {
        info!(
            connections = self.registry.connection_count(),
            "Realtime hub shutting down"
        );
        let _ = self.shutdown_tx.send(());
        for handle in self.registry.all_connections() {
            self.disconnect(handle.id).await;
        }
    }

    /// Mirror a presence record for a live connection into the store.
    async fn write_presence(&self, handle: &ConnectionHandle) {
        let record = serde_json::json!({
            "connection_id": handle.id,
            "user_id": handle.user_id,
            "connected_at": handle.connected_at,
        });
        if let Err(err) = self
            .store
            .set(
                &keys::connection(&handle.id),
                &record.to_string(),
                self.config.connection_timeout(),
            )
            .await
        {
            warn!(connection_id = %handle.id, error = %err, "Failed to write presence record");
        }
    }
}
