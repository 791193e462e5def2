//! Liveness supervision.
//!
//! A periodic sweep walks every connection and either evicts it or probes
//! it. The idle check runs before the heartbeat push: a successful push
//! refreshes the last-seen timestamp, so probing first would keep an
//! otherwise-dead connection alive forever. A connection whose heartbeat
//! cannot be delivered is evicted in the same sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use pulse_core::types::ConnectionId;

use crate::connection::handle::ConnectionHandle;
use crate::hub::RealtimeHub;
use crate::message::frames::OutboundFrame;

/// Periodic heartbeat and idle-timeout sweeper.
#[derive(Debug)]
pub struct LivenessSupervisor {
    hub: Arc<RealtimeHub>,
    interval: Duration,
    timeout: Duration,
}

impl LivenessSupervisor {
    /// Create a supervisor over a hub, taking timings from its config.
    pub fn new(hub: Arc<RealtimeHub>) -> Self {
        let interval = hub.config().heartbeat_interval();
        let timeout = hub.config().connection_timeout();
        Self {
            hub,
            interval,
            timeout,
        }
    }

    /// Run the sweep loop until the hub signals shutdown.
    pub async fn run(self) {
        info!(
            interval_seconds = self.interval.as_secs(),
            timeout_seconds = self.timeout.as_secs(),
            "Liveness supervisor started"
        );

        let mut shutdown = self.hub.subscribe_shutdown();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.recv() => {
                    info!("Liveness supervisor stopped");
                    return;
                }
            }
        }
    }

    /// One sweep over all connections. Returns the ids evicted.
    pub async fn sweep(&self) -> Vec<ConnectionId> {
        let mut evicted = Vec::new();
        for handle in self.hub.all_handles() {
            if self.should_evict(&handle) {
                evicted.push(handle.id);
            }
        }

        for conn_id in &evicted {
            debug!(connection_id = %conn_id, "Evicting connection");
            self.hub.disconnect(*conn_id).await;
        }
        if !evicted.is_empty() {
            info!(evicted = evicted.len(), "Liveness sweep evicted connections");
        }
        evicted
    }

    fn should_evict(&self, handle: &ConnectionHandle) -> bool {
        if !handle.is_alive() {
            return true;
        }
        if handle.idle_for() > self.timeout {
            debug!(connection_id = %handle.id, "Connection idle past timeout");
            return true;
        }
        handle
            .send(OutboundFrame::Heartbeat {
                timestamp: Utc::now(),
            })
            .is_err()
    }
}
