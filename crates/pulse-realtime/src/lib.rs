//! # pulse-realtime
//!
//! Real-time engine for Pulse. Provides:
//!
//! - Connection lifecycle with per-user admission caps
//! - Pub/sub channel index kept bidirectionally consistent with each
//!   connection's own subscription set
//! - Best-effort channel broadcast with user-level include/exclude filters
//!   and optional persistence
//! - Liveness supervision (heartbeat push + idle timeout eviction)
//! - History replay of persisted channel messages on subscribe

pub mod broadcast;
pub mod channel;
pub mod connection;
pub mod history;
pub mod hub;
pub mod message;
pub mod supervisor;

pub use broadcast::BroadcastEngine;
pub use connection::handle::ConnectionHandle;
pub use connection::registry::ConnectionRegistry;
pub use history::HistoryReplayer;
pub use hub::RealtimeHub;
pub use supervisor::LivenessSupervisor;
