//! # pulse-store
//!
//! Store provider implementations for Pulse:
//!
//! - **memory**: In-process store using [moka](https://crates.io/crates/moka)
//!   for TTL'd key/value entries and [dashmap](https://crates.io/crates/dashmap)
//!   for lists and sets
//! - **redis**: Redis-backed store using the [redis](https://crates.io/crates/redis) crate
//!
//! The provider is selected at runtime based on configuration. The real-time
//! core treats every store call as best-effort.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::StoreManager;
