//! Store provider trait for pluggable persistence backends.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// Trait for external store backends (Redis or in-memory).
///
/// All values are serialized as strings (JSON). The core treats every call
/// as best-effort: persistence is an optimization, not a correctness
/// dependency of delivery.
#[async_trait]
pub trait StoreProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Get a value by key. Returns `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Set a value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Delete a key.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Set the TTL on an existing key. Returns `false` if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool>;

    /// Push a value onto the head of a list, trimming it to `max_len` entries.
    /// The list is therefore ordered newest-first.
    async fn push_capped(&self, key: &str, value: &str, max_len: u64) -> AppResult<()>;

    /// Read a list slice. `start` and `stop` are inclusive indices counted
    /// from the head; `-1` addresses the last element.
    async fn range(&self, key: &str, start: i64, stop: i64) -> AppResult<Vec<String>>;

    /// Return the length of a list. Missing keys count as empty.
    async fn list_len(&self, key: &str) -> AppResult<u64>;

    /// Add a member to a set.
    async fn set_add(&self, key: &str, member: &str) -> AppResult<()>;

    /// Remove a member from a set.
    async fn set_remove(&self, key: &str, member: &str) -> AppResult<()>;

    /// Check that the store backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
