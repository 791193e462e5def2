//! In-memory store implementation using moka and dashmap.

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use moka::future::Cache;

use pulse_core::config::store::MemoryStoreConfig;
use pulse_core::result::AppResult;
use pulse_core::traits::store::StoreProvider;

/// A key/value entry with its expiry deadline.
#[derive(Debug, Clone)]
struct ValueEntry {
    value: String,
    expires_at: Instant,
}

/// In-memory store provider.
///
/// Key/value entries live in a capacity-bounded moka cache with per-entry
/// expiry checked on read. Lists and sets live in dashmaps with lazily
/// enforced deadlines, mirroring Redis TTL semantics closely enough for
/// single-node use.
#[derive(Debug)]
pub struct MemoryStoreProvider {
    /// TTL'd key/value entries.
    kv: Cache<String, ValueEntry>,
    /// Newest-first lists.
    lists: DashMap<String, VecDeque<String>>,
    /// Membership sets.
    sets: DashMap<String, HashSet<String>>,
    /// Expiry deadlines for list and set keys.
    deadlines: DashMap<String, Instant>,
}

impl MemoryStoreProvider {
    /// Create a new in-memory store from configuration.
    pub fn new(config: &MemoryStoreConfig) -> Self {
        let kv = Cache::builder().max_capacity(config.max_capacity).build();

        Self {
            kv,
            lists: DashMap::new(),
            sets: DashMap::new(),
            deadlines: DashMap::new(),
        }
    }

    /// Drop a list/set key whose deadline has passed.
    fn purge_if_expired(&self, key: &str) {
        let expired = self
            .deadlines
            .get(key)
            .is_some_and(|deadline| Instant::now() >= *deadline);
        if expired {
            self.deadlines.remove(key);
            self.lists.remove(key);
            self.sets.remove(key);
        }
    }
}

#[async_trait]
impl StoreProvider for MemoryStoreProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        match self.kv.get(key).await {
            Some(entry) if Instant::now() < entry.expires_at => Ok(Some(entry.value)),
            Some(_) => {
                self.kv.invalidate(key).await;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let entry = ValueEntry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.kv.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.kv.invalidate(key).await;
        self.lists.remove(key);
        self.sets.remove(key);
        self.deadlines.remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let deadline = Instant::now() + ttl;

        if let Some(entry) = self.kv.get(key).await {
            let refreshed = ValueEntry {
                value: entry.value,
                expires_at: deadline,
            };
            self.kv.insert(key.to_string(), refreshed).await;
            return Ok(true);
        }

        self.purge_if_expired(key);
        if self.lists.contains_key(key) || self.sets.contains_key(key) {
            self.deadlines.insert(key.to_string(), deadline);
            return Ok(true);
        }

        Ok(false)
    }

    async fn push_capped(&self, key: &str, value: &str, max_len: u64) -> AppResult<()> {
        self.purge_if_expired(key);
        let mut list = self.lists.entry(key.to_string()).or_default();
        list.push_front(value.to_string());
        list.truncate(max_len as usize);
        Ok(())
    }

    async fn range(&self, key: &str, start: i64, stop: i64) -> AppResult<Vec<String>> {
        self.purge_if_expired(key);
        let Some(list) = self.lists.get(key) else {
            return Ok(Vec::new());
        };

        let len = list.len() as i64;
        let normalize = |index: i64| {
            if index < 0 { len + index } else { index }
        };
        let start = normalize(start).max(0);
        let stop = normalize(stop).min(len - 1);
        if start > stop {
            return Ok(Vec::new());
        }

        Ok(list
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect())
    }

    async fn list_len(&self, key: &str) -> AppResult<u64> {
        self.purge_if_expired(key);
        Ok(self.lists.get(key).map_or(0, |list| list.len() as u64))
    }

    async fn set_add(&self, key: &str, member: &str) -> AppResult<()> {
        self.purge_if_expired(key);
        self.sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> AppResult<()> {
        self.purge_if_expired(key);
        if let Some(mut set) = self.sets.get_mut(key) {
            set.remove(member);
            if set.is_empty() {
                drop(set);
                self.sets.remove(key);
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}
