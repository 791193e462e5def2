//! Store manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use pulse_core::config::store::StoreConfig;
use pulse_core::error::AppError;
use pulse_core::result::AppResult;
use pulse_core::traits::store::StoreProvider;

/// Store manager that wraps the configured store provider.
///
/// The provider is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct StoreManager {
    /// The inner store provider.
    inner: Arc<dyn StoreProvider>,
}

impl StoreManager {
    /// Create a new store manager from configuration.
    pub async fn new(config: &StoreConfig) -> AppResult<Self> {
        let inner: Arc<dyn StoreProvider> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis store provider");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisStoreProvider::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory store provider");
                Arc::new(crate::memory::MemoryStoreProvider::new(&config.memory))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown store provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a store manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn StoreProvider>) -> Self {
        Self { inner: provider }
    }

    /// Get a shared handle to the inner provider.
    pub fn provider(&self) -> Arc<dyn StoreProvider> {
        self.inner.clone()
    }
}

#[async_trait]
impl StoreProvider for StoreManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.delete(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        self.inner.expire(key, ttl).await
    }

    async fn push_capped(&self, key: &str, value: &str, max_len: u64) -> AppResult<()> {
        self.inner.push_capped(key, value, max_len).await
    }

    async fn range(&self, key: &str, start: i64, stop: i64) -> AppResult<Vec<String>> {
        self.inner.range(key, start, stop).await
    }

    async fn list_len(&self, key: &str) -> AppResult<u64> {
        self.inner.list_len(key).await
    }

    async fn set_add(&self, key: &str, member: &str) -> AppResult<()> {
        self.inner.set_add(key, member).await
    }

    async fn set_remove(&self, key: &str, member: &str) -> AppResult<()> {
        self.inner.set_remove(key, member).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
