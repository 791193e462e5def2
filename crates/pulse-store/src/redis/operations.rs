//! Redis store provider implementation.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use pulse_core::error::{AppError, ErrorKind};
use pulse_core::result::AppResult;
use pulse_core::traits::store::StoreProvider;

use super::client::RedisClient;

/// Redis-backed store provider.
#[derive(Debug, Clone)]
pub struct RedisStoreProvider {
    /// Redis client.
    client: RedisClient,
}

impl RedisStoreProvider {
    /// Create a new Redis store provider.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Store, format!("Redis error: {e}"), e)
    }
}

#[async_trait]
impl StoreProvider for RedisStoreProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: Option<String> = conn.get(&full_key).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn
            .set_ex(&full_key, value, ttl.as_secs())
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn.del(&full_key).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: bool = conn
            .expire(&full_key, ttl.as_secs() as i64)
            .await
            .map_err(Self::map_err)?;
        Ok(result)
    }

    async fn push_capped(&self, key: &str, value: &str, max_len: u64) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn.lpush(&full_key, value).await.map_err(Self::map_err)?;
        let _: () = conn
            .ltrim(&full_key, 0, max_len as isize - 1)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn range(&self, key: &str, start: i64, stop: i64) -> AppResult<Vec<String>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: Vec<String> = conn
            .lrange(&full_key, start as isize, stop as isize)
            .await
            .map_err(Self::map_err)?;
        Ok(result)
    }

    async fn list_len(&self, key: &str) -> AppResult<u64> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: u64 = conn.llen(&full_key).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn set_add(&self, key: &str, member: &str) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn.sadd(&full_key, member).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn.srem(&full_key, member).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
