//! Redis key-value store
//!
//! Shared store for multi-instance deployments. Writes use plain `SET` or
//! `SET EX` so a newer value always replaces an older one.

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;

pub struct RedisCache {
    connection: MultiplexedConnection,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Connect to the Redis server at `redis_url` (e.g. "redis://localhost:6379").
    ///
    /// # Errors
    /// Returns an error if the connection cannot be established.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).context("Failed to create Redis client")?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheLayer for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();

        let result: Option<String> = conn
            .get(key)
            .await
            .context("Failed to get value from Redis")?;

        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection.clone();

        match ttl {
            Some(ttl) => {
                // Redis expiry granularity is one second
                let ttl_secs = ttl.as_secs().max(1);
                let _: () = conn
                    .set_ex(key, value, ttl_secs)
                    .await
                    .context("Failed to set value in Redis")?;
            }
            None => {
                let _: () = conn
                    .set(key, value)
                    .await
                    .context("Failed to set value in Redis")?;
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();

        let _: () = conn
            .del(key)
            .await
            .context("Failed to delete key from Redis")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
    }

    // Run with: cargo test --features redis-cache -- --ignored

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn test_set_overwrites_and_expires() {
        let cache = RedisCache::new(&get_redis_url()).await.unwrap();
        cache.delete("test:refresh").await.unwrap();

        cache.set("test:refresh", "first", Some(Duration::from_secs(1))).await.unwrap();
        cache.set("test:refresh", "second", Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(cache.get("test:refresh").await.unwrap().as_deref(), Some("second"));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(cache.get("test:refresh").await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires running Redis server"]
    async fn test_persistent_entry_and_delete() {
        let cache = RedisCache::new(&get_redis_url()).await.unwrap();

        cache.set("test:detail", "{\"id\":\"1\"}", None).await.unwrap();
        assert_eq!(
            cache.get("test:detail").await.unwrap().as_deref(),
            Some("{\"id\":\"1\"}")
        );

        cache.delete("test:detail").await.unwrap();
        cache.delete("test:detail").await.unwrap();
        assert_eq!(cache.get("test:detail").await.unwrap(), None);
    }
}
