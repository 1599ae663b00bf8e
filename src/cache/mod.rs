//! Key-value store
//!
//! Backs two concerns, each with its own store:
//! - the assembled "full detail" payloads of news and agriculture entries
//!   ([`create_cache`]), which may be evicted and rebuilt
//! - the single live refresh token per user ([`create_session_store`]),
//!   which must stay until it is rotated, revoked or expires
//!
//! Two drivers are available:
//! - In-memory store (moka), the default for single-instance deployment
//! - Redis, behind the `redis-cache` feature, for multi-instance deployment
//!
//! # Usage
//!
//! ```rust,ignore
//! use agrinews::cache::{create_cache, CacheLayer};
//! use agrinews::config::CacheConfig;
//!
//! let cache = create_cache(&CacheConfig::default()).await?;
//! cache.set("key", "value", Some(Duration::from_secs(60))).await?;
//! ```

pub mod memory;
#[cfg(feature = "redis-cache")]
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CacheConfig, CacheDriver};

pub use memory::MemoryCache;
#[cfg(feature = "redis-cache")]
pub use redis::RedisCache;

/// Key of the cached full-detail payload of a news entry.
pub fn news_key(news_id: &str) -> String {
    format!("NEWS_KEY{}", news_id)
}

/// Key of the cached full-detail payload of an agriculture entry.
pub fn agriculture_key(agriculture_id: &str) -> String {
    format!("AGRICULTURE_KEY{}", agriculture_id)
}

/// Key of the live refresh token of a user.
pub fn refresh_key(user_id: &str) -> String {
    format!("REFRESH_KEY{}", user_id)
}

/// String key-value store.
///
/// `set` always overwrites an existing value. A `ttl` of `None` keeps the
/// entry until it is deleted.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Deleting a missing key is a no-op.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Store selected at startup from [`CacheConfig`].
#[derive(Debug)]
pub enum Cache {
    Memory(MemoryCache),
    #[cfg(feature = "redis-cache")]
    Redis(RedisCache),
}

#[async_trait]
impl CacheLayer for Cache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            Cache::Memory(cache) => cache.get(key).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.set(key, value, ttl).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.delete(key).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.delete(key).await,
        }
    }
}

/// Create the store configured by `config`.
///
/// # Errors
/// - Redis is configured but the `redis-cache` feature is not enabled
/// - Redis is configured without a URL, or the connection fails
pub async fn create_cache(config: &CacheConfig) -> Result<Arc<Cache>> {
    match config.driver {
        CacheDriver::Memory => Ok(Arc::new(Cache::Memory(MemoryCache::new()))),
        CacheDriver::Redis => {
            #[cfg(feature = "redis-cache")]
            {
                let redis_url = config.redis_url.as_ref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "Redis URL is required when using Redis cache driver. \
                         Set 'redis_url' in cache configuration or use AGRINEWS_CACHE_REDIS_URL."
                    )
                })?;

                let cache = RedisCache::new(redis_url).await?;
                Ok(Arc::new(Cache::Redis(cache)))
            }

            #[cfg(not(feature = "redis-cache"))]
            {
                anyhow::bail!(
                    "Redis cache driver is configured but the 'redis-cache' feature is not enabled. \
                     Either enable the feature with `--features redis-cache` or use 'memory' cache driver."
                )
            }
        }
    }
}

/// Create the store holding refresh tokens.
///
/// The in-memory driver gets an unbounded store so no amount of cached
/// detail traffic can push a live token out. Redis keeps keys with a TTL
/// until they expire under the default `noeviction` policy.
pub async fn create_session_store(config: &CacheConfig) -> Result<Arc<Cache>> {
    match config.driver {
        CacheDriver::Memory => Ok(Arc::new(Cache::Memory(MemoryCache::unbounded()))),
        CacheDriver::Redis => create_cache(config).await,
    }
}
