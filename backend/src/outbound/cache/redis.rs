//! Redis-backed `UserCache` adapter.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis;
use tracing::debug;

use crate::domain::SealedUserRecord;
use crate::domain::ports::{UserCache, UserCacheError, UserCacheKey};
use crate::outbound::redis_pool::RedisPool;

/// Caches sealed records as JSON strings under `user:<id>`.
#[derive(Clone)]
pub struct RedisUserCache {
    pool: RedisPool,
    ttl_secs: u64,
}

const KEY_PREFIX: &str = "user:";

impl RedisUserCache {
    /// Create a cache whose entries expire after `ttl` (at least one second).
    pub fn new(pool: RedisPool, ttl: Duration) -> Self {
        Self {
            pool,
            ttl_secs: ttl.as_secs().max(1),
        }
    }

    fn redis_key(key: &UserCacheKey) -> String {
        format!("{KEY_PREFIX}{key}")
    }
}

fn backend_error(err: impl std::fmt::Display) -> UserCacheError {
    UserCacheError::backend(err.to_string())
}

fn serialization_error(err: &serde_json::Error) -> UserCacheError {
    UserCacheError::serialization(err.to_string())
}

#[async_trait]
impl UserCache for RedisUserCache {
    async fn get(&self, key: &UserCacheKey) -> Result<Option<SealedUserRecord>, UserCacheError> {
        let mut conn = self.pool.get().await.map_err(backend_error)?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::redis_key(key))
            .query_async(&mut *conn)
            .await
            .map_err(backend_error)?;
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|err| serialization_error(&err))
    }

    async fn set(&self, key: &UserCacheKey, record: &SealedUserRecord) -> Result<(), UserCacheError> {
        let json = serde_json::to_string(record).map_err(|err| serialization_error(&err))?;
        let mut conn = self.pool.get().await.map_err(backend_error)?;
        let () = redis::cmd("SET")
            .arg(Self::redis_key(key))
            .arg(json)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut *conn)
            .await
            .map_err(backend_error)?;
        debug!(key = %key, ttl_secs = self.ttl_secs, "cached user record");
        Ok(())
    }

    async fn delete(&self, key: &UserCacheKey) -> Result<(), UserCacheError> {
        let mut conn = self.pool.get().await.map_err(backend_error)?;
        let removed: i64 = redis::cmd("DEL")
            .arg(Self::redis_key(key))
            .query_async(&mut *conn)
            .await
            .map_err(backend_error)?;
        debug!(key = %key, removed, "evicted user record");
        Ok(())
    }
}
