//! Store-then-cache discipline shared by ingestion and synchronous writes.
//!
//! The store write is authoritative and bounded by a deadline. Cache calls
//! are best effort: every failure or timeout is logged and swallowed, so the
//! cache can be unavailable without affecting correctness.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::ports::{UserCache, UserCacheKey, UserStore, UserStoreError};
use crate::domain::{SealedUserRecord, UserId};

/// Deadlines applied to store and cache calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Bound on a single store call.
    pub store: Duration,
    /// Bound on a single cache call.
    pub cache: Duration,
}

impl Timeouts {
    /// Default bound on a store call.
    pub const DEFAULT_STORE: Duration = Duration::from_secs(15);
    /// Default bound on a cache call.
    pub const DEFAULT_CACHE: Duration = Duration::from_secs(2);
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            store: Self::DEFAULT_STORE,
            cache: Self::DEFAULT_CACHE,
        }
    }
}

/// Why a write-through did not reach the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WriteError {
    Store(UserStoreError),
    Timeout(Duration),
}

/// Whether the cache accepted the record after a successful store write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheWrite {
    Stored,
    Skipped,
}

/// Run a store call under `limit`, flattening the deadline into [`WriteError`].
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, WriteError>
where
    F: Future<Output = Result<T, UserStoreError>>,
{
    match timeout(limit, call).await {
        Ok(result) => result.map_err(WriteError::Store),
        Err(_) => Err(WriteError::Timeout(limit)),
    }
}

/// Write `record` to the store, then best effort to the cache.
pub(crate) async fn write_through(
    store: &dyn UserStore,
    cache: &dyn UserCache,
    record: &SealedUserRecord,
    timeouts: Timeouts,
) -> Result<CacheWrite, WriteError> {
    bounded(timeouts.store, store.create_user(record)).await?;
    let cached = cache_set(cache, record, timeouts.cache).await;
    Ok(if cached {
        CacheWrite::Stored
    } else {
        CacheWrite::Skipped
    })
}

/// Look a record up in the cache, treating any failure as a miss.
pub(crate) async fn cache_get(
    cache: &dyn UserCache,
    id: UserId,
    limit: Duration,
) -> Option<SealedUserRecord> {
    let key = UserCacheKey::for_user(id);
    match timeout(limit, cache.get(&key)).await {
        Ok(Ok(Some(record))) => {
            debug!(record_id = %id, "user cache hit");
            Some(record)
        }
        Ok(Ok(None)) => {
            debug!(record_id = %id, "user cache miss");
            None
        }
        Ok(Err(err)) => {
            warn!(record_id = %id, error = %err, "user cache lookup failed; reading store");
            None
        }
        Err(_) => {
            warn!(record_id = %id, timeout_ms = limit.as_millis(), "user cache lookup timed out; reading store");
            None
        }
    }
}

/// Store a record in the cache; returns whether it was accepted.
pub(crate) async fn cache_set(
    cache: &dyn UserCache,
    record: &SealedUserRecord,
    limit: Duration,
) -> bool {
    let key = UserCacheKey::for_user(record.id);
    match timeout(limit, cache.set(&key, record)).await {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            warn!(record_id = %record.id, error = %err, "user cache write failed");
            false
        }
        Err(_) => {
            warn!(record_id = %record.id, timeout_ms = limit.as_millis(), "user cache write timed out");
            false
        }
    }
}

/// Evict a record from the cache; the entry expires by TTL if this fails.
pub(crate) async fn cache_evict(cache: &dyn UserCache, id: UserId, limit: Duration) {
    let key = UserCacheKey::for_user(id);
    match timeout(limit, cache.delete(&key)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(record_id = %id, error = %err, "user cache eviction failed"),
        Err(_) => warn!(record_id = %id, timeout_ms = limit.as_millis(), "user cache eviction timed out"),
    }
}
