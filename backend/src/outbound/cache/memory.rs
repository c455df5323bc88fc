//! Process-local `UserCache` with per-entry expiry.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::domain::SealedUserRecord;
use crate::domain::ports::{UserCache, UserCacheError, UserCacheKey};

/// In-memory cache used when no Redis URL is configured.
///
/// Expired entries are swept on the first write after each TTL interval, so
/// memory stays bounded by what was written within roughly two TTLs.
#[derive(Debug)]
pub struct InMemoryUserCache {
    ttl: Duration,
    entries: RwLock<Entries>,
}

#[derive(Debug)]
struct Entries {
    map: HashMap<UserCacheKey, (SealedUserRecord, Instant)>,
    next_sweep: Instant,
}

impl Entries {
    fn sweep_if_due(&mut self, now: Instant, ttl: Duration) {
        if now < self.next_sweep {
            return;
        }
        self.map.retain(|_, (_, expires_at)| *expires_at > now);
        self.next_sweep = now + ttl;
    }
}

impl InMemoryUserCache {
    /// Create a cache whose entries expire `ttl` after being set.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(Entries {
                map: HashMap::new(),
                next_sweep: Instant::now() + ttl,
            }),
        }
    }

    /// Whether a live entry exists for `key`.
    pub async fn contains(&self, key: &UserCacheKey) -> bool {
        self.entries
            .read()
            .await
            .map
            .get(key)
            .is_some_and(|(_, expires_at)| *expires_at > Instant::now())
    }
}

#[async_trait]
impl UserCache for InMemoryUserCache {
    async fn get(&self, key: &UserCacheKey) -> Result<Option<SealedUserRecord>, UserCacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.map.get(key) {
                Some((record, expires_at)) if *expires_at > now => return Ok(Some(record.clone())),
                None => return Ok(None),
                Some(_) => {}
            }
        }
        let mut entries = self.entries.write().await;
        if entries
            .map
            .get(key)
            .is_some_and(|(_, expires_at)| *expires_at <= now)
        {
            entries.map.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &UserCacheKey, record: &SealedUserRecord) -> Result<(), UserCacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.sweep_if_due(now, self.ttl);
        entries
            .map
            .insert(key.clone(), (record.clone(), now + self.ttl));
        Ok(())
    }

    async fn delete(&self, key: &UserCacheKey) -> Result<(), UserCacheError> {
        self.entries.write().await.map.remove(key);
        Ok(())
    }
}
