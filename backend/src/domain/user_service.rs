//! Cache-aside read service and synchronous write commands.
//!
//! Lookups try the cache first and fall back to the store, repopulating the
//! cache with the sealed record. Emails are decrypted only on the way out;
//! the cache only ever receives ciphertext.
//!
//! Store and cache are not updated atomically. A `get` that misses the cache
//! and reads a row just before a concurrent `delete` may write that row back
//! after the eviction; the stale entry is then served until its TTL lapses.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::ports::{
    CipherError, PiiCipher, UserCache, UserRecordsCommand, UserRecordsQuery, UserStore,
    UserStoreError,
};
use crate::domain::write_through::{
    Timeouts, WriteError, bounded, cache_evict, cache_get, cache_set, write_through,
};
use crate::domain::{Error, SealedUserRecord, UserId, UserRecord};

/// Map a store failure to a caller-facing error.
pub(crate) fn map_store_error(err: UserStoreError) -> Error {
    match err {
        UserStoreError::NotFound { id } => Error::not_found(format!("user {id} not found")),
        UserStoreError::Duplicate { id } => Error::conflict(format!("user {id} already exists")),
        UserStoreError::Connection { message } => {
            Error::service_unavailable(format!("user store unavailable: {message}"))
        }
        UserStoreError::Query { message } => {
            Error::internal(format!("user store query failed: {message}"))
        }
    }
}

pub(crate) fn map_write_error(err: WriteError) -> Error {
    match err {
        WriteError::Store(store_err) => map_store_error(store_err),
        WriteError::Timeout(after) => Error::timeout(format!(
            "user store did not respond within {}ms",
            after.as_millis()
        )),
    }
}

pub(crate) fn map_cipher_error(err: &CipherError) -> Error {
    Error::internal(format!("email could not be processed: {err}"))
}

/// Cache-aside user record service.
#[derive(Clone)]
pub struct UserRecordService {
    store: Arc<dyn UserStore>,
    cache: Arc<dyn UserCache>,
    cipher: Arc<dyn PiiCipher>,
    timeouts: Timeouts,
}

impl UserRecordService {
    /// Create the service over shared store, cache and cipher handles.
    pub fn new(
        store: Arc<dyn UserStore>,
        cache: Arc<dyn UserCache>,
        cipher: Arc<dyn PiiCipher>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            store,
            cache,
            cipher,
            timeouts,
        }
    }

    fn unseal(&self, record: SealedUserRecord) -> Result<UserRecord, Error> {
        record
            .unseal(self.cipher.as_ref())
            .map_err(|err| map_cipher_error(&err))
    }
}

#[async_trait]
impl UserRecordsQuery for UserRecordService {
    async fn get(&self, id: UserId) -> Result<UserRecord, Error> {
        if let Some(cached) = cache_get(self.cache.as_ref(), id, self.timeouts.cache).await {
            return self.unseal(cached);
        }

        let stored = bounded(self.timeouts.store, self.store.get_user_by_id(id))
            .await
            .map_err(map_write_error)?
            .ok_or_else(|| Error::not_found(format!("user {id} not found")))?;

        cache_set(self.cache.as_ref(), &stored, self.timeouts.cache).await;
        self.unseal(stored)
    }

    async fn list(&self) -> Result<Vec<UserRecord>, Error> {
        let stored = bounded(self.timeouts.store, self.store.get_all_users())
            .await
            .map_err(map_write_error)?;
        debug!(count = stored.len(), "listed user records");
        stored
            .into_iter()
            .map(|record| self.unseal(record))
            .collect()
    }
}

#[async_trait]
impl UserRecordsCommand for UserRecordService {
    async fn create(&self, record: UserRecord) -> Result<(), Error> {
        let id = record.id;
        let sealed = record
            .seal(self.cipher.as_ref())
            .map_err(|err| map_cipher_error(&err))?;
        write_through(
            self.store.as_ref(),
            self.cache.as_ref(),
            &sealed,
            self.timeouts,
        )
        .await
        .map_err(map_write_error)?;
        info!(record_id = %id, "user record created");
        Ok(())
    }

    async fn delete(&self, id: UserId) -> Result<(), Error> {
        bounded(self.timeouts.store, self.store.delete_user(id))
            .await
            .map_err(map_write_error)?;
        cache_evict(self.cache.as_ref(), id, self.timeouts.cache).await;
        info!(record_id = %id, "user record deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "user_service_tests.rs"]
mod tests;
