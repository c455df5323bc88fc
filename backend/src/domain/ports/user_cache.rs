//! Port for the user record cache.
//!
//! The cache is an optimisation only. Callers treat every error as a miss and
//! never fail a request because of it. Entries expire after a TTL fixed when
//! the adapter is constructed.

use async_trait::async_trait;

use crate::domain::SealedUserRecord;

use super::{UserCacheKey, define_port_error};

define_port_error! {
    /// Errors raised by user cache adapters.
    pub enum UserCacheError {
        /// The cache backend could not be reached or rejected the command.
        Backend { message: String } => "user cache backend failure: {message}",
        /// A cached value could not be encoded or decoded.
        Serialization { message: String } =>
            "user cache serialization failure: {message}",
    }
}

/// Key-value cache of sealed user records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserCache: Send + Sync {
    /// Look up a record; `Ok(None)` on a miss.
    async fn get(&self, key: &UserCacheKey) -> Result<Option<SealedUserRecord>, UserCacheError>;

    /// Store a record under `key` with the adapter's TTL.
    async fn set(&self, key: &UserCacheKey, record: &SealedUserRecord)
    -> Result<(), UserCacheError>;

    /// Evict `key`. Evicting an absent key succeeds.
    async fn delete(&self, key: &UserCacheKey) -> Result<(), UserCacheError>;
}
