//! Driving ports for the user record use cases.
//!
//! Inbound adapters depend on these traits rather than on the services that
//! implement them, so handlers can be tested against mocks.

use async_trait::async_trait;
use pagination::{Page, PageRequest};

use crate::domain::{Error, UserId, UserRecord};

/// Read access to single records and full listings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRecordsQuery: Send + Sync {
    /// Fetch one record with its email decrypted.
    async fn get(&self, id: UserId) -> Result<UserRecord, Error>;

    /// Fetch every record with emails decrypted.
    async fn list(&self) -> Result<Vec<UserRecord>, Error>;
}

/// Synchronous caller-facing mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRecordsCommand: Send + Sync {
    /// Create a record; a taken id surfaces as a conflict.
    async fn create(&self, record: UserRecord) -> Result<(), Error>;

    /// Delete a record and evict it from the cache.
    async fn delete(&self, id: UserId) -> Result<(), Error>;
}

/// Page-at-a-time listing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserPagesQuery: Send + Sync {
    /// Fetch the page named by `request` with emails decrypted.
    async fn next_page(&self, request: PageRequest) -> Result<Page<UserRecord>, Error>;
}
