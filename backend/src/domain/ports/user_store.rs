//! Port for the durable user record store.
//!
//! The store is the source of truth. It only ever holds
//! [`SealedUserRecord`] values and enforces uniqueness of the record id.

use async_trait::async_trait;

use crate::domain::{SealedUserRecord, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user store adapters.
    pub enum UserStoreError {
        /// No record exists for the id.
        NotFound { id: i64 } => "user {id} not found",
        /// A record with the id already exists.
        Duplicate { id: i64 } => "user {id} already exists",
        /// Store connection could not be established.
        Connection { message: String } => "user store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user store query failed: {message}",
    }
}

/// Durable storage for user records.
///
/// Implementations must be safe for concurrent use: the ingestion pipeline
/// and the read services share one handle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new record.
    ///
    /// Fails with [`UserStoreError::Duplicate`] when the id is taken; the
    /// existing row is left untouched.
    async fn create_user(&self, record: &SealedUserRecord) -> Result<(), UserStoreError>;

    /// Fetch one record, or `None` when no row has the id.
    async fn get_user_by_id(&self, id: UserId)
    -> Result<Option<SealedUserRecord>, UserStoreError>;

    /// Fetch every record ordered by id.
    async fn get_all_users(&self) -> Result<Vec<SealedUserRecord>, UserStoreError>;

    /// Fetch at most `limit` records ordered by id, skipping the first `offset`.
    async fn list_users(
        &self,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<SealedUserRecord>, UserStoreError>;

    /// Remove a record.
    ///
    /// Fails with [`UserStoreError::NotFound`] when no row has the id.
    async fn delete_user(&self, id: UserId) -> Result<(), UserStoreError>;
}
