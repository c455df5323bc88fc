//! PostgreSQL-backed `UserStore` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::ports::{UserStore, UserStoreError};
use crate::domain::{SealedUserRecord, UserId};

use super::models::UserRecordRow;
use super::pool::{DbPool, PoolError};
use super::schema::user_records;

/// Diesel-backed implementation of the `UserStore` port.
///
/// Uniqueness of the id is enforced by the primary key; a violation is
/// reported as [`UserStoreError::Duplicate`].
#[derive(Clone)]
pub struct DieselUserStore {
    pool: DbPool,
}

impl DieselUserStore {
    /// Create a new store over the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserStoreError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            UserStoreError::connection(message)
        }
    }
}

/// Map Diesel errors for a statement touching record `id`, when known.
fn map_diesel_error(error: diesel::result::Error, id: Option<UserId>) -> UserStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match (error, id) {
        (DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _), Some(id)) => {
            UserStoreError::duplicate(id.get())
        }
        (DieselError::NotFound, Some(id)) => UserStoreError::not_found(id.get()),
        (DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _), _) => {
            UserStoreError::connection("database connection error")
        }
        (DieselError::QueryBuilderError(_), _) => UserStoreError::query("database query error"),
        _ => UserStoreError::query("database error"),
    }
}

fn to_sql_bound(value: u64, name: &str) -> Result<i64, UserStoreError> {
    i64::try_from(value).map_err(|_| UserStoreError::query(format!("{name} {value} out of range")))
}

#[async_trait]
impl UserStore for DieselUserStore {
    async fn create_user(&self, record: &SealedUserRecord) -> Result<(), UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(user_records::table)
            .values(UserRecordRow::from(record))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_diesel_error(err, Some(record.id)))
    }

    async fn get_user_by_id(
        &self,
        id: UserId,
    ) -> Result<Option<SealedUserRecord>, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        user_records::table
            .find(id.get())
            .select(UserRecordRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|row| row.map(SealedUserRecord::from))
            .map_err(|err| map_diesel_error(err, None))
    }

    async fn get_all_users(&self) -> Result<Vec<SealedUserRecord>, UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<UserRecordRow> = user_records::table
            .order(user_records::id.asc())
            .select(UserRecordRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, None))?;
        Ok(rows.into_iter().map(SealedUserRecord::from).collect())
    }

    async fn list_users(
        &self,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<SealedUserRecord>, UserStoreError> {
        let sql_limit = to_sql_bound(limit, "limit")?;
        let sql_offset = to_sql_bound(offset, "offset")?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<UserRecordRow> = user_records::table
            .order(user_records::id.asc())
            .limit(sql_limit)
            .offset(sql_offset)
            .select(UserRecordRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, None))?;
        Ok(rows.into_iter().map(SealedUserRecord::from).collect())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), UserStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(user_records::table.find(id.get()))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, Some(id)))?;
        if deleted == 0 {
            return Err(UserStoreError::not_found(id.get()));
        }
        Ok(())
    }
}
