//! Internal Diesel row structs for the user store.
//!
//! These types never leave the persistence layer.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::{EncryptedEmail, SealedUserRecord, UserId};

use super::schema::user_records;

/// Row struct for reading and inserting `user_records`.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = user_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRecordRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub parent_user_id: Option<i64>,
}

impl From<&SealedUserRecord> for UserRecordRow {
    fn from(record: &SealedUserRecord) -> Self {
        Self {
            id: record.id.get(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.as_str().to_owned(),
            created_at: record.created_at,
            deleted_at: record.deleted_at,
            merged_at: record.merged_at,
            parent_user_id: record.parent_user_id.map(UserId::get),
        }
    }
}

impl From<UserRecordRow> for SealedUserRecord {
    fn from(row: UserRecordRow) -> Self {
        Self {
            id: UserId::new(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            email: EncryptedEmail::from_ciphertext(row.email),
            created_at: row.created_at,
            deleted_at: row.deleted_at,
            merged_at: row.merged_at,
            parent_user_id: row.parent_user_id.map(UserId::new),
        }
    }
}
