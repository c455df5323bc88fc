//! Record builders shared by domain unit tests.

use crate::domain::ports::{FixturePiiCipher, PiiCipher};
use crate::domain::{SealedUserRecord, UserId, UserRecord};

/// Plaintext record with predictable fields derived from `id`.
pub(crate) fn plain_record(id: i64) -> UserRecord {
    UserRecord {
        id: UserId::new(id),
        first_name: format!("First{id}"),
        last_name: format!("Last{id}"),
        email: format!("user{id}@example.com"),
        created_at: None,
        deleted_at: None,
        merged_at: None,
        parent_user_id: None,
    }
}

/// [`plain_record`] sealed with [`FixturePiiCipher`].
pub(crate) fn sealed_record(id: i64) -> SealedUserRecord {
    plain_record(id)
        .seal(&FixturePiiCipher as &dyn PiiCipher)
        .expect("fixture cipher never fails")
}
