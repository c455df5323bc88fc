//! In-memory `UserStore` used when no database is configured, and by tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::ports::{UserStore, UserStoreError};
use crate::domain::{SealedUserRecord, UserId};

/// Ordered map of sealed records with the same semantics as the SQL store.
///
/// Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    records: RwLock<BTreeMap<UserId, SealedUserRecord>>,
}

impl InMemoryUserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create_user(&self, record: &SealedUserRecord) -> Result<(), UserStoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(UserStoreError::duplicate(record.id.get()));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_user_by_id(
        &self,
        id: UserId,
    ) -> Result<Option<SealedUserRecord>, UserStoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn get_all_users(&self) -> Result<Vec<SealedUserRecord>, UserStoreError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn list_users(
        &self,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<SealedUserRecord>, UserStoreError> {
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .records
            .read()
            .await
            .values()
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), UserStoreError> {
        self.records
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| UserStoreError::not_found(id.get()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EncryptedEmail;
    use rstest::{fixture, rstest};

    fn sealed(id: i64) -> SealedUserRecord {
        SealedUserRecord {
            id: UserId::new(id),
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            email: EncryptedEmail::from_ciphertext(format!("cipher-{id}")),
            created_at: None,
            deleted_at: None,
            merged_at: None,
            parent_user_id: None,
        }
    }

    #[fixture]
    fn store() -> InMemoryUserStore {
        InMemoryUserStore::new()
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_create_keeps_the_first_row(store: InMemoryUserStore) {
        store.create_user(&sealed(1)).await.expect("first insert");
        let mut changed = sealed(1);
        changed.first_name = "Changed".to_owned();

        let err = store.create_user(&changed).await.expect_err("duplicate");
        assert_eq!(err, UserStoreError::duplicate(1_i64));
        assert_eq!(store.len().await, 1);
        let kept = store
            .get_user_by_id(UserId::new(1))
            .await
            .expect("lookup")
            .expect("row");
        assert_eq!(kept.first_name, "Ada");
    }

    #[rstest]
    #[tokio::test]
    async fn list_is_ordered_by_id(store: InMemoryUserStore) {
        for id in [5, 1, 3, 2, 4] {
            store.create_user(&sealed(id)).await.expect("insert");
        }
        let page = store.list_users(2, 1).await.expect("list");
        let ids: Vec<i64> = page.iter().map(|record| record.id.get()).collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(store.list_users(2, 10).await.expect("list").is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn delete_reports_missing_rows(store: InMemoryUserStore) {
        store.create_user(&sealed(7)).await.expect("insert");
        store.delete_user(UserId::new(7)).await.expect("delete");
        assert_eq!(
            store.delete_user(UserId::new(7)).await,
            Err(UserStoreError::not_found(7_i64))
        );
        assert!(store.is_empty().await);
    }
}
