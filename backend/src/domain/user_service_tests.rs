//! Tests for the cache-aside user record service.

use std::sync::Arc;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::fixtures::{plain_record, sealed_record};
use crate::domain::ports::{
    FixturePiiCipher, MockPiiCipher, MockUserCache, MockUserStore, UserCacheError,
};
use mockall::predicate::eq;
use rstest::rstest;

fn make_service(store: MockUserStore, cache: MockUserCache) -> UserRecordService {
    UserRecordService::new(
        Arc::new(store),
        Arc::new(cache),
        Arc::new(FixturePiiCipher),
        Timeouts::default(),
    )
}

#[rstest]
#[tokio::test]
async fn cache_hit_skips_the_store() {
    let mut store = MockUserStore::new();
    store.expect_get_user_by_id().never();
    let mut cache = MockUserCache::new();
    cache
        .expect_get()
        .times(1)
        .returning(|_| Ok(Some(sealed_record(1))));

    let record = make_service(store, cache)
        .get(UserId::new(1))
        .await
        .expect("cached record");
    assert_eq!(record, plain_record(1));
}

#[rstest]
#[tokio::test]
async fn miss_falls_back_to_store_and_caches_ciphertext() {
    let mut store = MockUserStore::new();
    store
        .expect_get_user_by_id()
        .with(eq(UserId::new(1)))
        .times(1)
        .returning(|_| Ok(Some(sealed_record(1))));
    let mut cache = MockUserCache::new();
    cache.expect_get().times(1).returning(|_| Ok(None));
    cache
        .expect_set()
        .withf(|key, record| key.as_str() == "1" && record.email.as_str() != "user1@example.com")
        .times(1)
        .returning(|_, _| Ok(()));

    let record = make_service(store, cache)
        .get(UserId::new(1))
        .await
        .expect("stored record");
    assert_eq!(record.email, "user1@example.com");
}

#[rstest]
#[tokio::test]
async fn cache_errors_degrade_to_store_reads() {
    let mut store = MockUserStore::new();
    store
        .expect_get_user_by_id()
        .returning(|_| Ok(Some(sealed_record(2))));
    let mut cache = MockUserCache::new();
    cache
        .expect_get()
        .returning(|_| Err(UserCacheError::backend("down")));
    cache
        .expect_set()
        .returning(|_, _| Err(UserCacheError::backend("down")));

    let record = make_service(store, cache)
        .get(UserId::new(2))
        .await
        .expect("store record despite cache outage");
    assert_eq!(record.id, UserId::new(2));
}

#[rstest]
#[tokio::test]
async fn store_miss_is_not_found() {
    let mut store = MockUserStore::new();
    store.expect_get_user_by_id().returning(|_| Ok(None));
    let mut cache = MockUserCache::new();
    cache.expect_get().returning(|_| Ok(None));
    cache.expect_set().never();

    let err = make_service(store, cache)
        .get(UserId::new(9))
        .await
        .expect_err("missing record");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn list_decrypts_every_record_without_the_cache() {
    let mut store = MockUserStore::new();
    store
        .expect_get_all_users()
        .returning(|| Ok(vec![sealed_record(1), sealed_record(2)]));
    let mut cache = MockUserCache::new();
    cache.expect_get().never();

    let records = make_service(store, cache).list().await.expect("list");
    assert_eq!(records, vec![plain_record(1), plain_record(2)]);
}

#[rstest]
#[case(UserStoreError::duplicate(1_i64), ErrorCode::Conflict)]
#[case(UserStoreError::connection("refused"), ErrorCode::ServiceUnavailable)]
#[case(UserStoreError::query("bad column"), ErrorCode::InternalError)]
#[tokio::test]
async fn create_surfaces_store_failures(#[case] failure: UserStoreError, #[case] code: ErrorCode) {
    let mut store = MockUserStore::new();
    store
        .expect_create_user()
        .times(1)
        .return_once(move |_| Err(failure));
    let mut cache = MockUserCache::new();
    cache.expect_set().never();

    let err = make_service(store, cache)
        .create(plain_record(1))
        .await
        .expect_err("store failure surfaces");
    assert_eq!(err.code(), code);
}

#[rstest]
#[tokio::test]
async fn create_encrypts_before_writing() {
    let mut store = MockUserStore::new();
    store
        .expect_create_user()
        .withf(|record| record.email.as_str() == "sealed:moc.elpmaxe@1resu")
        .times(1)
        .returning(|_| Ok(()));
    let mut cache = MockUserCache::new();
    cache.expect_set().times(1).returning(|_, _| Ok(()));

    make_service(store, cache)
        .create(plain_record(1))
        .await
        .expect("create succeeds");
}

#[rstest]
#[tokio::test]
async fn create_reports_cipher_failure_without_writing() {
    let mut store = MockUserStore::new();
    store.expect_create_user().never();
    let mut cipher = MockPiiCipher::new();
    cipher
        .expect_encrypt()
        .returning(|_| Err(CipherError::encrypt("no entropy")));
    let service = UserRecordService::new(
        Arc::new(store),
        Arc::new(MockUserCache::new()),
        Arc::new(cipher),
        Timeouts::default(),
    );

    let err = service
        .create(plain_record(3))
        .await
        .expect_err("cipher failure");
    assert_eq!(err.code(), ErrorCode::InternalError);
}

#[rstest]
#[tokio::test]
async fn delete_evicts_only_after_store_success() {
    let mut store = MockUserStore::new();
    store
        .expect_delete_user()
        .with(eq(UserId::new(4)))
        .times(1)
        .returning(|_| Ok(()));
    let mut cache = MockUserCache::new();
    cache
        .expect_delete()
        .withf(|key| key.as_str() == "4")
        .times(1)
        .returning(|_| Err(UserCacheError::backend("down")));

    make_service(store, cache)
        .delete(UserId::new(4))
        .await
        .expect("cache failure is not surfaced");
}

#[rstest]
#[tokio::test]
async fn delete_of_missing_record_keeps_cache_untouched() {
    let mut store = MockUserStore::new();
    store
        .expect_delete_user()
        .returning(|id| Err(UserStoreError::not_found(id.get())));
    let mut cache = MockUserCache::new();
    cache.expect_delete().never();

    let err = make_service(store, cache)
        .delete(UserId::new(4))
        .await
        .expect_err("missing row");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

struct StalledStore;

#[async_trait]
impl UserStore for StalledStore {
    async fn create_user(&self, _record: &SealedUserRecord) -> Result<(), UserStoreError> {
        std::future::pending().await
    }

    async fn get_user_by_id(
        &self,
        _id: UserId,
    ) -> Result<Option<SealedUserRecord>, UserStoreError> {
        std::future::pending().await
    }

    async fn get_all_users(&self) -> Result<Vec<SealedUserRecord>, UserStoreError> {
        std::future::pending().await
    }

    async fn list_users(
        &self,
        _limit: u64,
        _offset: u64,
    ) -> Result<Vec<SealedUserRecord>, UserStoreError> {
        std::future::pending().await
    }

    async fn delete_user(&self, _id: UserId) -> Result<(), UserStoreError> {
        std::future::pending().await
    }
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn stalled_store_surfaces_timeout() {
    let mut cache = MockUserCache::new();
    cache.expect_get().returning(|_| Ok(None));
    let service = UserRecordService::new(
        Arc::new(StalledStore),
        Arc::new(cache),
        Arc::new(FixturePiiCipher),
        Timeouts::default(),
    );

    let err = service
        .get(UserId::new(1))
        .await
        .expect_err("deadline exceeded");
    assert_eq!(err.code(), ErrorCode::Timeout);
}
