//! Page-at-a-time listing of user records.
//!
//! Pages follow the 0-based, gap-free convention of [`PageRequest`]: page
//! `P` of size `L` starts at row `(P - 1) * L`. Each call asks the store for
//! one row beyond the page, so the terminal page is known without a further
//! round trip. Calls are stateless; callers drive the walk.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, Stream};
use pagination::{Page, PageRequest};
use tracing::debug;

use crate::domain::ports::{PiiCipher, UserPagesQuery, UserStore};
use crate::domain::user_service::{map_cipher_error, map_write_error};
use crate::domain::write_through::bounded;
use crate::domain::{Error, UserRecord};

/// Serves pages of decrypted user records from the store.
#[derive(Clone)]
pub struct UserPageService {
    store: Arc<dyn UserStore>,
    cipher: Arc<dyn PiiCipher>,
    store_timeout: Duration,
}

impl UserPageService {
    /// Create the service over shared store and cipher handles.
    pub fn new(store: Arc<dyn UserStore>, cipher: Arc<dyn PiiCipher>, store_timeout: Duration) -> Self {
        Self {
            store,
            cipher,
            store_timeout,
        }
    }
}

#[async_trait]
impl UserPagesQuery for UserPageService {
    async fn next_page(&self, request: PageRequest) -> Result<Page<UserRecord>, Error> {
        let rows = bounded(
            self.store_timeout,
            self.store
                .list_users(request.fetch_limit(), request.offset()),
        )
        .await
        .map_err(map_write_error)?;

        let page = Page::from_lookahead(request, rows);
        debug!(
            page = request.index(),
            limit = request.limit(),
            rows = page.len(),
            terminal = page.is_terminal(),
            "fetched user page"
        );
        page.try_map(|record| {
            record
                .unseal(self.cipher.as_ref())
                .map_err(|err| map_cipher_error(&err))
        })
    }
}

/// Walk pages from `first` until the terminal page or the first error.
///
/// The terminal page is yielded and nothing is requested after it.
pub fn page_stream(
    pages: Arc<dyn UserPagesQuery>,
    first: PageRequest,
) -> impl Stream<Item = Result<Page<UserRecord>, Error>> + Send + 'static {
    stream::unfold(Some(first), move |next| {
        let pages = Arc::clone(&pages);
        async move {
            let request = next?;
            match pages.next_page(request).await {
                Ok(page) => {
                    let following = page.next_request();
                    Some((Ok(page), following))
                }
                Err(err) => Some((Err(err), None)),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{plain_record, sealed_record};
    use crate::domain::ports::{FixturePiiCipher, MockUserPagesQuery, MockUserStore};
    use crate::domain::{ErrorCode, SealedUserRecord};
    use futures_util::StreamExt;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store_with(total: i64, calls: Arc<AtomicUsize>) -> MockUserStore {
        let rows: Vec<SealedUserRecord> = (1..=total).map(sealed_record).collect();
        let mut store = MockUserStore::new();
        store.expect_list_users().returning(move |limit, offset| {
            calls.fetch_add(1, Ordering::SeqCst);
            let start = usize::try_from(offset).expect("offset fits").min(rows.len());
            let end = start
                .saturating_add(usize::try_from(limit).expect("limit fits"))
                .min(rows.len());
            Ok(rows[start..end].to_vec())
        });
        store
    }

    #[rstest]
    #[case(0, 3, 1)]
    #[case(1, 3, 1)]
    #[case(3, 3, 1)]
    #[case(4, 3, 2)]
    #[case(10, 3, 4)]
    #[case(10, 5, 2)]
    #[case(7, 1, 7)]
    #[tokio::test]
    async fn walk_yields_every_record_once_and_stops_at_terminal(
        #[case] total: i64,
        #[case] limit: u64,
        #[case] expected_pages: usize,
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = UserPageService::new(
            Arc::new(store_with(total, Arc::clone(&calls))),
            Arc::new(FixturePiiCipher),
            Duration::from_secs(1),
        );
        let first = PageRequest::first(limit).expect("valid request");

        let pages: Vec<Page<UserRecord>> = page_stream(Arc::new(service), first)
            .map(|page| page.expect("page"))
            .collect()
            .await;

        assert_eq!(pages.len(), expected_pages);
        assert_eq!(calls.load(Ordering::SeqCst), expected_pages);
        assert!(pages.last().is_some_and(Page::is_terminal));
        assert!(pages.iter().rev().skip(1).all(|page| !page.is_terminal()));
        let ids: Vec<i64> = pages
            .into_iter()
            .flat_map(Page::into_items)
            .map(|record| record.id.get())
            .collect();
        assert_eq!(ids, (1..=total).collect::<Vec<_>>());
    }

    #[rstest]
    #[tokio::test]
    async fn pages_are_decrypted() {
        let service = UserPageService::new(
            Arc::new(store_with(2, Arc::new(AtomicUsize::new(0)))),
            Arc::new(FixturePiiCipher),
            Duration::from_secs(1),
        );
        let page = service
            .next_page(PageRequest::first(5).expect("valid request"))
            .await
            .expect("page");
        assert_eq!(page.items(), &[plain_record(1), plain_record(2)]);
    }

    #[rstest]
    #[tokio::test]
    async fn stream_ends_after_first_error() {
        let mut pages = MockUserPagesQuery::new();
        pages
            .expect_next_page()
            .times(1)
            .returning(|_| Err(Error::service_unavailable("store down")));
        let first = PageRequest::first(2).expect("valid request");

        let results: Vec<_> = page_stream(Arc::new(pages), first).collect().await;
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results.first(),
            Some(Err(err)) if err.code() == ErrorCode::ServiceUnavailable
        ));
    }
}
