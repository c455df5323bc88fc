//! Serialisable response shape for a page of results.

use serde::Serialize;
use url::Url;

use crate::cursor::{CursorError, PageCursor};
use crate::page::Page;

/// JSON body returned for one page.
///
/// `next` is an absolute link to the following page and is omitted on the
/// terminal page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageEnvelope<T> {
    /// Rows on this page.
    pub data: Vec<T>,
    /// 1-based page index.
    pub page: u64,
    /// Requested page size.
    pub limit: u64,
    /// Whether no data exists beyond this page.
    pub terminal: bool,
    /// Link to the following page, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl<T> PageEnvelope<T> {
    /// Wrap `page`, deriving the `next` link from `base`.
    ///
    /// Any query already present on `base` is replaced by a `cursor`
    /// parameter.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError`] if the next cursor cannot be encoded.
    pub fn from_page(page: Page<T>, base: &Url) -> Result<Self, CursorError> {
        let request = page.request();
        let terminal = page.is_terminal();
        let next = page
            .next_request()
            .map(|next_request| {
                let cursor = PageCursor::encode(next_request)?;
                let mut link = base.clone();
                link.query_pairs_mut()
                    .clear()
                    .append_pair("cursor", cursor.as_str());
                Ok::<_, CursorError>(String::from(link))
            })
            .transpose()?;
        Ok(Self {
            data: page.into_items(),
            page: request.index(),
            limit: request.limit(),
            terminal,
            next,
        })
    }
}
