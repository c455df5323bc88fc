//! Page requests addressed by a 1-based page index.

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u64 = 1_000;

/// Errors raised when constructing a [`PageRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageRequestError {
    /// Page indices start at one.
    #[error("page index must be at least 1")]
    ZeroIndex,
    /// The page size must cover at least one record.
    #[error("page size must be at least 1")]
    ZeroLimit,
    /// The page size exceeds [`MAX_PAGE_SIZE`].
    #[error("page size must be at most {max}")]
    LimitTooLarge {
        /// Upper bound that was exceeded.
        max: u64,
    },
}

/// A request for one page of an ordered listing.
///
/// Pages are 1-based and never overlap: page `P` of size `L` covers the rows
/// at 0-based offsets `(P - 1) * L` up to, but excluding, `P * L`.
///
/// # Examples
/// ```
/// use pagination::PageRequest;
///
/// let request = PageRequest::new(3, 10)?;
/// assert_eq!(request.offset(), 20);
/// assert_eq!(request.fetch_limit(), 11);
/// # Ok::<(), pagination::PageRequestError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPageRequest", into = "RawPageRequest")]
pub struct PageRequest {
    index: NonZeroU64,
    limit: NonZeroU64,
}

#[derive(Serialize, Deserialize)]
struct RawPageRequest {
    page: u64,
    limit: u64,
}

impl PageRequest {
    /// Validate and build a request for page `index` holding `limit` rows.
    ///
    /// # Errors
    ///
    /// Returns [`PageRequestError`] when the index or limit is zero, or the
    /// limit exceeds [`MAX_PAGE_SIZE`].
    pub fn new(index: u64, limit: u64) -> Result<Self, PageRequestError> {
        let page_index = NonZeroU64::new(index).ok_or(PageRequestError::ZeroIndex)?;
        let page_limit = NonZeroU64::new(limit).ok_or(PageRequestError::ZeroLimit)?;
        if limit > MAX_PAGE_SIZE {
            return Err(PageRequestError::LimitTooLarge { max: MAX_PAGE_SIZE });
        }
        Ok(Self {
            index: page_index,
            limit: page_limit,
        })
    }

    /// Request the first page of a listing.
    ///
    /// # Errors
    ///
    /// Returns [`PageRequestError`] when `limit` is out of range.
    pub fn first(limit: u64) -> Result<Self, PageRequestError> {
        Self::new(1, limit)
    }

    /// The 1-based page index.
    #[must_use]
    pub const fn index(&self) -> u64 {
        self.index.get()
    }

    /// Number of rows the page holds.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit.get()
    }

    /// 0-based offset of the first row of this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.index.get().saturating_sub(1).saturating_mul(self.limit.get())
    }

    /// Row count to ask the store for: one past the page to detect the end.
    #[must_use]
    pub const fn fetch_limit(&self) -> u64 {
        self.limit.get().saturating_add(1)
    }

    /// The request for the following page, if the index does not overflow.
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        self.index.checked_add(1).map(|index| Self {
            index,
            limit: self.limit,
        })
    }
}

impl TryFrom<RawPageRequest> for PageRequest {
    type Error = PageRequestError;

    fn try_from(value: RawPageRequest) -> Result<Self, Self::Error> {
        Self::new(value.page, value.limit)
    }
}

impl From<PageRequest> for RawPageRequest {
    fn from(value: PageRequest) -> Self {
        Self {
            page: value.index(),
            limit: value.limit(),
        }
    }
}
