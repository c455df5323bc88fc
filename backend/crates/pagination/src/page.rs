//! A single page of results with terminal-page detection.

use crate::request::PageRequest;

/// One page of an ordered listing.
///
/// ## Invariants
/// - `items.len() <= request.limit()`.
/// - A terminal page has no successor; [`Page::next_request`] returns `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    items: Vec<T>,
    request: PageRequest,
    terminal: bool,
}

impl<T> Page<T> {
    /// Build a page from rows fetched with [`PageRequest::fetch_limit`].
    ///
    /// The store is asked for one row beyond the page. If it returned no more
    /// than `limit` rows there is nothing after this page, so it is terminal;
    /// the look-ahead row, when present, is discarded.
    ///
    /// # Examples
    /// ```
    /// use pagination::{Page, PageRequest};
    ///
    /// let request = PageRequest::first(2)?;
    /// let page = Page::from_lookahead(request, vec![1, 2, 3]);
    /// assert_eq!(page.items(), &[1, 2]);
    /// assert!(!page.is_terminal());
    ///
    /// let last = Page::from_lookahead(request.next().expect("page 2"), vec![3]);
    /// assert!(last.is_terminal());
    /// assert!(last.next_request().is_none());
    /// # Ok::<(), pagination::PageRequestError>(())
    /// ```
    #[must_use]
    pub fn from_lookahead(request: PageRequest, mut items: Vec<T>) -> Self {
        let limit = usize::try_from(request.limit()).unwrap_or(usize::MAX);
        let terminal = items.len() <= limit;
        items.truncate(limit);
        Self {
            items,
            request,
            terminal,
        }
    }

    /// Borrow the rows on this page.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Take ownership of the rows on this page.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Number of rows on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether this page holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The request that produced this page.
    #[must_use]
    pub const fn request(&self) -> PageRequest {
        self.request
    }

    /// Whether no data exists beyond this page.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// The request for the following page, or `None` on the terminal page.
    #[must_use]
    pub fn next_request(&self) -> Option<PageRequest> {
        if self.terminal {
            None
        } else {
            self.request.next()
        }
    }

    /// Convert every row, keeping page position and terminal state.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `convert`.
    pub fn try_map<U, E, F>(self, convert: F) -> Result<Page<U>, E>
    where
        F: FnMut(T) -> Result<U, E>,
    {
        let items = self
            .items
            .into_iter()
            .map(convert)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            request: self.request,
            terminal: self.terminal,
        })
    }
}
