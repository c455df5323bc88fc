//! Page-at-a-time listing primitives shared by the user record endpoints.
//!
//! A listing is walked with [`PageRequest`] values addressed by a 1-based page
//! index. Adapters fetch one row more than the page size so that
//! [`Page::from_lookahead`] can tell whether the page is the terminal one
//! without issuing a further query. [`PageCursor`] turns a request into an
//! opaque token and [`PageEnvelope`] is the serialisable response shape.

mod cursor;
mod envelope;
mod page;
mod request;

pub use cursor::{CursorError, PageCursor};
pub use envelope::PageEnvelope;
pub use page::Page;
pub use request::{MAX_PAGE_SIZE, PageRequest, PageRequestError};
