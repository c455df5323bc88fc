//! Opaque cursor tokens for page requests.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use thiserror::Error;

use crate::request::PageRequest;

/// Errors raised while encoding or decoding a [`PageCursor`].
#[derive(Debug, Error)]
pub enum CursorError {
    /// The token is not valid URL-safe base64.
    #[error("cursor is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The decoded token is not a valid page request.
    #[error("cursor does not describe a page request: {0}")]
    Json(#[from] serde_json::Error),
}

/// URL-safe token carrying a [`PageRequest`].
///
/// Clients treat the token as opaque and hand it back to fetch the page it
/// names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCursor(String);

impl PageCursor {
    /// Encode `request` as a cursor token.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Json`] if the request cannot be serialised.
    pub fn encode(request: PageRequest) -> Result<Self, CursorError> {
        let json = serde_json::to_vec(&request)?;
        Ok(Self(URL_SAFE_NO_PAD.encode(json)))
    }

    /// Decode the page request carried by this token.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError`] when the token is malformed or names an invalid
    /// page.
    pub fn decode(&self) -> Result<PageRequest, CursorError> {
        let bytes = URL_SAFE_NO_PAD.decode(self.0.as_bytes())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Borrow the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PageCursor {
    fn from(value: String) -> Self {
        Self(value)
    }
}
