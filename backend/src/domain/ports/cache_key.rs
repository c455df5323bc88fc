//! Cache key type shared by user cache adapters.
use thiserror::Error;

use crate::domain::UserId;

/// Cache key addressing one cached user record.
///
/// Keys produced by [`UserCacheKey::for_user`] are the decimal form of the
/// record id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserCacheKey(String);

impl UserCacheKey {
    /// Construct a cache key after validating that it is non-empty and trimmed.
    pub fn new(value: impl Into<String>) -> Result<Self, UserCacheKeyValidationError> {
        let raw = value.into();
        if raw.trim().is_empty() {
            return Err(UserCacheKeyValidationError::Empty);
        }
        if raw.trim() != raw {
            return Err(UserCacheKeyValidationError::ContainsWhitespace);
        }
        Ok(Self(raw))
    }

    /// Key for the record with `id`.
    pub fn for_user(id: UserId) -> Self {
        Self(id.to_string())
    }

    /// Borrow the underlying key as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for UserCacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for UserCacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Validation errors returned when constructing [`UserCacheKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserCacheKeyValidationError {
    /// Key is empty after trimming whitespace.
    #[error("user cache key must not be empty")]
    Empty,
    /// Key contains leading or trailing whitespace.
    #[error("user cache key must not contain surrounding whitespace")]
    ContainsWhitespace,
}
