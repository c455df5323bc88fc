//! User records as ingested, stored and served.
//!
//! Two shapes exist. [`UserRecord`] carries the plaintext email and only
//! lives inside the read services and the decoder. [`SealedUserRecord`]
//! carries an [`EncryptedEmail`] and is the only shape the store and the
//! cache ever see, so plaintext PII cannot reach either by construction.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ports::{CipherError, PiiCipher};

/// Identifier of a user record, unique in the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a raw identifier.
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// The raw identifier.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a user id cannot be parsed from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("user id must be a decimal integer, got {value:?}")]
pub struct UserIdParseError {
    value: String,
}

impl FromStr for UserId {
    type Err = UserIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self).map_err(|_| UserIdParseError {
            value: s.to_owned(),
        })
    }
}

/// Email ciphertext produced by a [`PiiCipher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedEmail(String);

impl EncryptedEmail {
    /// Wrap ciphertext read back from storage.
    pub fn from_ciphertext(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the ciphertext.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Take ownership of the ciphertext.
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// A user record with its email in plaintext.
///
/// Deserialisation accepts the batch wire format: `id` and `parent_user_id`
/// may be integers or decimal strings, timestamps may be RFC 3339 strings,
/// epoch milliseconds or `null`, and `email_address` is accepted for `email`.
/// Every key must be present. Negative milliseconds and a zero parent id
/// decode to absent values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireUserRecord")]
pub struct UserRecord {
    /// Unique record identifier.
    pub id: UserId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Plaintext email.
    pub email: String,
    /// When the user was created upstream.
    pub created_at: Option<DateTime<Utc>>,
    /// When the user was deleted upstream.
    pub deleted_at: Option<DateTime<Utc>>,
    /// When the user was merged into another account.
    pub merged_at: Option<DateTime<Utc>>,
    /// Account this user was merged into, if any.
    pub parent_user_id: Option<UserId>,
}

/// A user record whose email has been encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedUserRecord {
    /// Unique record identifier.
    pub id: UserId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Email ciphertext.
    pub email: EncryptedEmail,
    /// When the user was created upstream.
    pub created_at: Option<DateTime<Utc>>,
    /// When the user was deleted upstream.
    pub deleted_at: Option<DateTime<Utc>>,
    /// When the user was merged into another account.
    pub merged_at: Option<DateTime<Utc>>,
    /// Account this user was merged into, if any.
    pub parent_user_id: Option<UserId>,
}

impl UserRecord {
    /// Encrypt the email, consuming the plaintext record.
    pub fn seal(self, cipher: &dyn PiiCipher) -> Result<SealedUserRecord, CipherError> {
        let email = EncryptedEmail(cipher.encrypt(&self.email)?);
        Ok(SealedUserRecord {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email,
            created_at: self.created_at,
            deleted_at: self.deleted_at,
            merged_at: self.merged_at,
            parent_user_id: self.parent_user_id,
        })
    }
}

impl SealedUserRecord {
    /// Decrypt the email, yielding a record fit to return to a caller.
    pub fn unseal(self, cipher: &dyn PiiCipher) -> Result<UserRecord, CipherError> {
        let email = cipher.decrypt(self.email.as_str())?;
        Ok(UserRecord {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email,
            created_at: self.created_at,
            deleted_at: self.deleted_at,
            merged_at: self.merged_at,
            parent_user_id: self.parent_user_id,
        })
    }
}

/// Field-level decode failures for a wire record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordDecodeError {
    /// `id` is not a decimal integer.
    #[error("invalid id: {value:?}")]
    InvalidId {
        /// Offending text.
        value: String,
    },
    /// A timestamp is neither RFC 3339 nor in range as epoch milliseconds.
    #[error("invalid {field}: {value:?}")]
    InvalidTimestamp {
        /// Name of the timestamp key.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// `parent_user_id` is not a decimal integer.
    #[error("invalid parent_user_id: {value:?}")]
    InvalidParent {
        /// Offending text.
        value: String,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireOptionalId {
    Number(i64),
    Text(String),
    Null,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Millis(i64),
    Text(String),
    Null,
}

// Nullable keys use untagged enums with a unit variant rather than `Option`
// so that a missing key fails instead of defaulting to `None`.
#[derive(Deserialize)]
struct WireUserRecord {
    id: WireId,
    first_name: String,
    last_name: String,
    #[serde(alias = "email_address")]
    email: String,
    created_at: WireTimestamp,
    deleted_at: WireTimestamp,
    merged_at: WireTimestamp,
    parent_user_id: WireOptionalId,
}

impl WireTimestamp {
    fn resolve(self, field: &'static str) -> Result<Option<DateTime<Utc>>, RecordDecodeError> {
        match self {
            Self::Null => Ok(None),
            Self::Millis(millis) if millis < 0 => Ok(None),
            Self::Millis(millis) => DateTime::from_timestamp_millis(millis).map(Some).ok_or(
                RecordDecodeError::InvalidTimestamp {
                    field,
                    value: millis.to_string(),
                },
            ),
            Self::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|instant| Some(instant.with_timezone(&Utc)))
                .map_err(|_| RecordDecodeError::InvalidTimestamp { field, value: text }),
        }
    }
}

impl TryFrom<WireUserRecord> for UserRecord {
    type Error = RecordDecodeError;

    fn try_from(wire: WireUserRecord) -> Result<Self, Self::Error> {
        let id = match wire.id {
            WireId::Number(value) => UserId(value),
            WireId::Text(text) => text
                .parse()
                .map_err(|_| RecordDecodeError::InvalidId { value: text })?,
        };
        let parent_user_id = match wire.parent_user_id {
            WireOptionalId::Null => None,
            WireOptionalId::Number(value) => Some(UserId(value)),
            WireOptionalId::Text(text) => Some(
                text.parse()
                    .map_err(|_| RecordDecodeError::InvalidParent { value: text })?,
            ),
        }
        .filter(|parent: &UserId| parent.get() != 0);

        Ok(Self {
            id,
            first_name: wire.first_name,
            last_name: wire.last_name,
            email: wire.email,
            created_at: wire.created_at.resolve("created_at")?,
            deleted_at: wire.deleted_at.resolve("deleted_at")?,
            merged_at: wire.merged_at.resolve("merged_at")?,
            parent_user_id,
        })
    }
}
