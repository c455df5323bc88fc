//! Domain types, services, and the ingestion pipeline.
//!
//! Public surface:
//! - [`UserRecord`] and [`SealedUserRecord`]: plaintext and encrypted record
//!   shapes, with [`UserId`] as the identity.
//! - [`UserRecordService`]: cache-aside lookups and synchronous writes.
//! - [`UserPageService`] and [`page_stream`]: paged listings.
//! - [`ingestion`]: the staged ingestion pipeline.
//! - [`Error`] and [`ErrorCode`]: caller-facing failures.

pub mod error;
pub mod ingestion;
pub mod pipeline_error;
pub mod ports;
pub mod user_page_service;
pub mod user_record;
pub mod user_service;
pub mod write_through;

#[cfg(test)]
pub(crate) mod fixtures;

pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::pipeline_error::{PipelineError, PipelineErrorKind};
pub use self::user_page_service::{UserPageService, page_stream};
pub use self::user_record::{
    EncryptedEmail, RecordDecodeError, SealedUserRecord, UserId, UserIdParseError, UserRecord,
};
pub use self::user_service::UserRecordService;
pub use self::write_through::Timeouts;

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use userstream::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::conflict("user 1 already exists"))
/// }
/// # assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
