//! Failures observed by the ingestion pipeline.
//!
//! A [`PipelineError`] is an observation only. Stages hand it to the error
//! sink and carry on with the next item; it never changes control flow.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::domain::UserId;
use crate::domain::ports::UserStoreError;

/// Category of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineErrorKind {
    /// A batch failed to decode and was dropped whole.
    Decode,
    /// A record's email could not be encrypted.
    Encrypt,
    /// The record id already exists in the store.
    Duplicate,
    /// The store write exceeded its deadline.
    Timeout,
    /// Any other store failure.
    Store,
}

impl PipelineErrorKind {
    /// Stable lowercase name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Encrypt => "encrypt",
            Self::Duplicate => "duplicate",
            Self::Timeout => "timeout",
            Self::Store => "store",
        }
    }
}

impl fmt::Display for PipelineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged failure with its cause and, where available, the offending input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct PipelineError {
    kind: PipelineErrorKind,
    message: String,
    record_id: Option<UserId>,
    payload: Option<Vec<u8>>,
}

impl PipelineError {
    fn new(kind: PipelineErrorKind, message: impl Into<String>, record_id: Option<UserId>) -> Self {
        Self {
            kind,
            message: message.into(),
            record_id,
            payload: None,
        }
    }

    /// A batch that failed to decode, keeping the raw payload.
    pub fn decode(message: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            payload: Some(payload),
            ..Self::new(PipelineErrorKind::Decode, message, None)
        }
    }

    /// A record whose email could not be encrypted.
    pub fn encrypt(id: UserId, message: impl Into<String>) -> Self {
        Self::new(PipelineErrorKind::Encrypt, message, Some(id))
    }

    /// A store write that did not finish within `after`.
    pub fn timeout(id: UserId, after: Duration) -> Self {
        Self::new(
            PipelineErrorKind::Timeout,
            format!("store write exceeded {}ms", after.as_millis()),
            Some(id),
        )
    }

    /// Classify a store failure for record `id`.
    pub fn from_store(id: UserId, err: &UserStoreError) -> Self {
        let kind = match err {
            UserStoreError::Duplicate { .. } => PipelineErrorKind::Duplicate,
            _ => PipelineErrorKind::Store,
        };
        Self::new(kind, err.to_string(), Some(id))
    }

    /// Failure category.
    pub fn kind(&self) -> PipelineErrorKind {
        self.kind
    }

    /// Human-readable cause.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Id of the record concerned, when known.
    pub fn record_id(&self) -> Option<UserId> {
        self.record_id
    }

    /// Offending batch payload, for decode failures.
    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(UserStoreError::duplicate(3_i64), PipelineErrorKind::Duplicate)]
    #[case(UserStoreError::connection("refused"), PipelineErrorKind::Store)]
    #[case(UserStoreError::query("syntax"), PipelineErrorKind::Store)]
    fn store_failures_are_classified(#[case] err: UserStoreError, #[case] kind: PipelineErrorKind) {
        let pipeline_error = PipelineError::from_store(UserId::new(3), &err);
        assert_eq!(pipeline_error.kind(), kind);
        assert_eq!(pipeline_error.record_id(), Some(UserId::new(3)));
    }

    #[rstest]
    fn decode_errors_keep_the_payload() {
        let err = PipelineError::decode("expected value", b"{oops".to_vec());
        assert_eq!(err.payload(), Some(b"{oops".as_slice()));
        assert_eq!(err.to_string(), "decode: expected value");
    }
}
