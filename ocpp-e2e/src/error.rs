//! Error types for key material, signatures and signing
//!
//! Parse and construction failures are `FormatError`s. Verification failures
//! are not errors at all; they surface as [`VerificationStatus`] values.
//!
//! [`VerificationStatus`]: crate::security::VerificationStatus

use thiserror::Error;

/// Malformed input: JSON, text encodings, binary frames or key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("missing mandatory field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("private key does not match public key")]
    KeyMismatch,

    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("unknown serialization: {0}")]
    UnknownSerialization(String),

    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("binary {what} truncated: needed {needed} bytes, {available} available")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("{field} is {len} bytes, exceeds binary limit of {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("{trailing} trailing bytes after binary {what}")]
    TrailingBytes { what: &'static str, trailing: usize },

    #[error("signing method '{0}' has no canonical form for this message")]
    UnsupportedSigningMethod(String),
}

impl FormatError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        FormatError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for FormatError {
    fn from(e: serde_json::Error) -> Self {
        FormatError::Json(e.to_string())
    }
}

/// Failures while producing signatures for an outgoing message.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("no signing identities for action '{0}'")]
    NoSignInfos(String),

    #[error("key {key_id} has no private key")]
    MissingPrivateKey { key_id: String },

    #[error(transparent)]
    Format(#[from] FormatError),
}
