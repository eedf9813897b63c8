//! Error types for session-key operations.

use thiserror::Error;

/// Errors that can occur during session-key operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Malformed caller input; never retried.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A personal-message signature was already attached.
    #[error("session key is already signed")]
    AlreadySigned,

    /// The signature does not verify against the requester address for the
    /// canonical challenge message.
    #[error("personal message signature mismatch")]
    SignatureMismatch,

    /// The session key has no signature attached yet.
    #[error("session key is unsigned")]
    Unsigned,

    /// The session key's TTL has elapsed.
    #[error("session key expired at {expires_at_ms}")]
    Expired { expires_at_ms: i64 },

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
