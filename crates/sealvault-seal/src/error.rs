//! Error types for the threshold encryption engine.

use thiserror::Error;

use sealvault_ledger::LedgerError;
use sealvault_session::SessionError;

/// Errors that can occur during encryption, share fetching, and decryption.
#[derive(Debug, Error)]
pub enum SealError {
    /// Malformed caller input (empty server set, bad hex, ...).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested threshold is outside `1..=total`.
    #[error("invalid threshold: {threshold} of {total} shares")]
    InvalidThreshold { threshold: u8, total: u8 },

    /// The session key is unsigned or its TTL has elapsed. The caller must
    /// create and sign a fresh session key.
    #[error("session key expired or unsigned")]
    SessionExpiredOrUnsigned,

    /// The authorization request targets a different identity than the one
    /// embedded in the ciphertext.
    #[error("authorization request identity does not match ciphertext identity")]
    IdentityMismatch,

    /// The policy evaluator rejected the request. Fatal for this
    /// identity/session combination.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Fewer valid shares were recovered than the ciphertext's threshold.
    /// Transient: servers may be down or unreachable.
    #[error("insufficient shares: got {got}, need {need}")]
    InsufficientShares { got: usize, need: u8 },

    /// A share failed structural validation (bad length, duplicate index).
    #[error("invalid share: {0}")]
    InvalidShare(String),

    /// Symmetric encryption failed.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Symmetric decryption failed (wrong key or corrupted ciphertext).
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Ledger error surfaced during a policy check or clock read.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl From<SessionError> for SealError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Expired { .. } | SessionError::Unsigned => {
                SealError::SessionExpiredOrUnsigned
            }
            SessionError::SignatureMismatch => {
                SealError::AccessDenied("session certificate did not verify".into())
            }
            other => SealError::InvalidParameter(other.to_string()),
        }
    }
}

/// Result type for seal operations.
pub type Result<T> = std::result::Result<T, SealError>;
