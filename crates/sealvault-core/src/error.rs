//! Error types for SealVault core primitives.

use thiserror::Error;

/// Core errors for primitive operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("malformed identity: {0}")]
    MalformedIdentity(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
