//! Error types for ledger operations.

use thiserror::Error;

use sealvault_core::{Address, ObjectId};

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A transaction pinned an object version that no longer matches.
    /// The caller must re-read state and resubmit; never retry blindly.
    #[error("stale version for object {object}: pinned {pinned}, current {current}")]
    StaleObjectVersion {
        object: ObjectId,
        pinned: u64,
        current: u64,
    },

    /// Referenced object does not exist.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// The sender already minted a twin.
    #[error("twin already exists for owner {0}")]
    TwinExists(Address),

    /// A record with this name already exists under the twin.
    #[error("record already exists: {0}")]
    RecordExists(String),

    /// No record with this name exists under the twin.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// The (provider, record) pair is already staked into this pool.
    #[error("record already staked: {0}")]
    AlreadyStaked(String),

    /// The payer does not hold enough balance.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: u64, available: u64 },

    /// Payment below the pool's subscription price.
    #[error("insufficient payment: price {price}, offered {offered}")]
    InsufficientPayment { price: u64, offered: u64 },

    /// Malformed caller input; never retried.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The policy evaluator rejected the request. Fatal for this
    /// identity/session combination; never presented as transient.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Transaction signature did not verify against the sender address.
    #[error("invalid transaction signature")]
    InvalidSignature,

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
