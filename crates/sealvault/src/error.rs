//! Error types for the unified vault API.

use thiserror::Error;

use sealvault_core::Address;
use sealvault_ledger::LedgerError;
use sealvault_market::MarketError;
use sealvault_seal::SealError;
use sealvault_session::SessionError;

use crate::store::StoreError;

/// Errors surfaced by the unified vault API.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Malformed caller input.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The actor has not minted a digital twin yet.
    #[error("no twin minted for {0}")]
    TwinNotMinted(Address),

    /// No record with this name exists under the twin.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// Session-key error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Threshold encryption or share-fetch error.
    #[error(transparent)]
    Seal(#[from] SealError),

    /// Marketplace transaction error.
    #[error(transparent)]
    Market(#[from] MarketError),

    /// Ledger read error.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Blob storage error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
