//! Error types for marketplace operations.

use thiserror::Error;

use sealvault_ledger::LedgerError;

/// Errors that can occur during marketplace operations.
#[derive(Debug, Error)]
pub enum MarketError {
    /// An underlying ledger operation failed. A `StaleObjectVersion` here
    /// means the retry budget was exhausted.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A transaction executed but produced different effects than the
    /// operation expected.
    #[error("unexpected transaction effects: {0}")]
    UnexpectedEffects(String),
}

/// Result type for marketplace operations.
pub type Result<T> = std::result::Result<T, MarketError>;
