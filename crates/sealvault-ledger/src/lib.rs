//! # SealVault Ledger
//!
//! The ledger abstraction: authoritative state objects, signed transactions,
//! and the on-chain policy evaluator.
//!
//! ## Overview
//!
//! All authoritative state lives on a distributed ledger: the digital twin
//! (an owner's identity object with its record map), pools (economic
//! grouping objects with balances, staked records and subscriber expiries),
//! account balances, and the shared clock. The client never trusts its own
//! wall clock or any cached balance; it re-reads before every decision.
//!
//! ## Key pieces
//!
//! - [`Ledger`] - async trait for reads, event queries, and atomic signed
//!   transaction execution with optimistic-concurrency version pins
//! - [`policy`] - the two policy-check entry points the key servers run
//!   during decryption (owner proof, subscriber proof)
//! - [`MemoryLedger`] - reference implementation with a settable clock,
//!   used by tests and the local key-server network

pub mod error;
pub mod memory;
pub mod objects;
pub mod policy;
pub mod traits;
pub mod transaction;

pub use error::{LedgerError, Result};
pub use memory::MemoryLedger;
pub use objects::{DigitalTwin, HealthRecordRef, Pool, StakedRecord, SUBSCRIPTION_PERIOD_MS};
pub use traits::Ledger;
pub use transaction::{
    Command, Effects, Event, EventFilter, EventKind, EventType, SignedTransaction, Transaction,
    VersionPin,
};
