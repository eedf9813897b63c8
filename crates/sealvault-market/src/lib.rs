//! # SealVault Market
//!
//! The marketplace client: digital twins, pools, staking, and
//! subscriptions, driven through signed ledger transactions.
//!
//! ## Overview
//!
//! A [`Market`] wraps one actor's signing capability and a ledger handle.
//! Every mutation follows the same read-pin-sign-execute cycle: read fresh
//! state, pin the object versions the decision depended on, sign, execute,
//! and on a stale pin re-read and resubmit within a bounded retry budget.
//! Reads that feed access decisions (subscription expiry, balances) always
//! go back to the ledger and its clock, never to a cached copy.

pub mod error;
pub mod market;

pub use error::{MarketError, Result};
pub use market::{Market, MarketConfig, PoolParams};
