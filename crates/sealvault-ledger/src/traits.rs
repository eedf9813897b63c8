//! The `Ledger` trait: the single authority for state, time, and policy.

use async_trait::async_trait;

use sealvault_core::Address;
use sealvault_core::ObjectId;
use sealvault_session::AuthorizationRequest;

use crate::error::Result;
use crate::objects::{DigitalTwin, Pool};
use crate::transaction::{Effects, Event, EventFilter, SignedTransaction};

/// Read and write access to authoritative ledger state.
///
/// Implementations must treat `execute` as atomic: a transaction either
/// applies all of its mutations and emits all of its events, or leaves the
/// ledger untouched. The clock returned by `clock_ms` is the only time
/// source the protocol trusts.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Fetch a digital twin by object id.
    async fn twin(&self, id: &ObjectId) -> Result<DigitalTwin>;

    /// Fetch the twin owned by an address, if one was minted.
    async fn twin_by_owner(&self, owner: &Address) -> Result<Option<DigitalTwin>>;

    /// Fetch a pool by object id.
    async fn pool(&self, id: &ObjectId) -> Result<Pool>;

    /// The spendable balance of an account. Unknown accounts hold zero.
    async fn balance_of(&self, address: &Address) -> Result<u64>;

    /// The shared ledger clock, in milliseconds.
    async fn clock_ms(&self) -> Result<i64>;

    /// Query the event log. The index filters by event type only; callers
    /// narrow by correlation fields client-side.
    async fn query_events(&self, filter: &EventFilter) -> Result<Vec<Event>>;

    /// Verify and atomically execute a signed transaction.
    ///
    /// Version pins are checked against current state first; a mismatch
    /// fails the whole transaction with `StaleObjectVersion` before any
    /// mutation happens.
    async fn execute(&self, signed: SignedTransaction) -> Result<Effects>;

    /// Run the policy evaluator for an authorization request.
    ///
    /// Key servers call this with the requester derived from a verified
    /// session certificate. Returns `Ok(())` on approval; any rejection is
    /// `AccessDenied` and fatal for the identity/session combination.
    async fn check_policy(&self, request: &AuthorizationRequest, requester: &Address)
        -> Result<()>;
}
