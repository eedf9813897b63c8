//! The on-chain policy evaluator.
//!
//! These are the only two entry points key servers consult before releasing
//! key shares. Both are pure functions over ledger state plus the ledger
//! clock; they hold no state of their own and perform no I/O. Any failed
//! check aborts with `AccessDenied`, which callers must treat as fatal for
//! the identity/session combination rather than transient.

use sealvault_core::{Address, Identity};

use crate::error::{LedgerError, Result};
use crate::objects::{DigitalTwin, Pool};

/// Approve an owner's request to decrypt their own record.
///
/// Passes only when the requester owns the twin, the identity was encoded
/// for the requester's address, and the named record exists under the twin.
pub fn approve_owner(identity: &Identity, twin: &DigitalTwin, requester: &Address) -> Result<()> {
    let (identity_owner, record_name) = decode_identity(identity)?;

    if &twin.owner != requester {
        return Err(LedgerError::AccessDenied(format!(
            "requester {requester} does not own twin {}",
            twin.id
        )));
    }
    if &identity_owner != requester {
        return Err(LedgerError::AccessDenied(format!(
            "identity owner {identity_owner} does not match requester {requester}"
        )));
    }
    if twin.record(&record_name).is_none() {
        return Err(LedgerError::AccessDenied(format!(
            "no record named {record_name:?} under twin {}",
            twin.id
        )));
    }
    Ok(())
}

/// Approve a subscriber's request to decrypt a record staked into a pool.
///
/// Passes only when the identity's (owner, record name) pair is staked into
/// the pool and the requester holds a subscription whose expiry is strictly
/// after the ledger clock.
pub fn approve_subscriber(
    identity: &Identity,
    pool: &Pool,
    now_ms: i64,
    requester: &Address,
) -> Result<()> {
    let (provider, record_name) = decode_identity(identity)?;

    if !pool.is_staked(&provider, &record_name) {
        return Err(LedgerError::AccessDenied(format!(
            "record {record_name:?} from provider {provider} is not staked in pool {}",
            pool.id
        )));
    }
    if !pool.subscription_active(requester, now_ms) {
        return Err(LedgerError::AccessDenied(format!(
            "no active subscription for {requester} in pool {}",
            pool.id
        )));
    }
    Ok(())
}

/// A malformed identity is an access failure, not a parse failure; the
/// evaluator never leaks which part of the encoding was wrong.
fn decode_identity(identity: &Identity) -> Result<(Address, String)> {
    identity
        .decode()
        .map_err(|_| LedgerError::AccessDenied("malformed identity".into()))
}
