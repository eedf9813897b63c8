//! The on-chain object model: digital twins, health records, and pools.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use sealvault_core::{Address, BlobId, ObjectId};

/// Fixed subscription period: 30 days in milliseconds.
///
/// Re-subscribing overwrites the expiry to `now + SUBSCRIPTION_PERIOD_MS`;
/// periods never stack.
pub const SUBSCRIPTION_PERIOD_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// A pointer to one uploaded record. Immutable after creation; there is no
/// update or delete operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecordRef {
    /// Unique key within the owning twin.
    pub name: String,
    /// Where the ciphertext lives in the content-addressable store.
    pub blob_id: BlobId,
    /// Caller-supplied metadata, opaque to the ledger.
    pub metadata_json: String,
    /// Ledger time at upload (milliseconds).
    pub timestamp_ms: i64,
    /// Whether an attestor has verified this record.
    pub verified: bool,
}

/// The on-chain identity object for a data owner.
///
/// Minted once per owner, mutated only by adding records, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalTwin {
    pub id: ObjectId,
    pub owner: Address,
    pub reputation_score: u64,
    /// Record names are unique per twin.
    pub records: BTreeMap<String, HealthRecordRef>,
    /// Optimistic-concurrency version, bumped on every mutation.
    pub version: u64,
}

impl DigitalTwin {
    /// Look up a record by name.
    pub fn record(&self, name: &str) -> Option<&HealthRecordRef> {
        self.records.get(name)
    }
}

/// One staked record inside a pool: who provided it and under what name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakedRecord {
    pub provider: Address,
    pub record_name: String,
}

/// An economic grouping object: aggregates staked records and funds, gating
/// access behind a subscription fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: ObjectId,
    pub name: String,
    pub description: String,
    pub criteria: String,
    pub balance: u64,
    pub data_count: u64,
    pub subscription_price: u64,
    pub owner: Address,
    /// Subscriber address → expiration timestamp (ledger milliseconds).
    pub subscribers: BTreeMap<Address, i64>,
    pub staked: Vec<StakedRecord>,
    /// Optimistic-concurrency version, bumped on every mutation.
    pub version: u64,
}

impl Pool {
    /// Whether a (provider, record name) pair is staked into this pool.
    pub fn is_staked(&self, provider: &Address, record_name: &str) -> bool {
        self.staked
            .iter()
            .any(|s| &s.provider == provider && s.record_name == record_name)
    }

    /// The sole admissible definition of "active subscription":
    /// an entry exists and is strictly greater than the ledger clock.
    /// Absence of an entry is not an error, just `false`.
    pub fn subscription_active(&self, address: &Address, now_ms: i64) -> bool {
        match self.subscribers.get(address) {
            Some(&expires_at_ms) => expires_at_ms > now_ms,
            None => false,
        }
    }
}
