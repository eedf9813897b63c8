//! Signed transactions, version pins, and the ledger event log.
//!
//! Every mutation is a signed transaction submitted by the caller's own
//! signing capability; this crate never signs on a caller's behalf. A
//! transaction pins the versions of the objects it read so a concurrent
//! writer surfaces as `StaleObjectVersion` instead of a lost update.

use serde::{Deserialize, Serialize};

use sealvault_core::{Address, BlobId, Ed25519PublicKey, Ed25519Signature, Keypair, ObjectId};

use crate::error::{LedgerError, Result};

/// Domain separator for transaction signing bytes.
const TX_DOMAIN: &[u8] = b"sealvault-tx-v0:";

/// A mutating ledger command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Mint the sender's digital twin. Once per owner.
    MintTwin,

    /// Append an immutable record reference to the sender's twin.
    AddRecord {
        twin: ObjectId,
        name: String,
        blob_id: BlobId,
        metadata_json: String,
    },

    /// Create a new pool with zero balance and zero staked records.
    CreatePool {
        name: String,
        description: String,
        criteria: String,
        subscription_price: u64,
    },

    /// Add funds to a pool's balance. No cap.
    FundPool { pool: ObjectId, amount: u64 },

    /// Stake one of the sender's records into a pool.
    StakeRecord {
        pool: ObjectId,
        twin: ObjectId,
        record_name: String,
    },

    /// Pay for a subscription; the expiry is overwritten, never extended.
    Subscribe { pool: ObjectId, payment: u64 },
}

/// An object version observed at read time, asserted at execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPin {
    pub object: ObjectId,
    pub version: u64,
}

/// An unsigned transaction: sender, command, and the versions it read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Address,
    pub command: Command,
    pub pins: Vec<VersionPin>,
}

impl Transaction {
    /// Create a transaction with no version pins.
    pub fn new(sender: Address, command: Command) -> Self {
        Self {
            sender,
            command,
            pins: Vec::new(),
        }
    }

    /// Pin an object version this transaction depends on.
    pub fn pin(mut self, object: ObjectId, version: u64) -> Self {
        self.pins.push(VersionPin { object, version });
        self
    }

    /// The canonical bytes the sender signs.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut buf = TX_DOMAIN.to_vec();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Sign with the sender's keypair.
    pub fn sign(self, keypair: &Keypair) -> SignedTransaction {
        let signature = keypair.sign(&self.signing_bytes());
        SignedTransaction {
            transaction: self,
            public_key: keypair.public_key(),
            signature,
        }
    }
}

/// A transaction plus the sender's signature over its canonical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub public_key: Ed25519PublicKey,
    pub signature: Ed25519Signature,
}

impl SignedTransaction {
    /// Verify the signature and that the public key derives the sender
    /// address.
    pub fn verify(&self) -> Result<()> {
        if Address::from_public_key(&self.public_key) != self.transaction.sender {
            return Err(LedgerError::InvalidSignature);
        }
        self.public_key
            .verify(&self.transaction.signing_bytes(), &self.signature)
            .map_err(|_| LedgerError::InvalidSignature)
    }
}

/// The observable outcome of an executed transaction.
#[derive(Debug, Clone, Default)]
pub struct Effects {
    /// Ids of objects created by this transaction, in creation order.
    pub created: Vec<ObjectId>,
    /// Events emitted by this transaction.
    pub events: Vec<Event>,
}

/// A ledger event with its emission timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub timestamp_ms: i64,
}

/// Event payloads emitted by the marketplace program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    TwinMinted {
        twin: ObjectId,
        owner: Address,
    },
    RecordAdded {
        twin: ObjectId,
        name: String,
    },
    PoolCreated {
        pool: ObjectId,
        owner: Address,
    },
    PoolFunded {
        pool: ObjectId,
        amount: u64,
    },
    DataStaked {
        pool: ObjectId,
        provider: Address,
        record_name: String,
    },
    Subscribed {
        pool: ObjectId,
        subscriber: Address,
        expires_at_ms: i64,
    },
}

impl EventKind {
    /// The index tag the ledger can filter on.
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::TwinMinted { .. } => EventType::TwinMinted,
            EventKind::RecordAdded { .. } => EventType::RecordAdded,
            EventKind::PoolCreated { .. } => EventType::PoolCreated,
            EventKind::PoolFunded { .. } => EventType::PoolFunded,
            EventKind::DataStaked { .. } => EventType::DataStaked,
            EventKind::Subscribed { .. } => EventType::Subscribed,
        }
    }
}

/// Event type tags for index-side filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    TwinMinted,
    RecordAdded,
    PoolCreated,
    PoolFunded,
    DataStaked,
    Subscribed,
}

/// Event query filter.
///
/// The ledger's event index supports filtering by event type only; callers
/// filter by correlation fields (e.g. pool id) client-side.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFilter {
    pub event_type: Option<EventType>,
}

impl EventFilter {
    /// Filter to one event type.
    pub fn by_type(event_type: EventType) -> Self {
        Self {
            event_type: Some(event_type),
        }
    }

    /// Whether an event passes this filter.
    pub fn matches(&self, event: &Event) -> bool {
        match self.event_type {
            Some(t) => event.kind.event_type() == t,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let keypair = Keypair::from_seed(&[1; 32]);
        let sender = Address::from_public_key(&keypair.public_key());

        let signed = Transaction::new(sender, Command::MintTwin).sign(&keypair);
        signed.verify().unwrap();
    }

    #[test]
    fn test_verify_rejects_wrong_sender() {
        let keypair = Keypair::from_seed(&[1; 32]);
        let not_sender = Address::from_bytes([9; 32]);

        let signed = Transaction::new(not_sender, Command::MintTwin).sign(&keypair);
        assert!(matches!(
            signed.verify(),
            Err(LedgerError::InvalidSignature)
        ));
    }

    #[test]
    fn test_verify_rejects_tampered_command() {
        let keypair = Keypair::from_seed(&[1; 32]);
        let sender = Address::from_public_key(&keypair.public_key());

        let mut signed = Transaction::new(
            sender,
            Command::FundPool {
                pool: ObjectId::from_bytes([2; 32]),
                amount: 10,
            },
        )
        .sign(&keypair);

        signed.transaction.command = Command::FundPool {
            pool: ObjectId::from_bytes([2; 32]),
            amount: 10_000,
        };
        assert!(matches!(
            signed.verify(),
            Err(LedgerError::InvalidSignature)
        ));
    }

    #[test]
    fn test_event_filter() {
        let staked = Event {
            kind: EventKind::DataStaked {
                pool: ObjectId::ZERO,
                provider: Address::ZERO,
                record_name: "x".into(),
            },
            timestamp_ms: 1,
        };
        let funded = Event {
            kind: EventKind::PoolFunded {
                pool: ObjectId::ZERO,
                amount: 1,
            },
            timestamp_ms: 2,
        };

        let filter = EventFilter::by_type(EventType::DataStaked);
        assert!(filter.matches(&staked));
        assert!(!filter.matches(&funded));
        assert!(EventFilter::default().matches(&funded));
    }
}
