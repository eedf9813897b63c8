//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a deterministic in-memory
//! network (ledger, blob store, key-server committee) and per-actor vaults.

use std::sync::Arc;
use std::time::Duration;

use sealvault::{MemoryBlobStore, SealVault, VaultConfig};
use sealvault_core::{Address, Keypair, ObjectId, PackageId};
use sealvault_ledger::{Ledger, MemoryLedger};
use sealvault_market::{Market, MarketConfig};
use sealvault_seal::{EngineConfig, KeyServer, LocalKeyServer, SealEngine};
use sealvault_session::SessionKey;

/// Default session TTL used by fixture vaults.
pub const TEST_SESSION_TTL_MS: i64 = 10 * 60 * 1000;

/// A deterministic in-process network: one ledger, one blob store, and a
/// key-server committee, all sharing the same package id.
pub struct TestNet {
    pub ledger: Arc<MemoryLedger>,
    pub store: Arc<MemoryBlobStore>,
    pub servers: Vec<Arc<dyn KeyServer>>,
    pub package: PackageId,
}

impl TestNet {
    /// Create a network with `server_count` key servers, seeded so repeated
    /// runs produce identical key material.
    pub fn new(server_count: u8) -> Self {
        let ledger = Arc::new(MemoryLedger::new());
        let package = PackageId::from_bytes([0x99; 32]);
        let servers = (0..server_count)
            .map(|i| {
                Arc::new(LocalKeyServer::from_seed(
                    ObjectId::from_bytes([0x70 + i; 32]),
                    package,
                    [0x40 + i; 32],
                    ledger.clone(),
                )) as Arc<dyn KeyServer>
            })
            .collect();
        Self {
            ledger,
            store: Arc::new(MemoryBlobStore::new()),
            servers,
            package,
        }
    }

    /// An engine over this network's full committee.
    pub fn engine(&self) -> SealEngine {
        SealEngine::new(
            self.servers.clone(),
            EngineConfig {
                package: self.package,
                share_deadline: Duration::from_secs(2),
            },
        )
    }

    /// A vault acting for the deterministic actor derived from `seed`.
    pub fn vault(&self, seed: u8) -> SealVault<MemoryLedger, MemoryBlobStore> {
        let market = Market::new(
            self.ledger.clone(),
            actor_keypair(seed),
            MarketConfig::default(),
        );
        SealVault::new(
            market,
            self.engine(),
            self.store.clone(),
            VaultConfig {
                package: self.package,
                session_ttl_ms: TEST_SESSION_TTL_MS,
                storage_epochs: 5,
            },
        )
    }

    /// Credit an actor's account from the test faucet.
    pub async fn fund(&self, address: &Address, amount: u64) {
        self.ledger.credit(address, amount).await;
    }

    /// Create and approve a session for an actor, stamped with the current
    /// ledger clock.
    pub async fn approved_session(&self, keypair: &Keypair) -> SessionKey {
        let now_ms = self
            .ledger
            .clock_ms()
            .await
            .expect("memory ledger clock never fails");
        let requester = Address::from_public_key(&keypair.public_key());
        let mut session =
            SessionKey::create(requester, self.package, TEST_SESSION_TTL_MS, now_ms)
                .expect("positive ttl");
        let signature = keypair.sign(&session.personal_message());
        session
            .attach_signature(keypair.public_key(), signature)
            .expect("fresh session accepts its own signature");
        session
    }
}

/// Deterministic keypair for an actor seed.
pub fn actor_keypair(seed: u8) -> Keypair {
    Keypair::from_seed(&[seed; 32])
}

/// Deterministic address for an actor seed.
pub fn actor_address(seed: u8) -> Address {
    Address::from_public_key(&actor_keypair(seed).public_key())
}

/// Keypairs for multi-party tests, seeds 1..=count.
pub fn multi_party_keypairs(count: u8) -> Vec<Keypair> {
    (1..=count).map(actor_keypair).collect()
}
