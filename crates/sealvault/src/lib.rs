//! # SealVault
//!
//! Identity-based threshold encryption gated by on-chain policy, with a
//! subscription marketplace for the encrypted data.
//!
//! ## Overview
//!
//! Data owners encrypt records under opaque identity byte strings and
//! anchor references to them on a distributed ledger (a digital twin per
//! owner). Decryption requires no key exchange with the owner: a requester
//! proves either ownership or an active pool subscription to a committee of
//! independent key servers, each of which re-verifies the requester's
//! session certificate against the ledger clock and runs the on-chain
//! policy evaluator before releasing its share of the content key. Any
//! `t` of `n` shares reconstruct the key; fewer reveal nothing.
//!
//! ## Layers
//!
//! - [`sealvault_core`] - addresses, identities, signing primitives
//! - [`sealvault_session`] - session keys and authorization requests
//! - [`sealvault_ledger`] - state objects, transactions, policy evaluator
//! - [`sealvault_seal`] - threshold encryption and the key-server protocol
//! - [`sealvault_market`] - twins, pools, staking, subscriptions
//! - [`SealVault`] - the unified per-actor API over all of the above
//!
//! ## Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use sealvault::{MemoryBlobStore, SealVault, VaultConfig};
//! # use sealvault_core::Keypair;
//! # use sealvault_ledger::MemoryLedger;
//! # use sealvault_market::{Market, MarketConfig};
//! # use sealvault_seal::{EngineConfig, SealEngine};
//! # async fn demo() -> anyhow::Result<()> {
//! let ledger = Arc::new(MemoryLedger::new());
//! let market = Market::new(ledger, Keypair::generate(), MarketConfig::default());
//! let engine = SealEngine::new(Vec::new(), EngineConfig::default());
//! let vault = SealVault::new(
//!     market,
//!     engine,
//!     Arc::new(MemoryBlobStore::new()),
//!     VaultConfig::default(),
//! );
//!
//! vault.market().mint_twin().await?;
//! let receipt = vault.upload_record("mri-2024", b"scan bytes", "{}", 2).await?;
//! let session = vault.create_session().await?;
//! let plaintext = vault.download_as_owner("mri-2024", &session).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod store;
pub mod vault;

pub use error::{Result, VaultError};
pub use store::{BlobStore, MemoryBlobStore, StoreError};
pub use vault::{SealVault, UploadReceipt, VaultConfig};

pub use sealvault_core::{Address, BlobId, Identity, Keypair, ObjectId, PackageId};
pub use sealvault_ledger::{Ledger, MemoryLedger, SUBSCRIPTION_PERIOD_MS};
pub use sealvault_market::{Market, MarketConfig, PoolParams};
pub use sealvault_seal::{BackupKey, EncryptedObject, EngineConfig, KeyServer, LocalKeyServer, SealEngine};
pub use sealvault_session::{AuthorizationRequest, SessionKey};
