//! # SealVault Testkit
//!
//! Testing utilities for SealVault.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a deterministic in-process network (ledger, blob store,
//!   key-server committee) and per-actor vaults
//! - **Generators**: proptest strategies for addresses, identities,
//!   thresholds, and payloads
//! - **Golden vectors**: pinned identity encodings for cross-version
//!   stability checks
//!
//! ## Fixtures
//!
//! ```rust,ignore
//! use sealvault_testkit::fixtures::TestNet;
//!
//! let net = TestNet::new(3);
//! let owner = net.vault(1);
//! owner.market().mint_twin().await?;
//! owner.upload_record("mri-2024", b"scan", "{}", 2).await?;
//! ```
//!
//! ## Property testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use sealvault_testkit::generators;
//!
//! proptest! {
//!     #[test]
//!     fn identity_roundtrips(id in generators::identity()) {
//!         prop_assert!(id.decode().is_ok());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{actor_address, actor_keypair, multi_party_keypairs, TestNet};
pub use vectors::{all_vectors, identity_from_vector, verify_all_vectors, GoldenVector};
