//! # SealVault Core
//!
//! Pure primitives for SealVault: addresses, object identifiers, encryption
//! identities, and signing.
//!
//! This crate contains no I/O, no ledger access, no networking. It is pure
//! computation over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`Address`] - A 32-byte account address derived from an Ed25519 public key
//! - [`Identity`] - Canonical bytes for an (owner, resource name) pair, used
//!   as the IBE public identity
//! - [`ObjectId`] / [`PackageId`] / [`BlobId`] - Ledger and store identifiers
//! - [`Keypair`] - Ed25519 signing capability

pub mod crypto;
pub mod error;
pub mod identity;
pub mod types;

pub use crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::CoreError;
pub use identity::Identity;
pub use types::{Address, BlobId, ObjectId, PackageId};
