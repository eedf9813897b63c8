//! # SealVault Seal
//!
//! The threshold encryption engine and key-server protocol.
//!
//! ## Overview
//!
//! A payload is encrypted under an opaque identity byte string with a
//! `t`-of-`n` policy: the content key is Shamir-split into `n` shares, each
//! wrapped to one key server's X25519 public key, and embedded in a
//! self-describing [`EncryptedObject`] alongside the ChaCha20-Poly1305
//! content envelope. No key server is contacted at encryption time.
//!
//! Decryption reverses the flow under authorization: the client presents a
//! signed [`ShareRequest`] (session certificate plus authorization request),
//! each server independently re-verifies the certificate against the ledger
//! clock and runs the on-chain policy evaluator, and once `t` shares come
//! back the client recombines the content key locally. Key servers never
//! see the content key or the plaintext.
//!
//! ## Key pieces
//!
//! - [`SealEngine`] - client-side encrypt/decrypt orchestration
//! - [`KeyServer`] / [`LocalKeyServer`] - the share-release protocol
//! - [`shamir`] - byte-wise secret sharing over GF(256)
//! - [`BackupKey`] - the disaster-recovery copy of the content key

pub mod crypto;
pub mod engine;
pub mod error;
pub mod object;
pub mod server;
pub mod shamir;

pub use crypto::{EncryptionKey, EncryptionNonce, X25519PublicKey, X25519StaticSecret};
pub use engine::{EngineConfig, SealEngine};
pub use error::{Result, SealError};
pub use object::{BackupKey, EncryptedObject, Envelope, WrappedShare, FORMAT_VERSION};
pub use server::{KeyServer, LocalKeyServer, ShareRequest};
pub use shamir::Share;
