//! # SealVault Session
//!
//! Session-key lifecycle and authorization requests.
//!
//! ## Overview
//!
//! A decrypt request is authorized by two artifacts built here:
//!
//! - **SessionKey**: an ephemeral credential bound to one requester address,
//!   one policy package, and a bounded TTL. Created unsigned, it becomes
//!   valid only after the requester's signing capability approves the
//!   canonical personal message, and it expires once the TTL elapses.
//! - **AuthorizationRequest**: the exact call shape the on-chain policy
//!   evaluator re-checks: a tagged variant carrying the identity bytes plus
//!   either a twin reference (owner path) or a pool reference (subscriber
//!   path).
//!
//! ## Lifecycle
//!
//! ```text
//! create() ──► unsigned ──attach_signature()──► signed ──ttl elapses──► expired
//! ```
//!
//! This crate performs no network calls; it only produces the message that
//! must be signed and validates the result.

pub mod error;
pub mod request;
pub mod session;

pub use error::{Result, SessionError};
pub use request::AuthorizationRequest;
pub use session::{SessionCertificate, SessionKey};
