//! The key-server side of the protocol.
//!
//! A key server holds one long-lived X25519 secret and releases an unwrapped
//! share only after independently re-verifying the session certificate
//! against the ledger clock, checking the request signature, and running the
//! on-chain policy evaluator. Servers share no state with each other.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use sealvault_core::Ed25519Signature;
use sealvault_ledger::{Ledger, LedgerError};
use sealvault_session::{AuthorizationRequest, SessionCertificate, SessionKey};

use crate::crypto::{X25519PublicKey, X25519StaticSecret};
use crate::error::{Result, SealError};
use crate::object::WrappedShare;
use crate::shamir::Share;

/// Domain separator for request signatures.
const REQUEST_DOMAIN: &[u8] = b"sealvault-share-request-v0:";

fn request_signing_bytes(request_bytes: &[u8]) -> Vec<u8> {
    let mut buf = REQUEST_DOMAIN.to_vec();
    buf.extend_from_slice(request_bytes);
    buf
}

/// A signed share-fetch request.
///
/// The authorization request travels as the exact CBOR bytes the session's
/// ephemeral key signed; servers verify the signature over those bytes
/// before parsing them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRequest {
    pub certificate: SessionCertificate,
    pub request_bytes: Vec<u8>,
    pub signature: Ed25519Signature,
}

impl ShareRequest {
    /// Build and sign a request with an approved session key.
    pub fn new(session: &SessionKey, request: &AuthorizationRequest) -> Result<Self> {
        let certificate = session.certificate()?;
        let request_bytes = request.to_bytes();
        let signature = session.sign_request(&request_signing_bytes(&request_bytes))?;
        Ok(Self {
            certificate,
            request_bytes,
            signature,
        })
    }

    /// Server-side verification: certificate freshness, request signature,
    /// then parse. Returns the parsed authorization request.
    pub fn verify(&self, now_ms: i64) -> Result<AuthorizationRequest> {
        self.certificate.verify(now_ms)?;

        self.certificate
            .ephemeral_pub
            .verify(&request_signing_bytes(&self.request_bytes), &self.signature)
            .map_err(|_| SealError::AccessDenied("request signature did not verify".into()))?;

        AuthorizationRequest::from_bytes(&self.request_bytes)
            .map_err(|e| SealError::SerializationError(e.to_string()))
    }
}

/// A key server that can unwrap shares wrapped to its public key.
#[async_trait]
pub trait KeyServer: Send + Sync {
    /// The server's registered object id; wrapped shares reference it.
    fn id(&self) -> sealvault_core::ObjectId;

    /// The X25519 public key encryptors wrap shares to.
    fn public_key(&self) -> X25519PublicKey;

    /// Verify the request, run the policy evaluator, and unwrap the share.
    async fn fetch_share(&self, request: &ShareRequest, wrapped: &WrappedShare) -> Result<Share>;
}

/// An in-process key server backed by a ledger for clock and policy.
pub struct LocalKeyServer<L: Ledger> {
    id: sealvault_core::ObjectId,
    package: sealvault_core::PackageId,
    secret: X25519StaticSecret,
    ledger: Arc<L>,
}

impl<L: Ledger> LocalKeyServer<L> {
    /// Create a server with fresh key material.
    pub fn new(id: sealvault_core::ObjectId, package: sealvault_core::PackageId, ledger: Arc<L>) -> Self {
        Self {
            id,
            package,
            secret: X25519StaticSecret::generate(),
            ledger,
        }
    }

    /// Create a server with deterministic key material, for tests.
    pub fn from_seed(
        id: sealvault_core::ObjectId,
        package: sealvault_core::PackageId,
        seed: [u8; 32],
        ledger: Arc<L>,
    ) -> Self {
        Self {
            id,
            package,
            secret: X25519StaticSecret::from_bytes(seed),
            ledger,
        }
    }
}

#[async_trait]
impl<L: Ledger> KeyServer for LocalKeyServer<L> {
    fn id(&self) -> sealvault_core::ObjectId {
        self.id
    }

    fn public_key(&self) -> X25519PublicKey {
        self.secret.public_key()
    }

    async fn fetch_share(&self, request: &ShareRequest, wrapped: &WrappedShare) -> Result<Share> {
        // The ledger clock is the only time source; client clocks are never
        // consulted.
        let now_ms = self.ledger.clock_ms().await?;
        let authorization = request.verify(now_ms)?;

        if request.certificate.package != self.package {
            return Err(SealError::AccessDenied(
                "certificate is scoped to a different package".into(),
            ));
        }

        match self
            .ledger
            .check_policy(&authorization, &request.certificate.requester)
            .await
        {
            Ok(()) => {}
            Err(LedgerError::AccessDenied(reason)) => {
                warn!(server = %self.id, requester = %request.certificate.requester, %reason, "policy denied");
                return Err(SealError::AccessDenied(reason));
            }
            Err(other) => return Err(other.into()),
        }

        debug!(server = %self.id, requester = %request.certificate.requester, "policy approved, releasing share");

        // The unwrap context is the identity the policy just approved, so an
        // approval for one identity cannot release another identity's share.
        wrapped.unwrap_share(&self.secret, authorization.identity())
    }
}
