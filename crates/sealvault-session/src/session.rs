//! Session-key lifecycle: create, sign once, use until the TTL elapses.
//!
//! The two-phase construction (create, then attach the requester's
//! signature) makes the unsigned → signed → expired state machine explicit
//! and testable without any UI in the loop.

use serde::{Deserialize, Serialize};

use sealvault_core::{Address, Ed25519PublicKey, Ed25519Signature, Keypair, PackageId};

use crate::error::{Result, SessionError};

/// Domain separator for the personal message, versioned so a future layout
/// change cannot collide with old signatures.
const CHALLENGE_DOMAIN: &[u8] = b"sealvault-session-v0:";

/// The fields the requester signs. Binding the ephemeral public key means a
/// signature cannot be replayed onto different ephemeral key material.
#[derive(Serialize)]
struct Challenge<'a> {
    package: &'a PackageId,
    issued_at_ms: i64,
    ttl_ms: i64,
    ephemeral_pub: &'a Ed25519PublicKey,
}

/// Build the canonical challenge message for a session key.
fn personal_message_bytes(
    package: &PackageId,
    issued_at_ms: i64,
    ttl_ms: i64,
    ephemeral_pub: &Ed25519PublicKey,
) -> Vec<u8> {
    let challenge = Challenge {
        package,
        issued_at_ms,
        ttl_ms,
        ephemeral_pub,
    };
    let mut buf = CHALLENGE_DOMAIN.to_vec();
    ciborium::into_writer(&challenge, &mut buf).expect("CBOR serialization failed");
    buf
}

/// An ephemeral credential scoped to one requester address, one policy
/// package, and a bounded time-to-live.
///
/// Created in memory at request time, signed once, used for zero or more
/// decrypt calls within its TTL, then discarded. Never persisted past
/// process lifetime. The requester address is bound at creation and
/// immutable; a session key cannot authorize a different address's access.
pub struct SessionKey {
    requester: Address,
    package: PackageId,
    issued_at_ms: i64,
    ttl_ms: i64,
    ephemeral: Keypair,
    approval: Option<Approval>,
}

struct Approval {
    requester_pub: Ed25519PublicKey,
    signature: Ed25519Signature,
}

impl SessionKey {
    /// Create a fresh, unsigned session key.
    ///
    /// Generates new ephemeral key material and stamps `issued_at` with the
    /// caller-supplied clock reading (ledger time, not the local wall clock).
    pub fn create(
        requester: Address,
        package: PackageId,
        ttl_ms: i64,
        now_ms: i64,
    ) -> Result<Self> {
        if ttl_ms <= 0 {
            return Err(SessionError::InvalidParameter(format!(
                "ttl must be positive, got {ttl_ms}"
            )));
        }

        Ok(Self {
            requester,
            package,
            issued_at_ms: now_ms,
            ttl_ms,
            ephemeral: Keypair::generate(),
            approval: None,
        })
    }

    /// The requester address this key is bound to.
    pub fn requester(&self) -> &Address {
        &self.requester
    }

    /// The policy package this key is scoped to.
    pub fn package(&self) -> &PackageId {
        &self.package
    }

    /// When this key was issued (ledger milliseconds).
    pub fn issued_at_ms(&self) -> i64 {
        self.issued_at_ms
    }

    /// When this key expires (ledger milliseconds).
    pub fn expires_at_ms(&self) -> i64 {
        self.issued_at_ms + self.ttl_ms
    }

    /// The message the requester's signing capability must approve.
    pub fn personal_message(&self) -> Vec<u8> {
        personal_message_bytes(
            &self.package,
            self.issued_at_ms,
            self.ttl_ms,
            &self.ephemeral.public_key(),
        )
    }

    /// Attach the requester's personal-message signature. One-time.
    ///
    /// Fails with [`SessionError::AlreadySigned`] on a second call, and with
    /// [`SessionError::SignatureMismatch`] if the signature does not verify
    /// against the requester address (the supplied public key must both
    /// derive the bound address and verify the challenge).
    pub fn attach_signature(
        &mut self,
        requester_pub: Ed25519PublicKey,
        signature: Ed25519Signature,
    ) -> Result<()> {
        if self.approval.is_some() {
            return Err(SessionError::AlreadySigned);
        }

        if Address::from_public_key(&requester_pub) != self.requester {
            return Err(SessionError::SignatureMismatch);
        }

        let message = self.personal_message();
        requester_pub
            .verify(&message, &signature)
            .map_err(|_| SessionError::SignatureMismatch)?;

        self.approval = Some(Approval {
            requester_pub,
            signature,
        });
        Ok(())
    }

    /// True iff a signature is attached and the TTL has not elapsed.
    pub fn is_valid(&self, now_ms: i64) -> bool {
        self.approval.is_some() && now_ms <= self.expires_at_ms()
    }

    /// Sign a share request with the ephemeral key.
    ///
    /// Fails if the session has not been approved yet; key servers verify
    /// this signature against the certificate's ephemeral public key.
    pub fn sign_request(&self, message: &[u8]) -> Result<Ed25519Signature> {
        if self.approval.is_none() {
            return Err(SessionError::Unsigned);
        }
        Ok(self.ephemeral.sign(message))
    }

    /// The portable proof that key servers re-verify.
    pub fn certificate(&self) -> Result<SessionCertificate> {
        let approval = self.approval.as_ref().ok_or(SessionError::Unsigned)?;
        Ok(SessionCertificate {
            requester: self.requester,
            requester_pub: approval.requester_pub,
            package: self.package,
            issued_at_ms: self.issued_at_ms,
            ttl_ms: self.ttl_ms,
            ephemeral_pub: self.ephemeral.public_key(),
            signature: approval.signature,
        })
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("requester", &self.requester)
            .field("issued_at_ms", &self.issued_at_ms)
            .field("ttl_ms", &self.ttl_ms)
            .field("signed", &self.approval.is_some())
            .finish()
    }
}

/// The server-side view of an approved session key.
///
/// Carries everything a key server needs to independently re-verify the
/// approval: the requester's public key, the session parameters, the
/// ephemeral public key, and the personal-message signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCertificate {
    pub requester: Address,
    pub requester_pub: Ed25519PublicKey,
    pub package: PackageId,
    pub issued_at_ms: i64,
    pub ttl_ms: i64,
    pub ephemeral_pub: Ed25519PublicKey,
    pub signature: Ed25519Signature,
}

impl SessionCertificate {
    /// Re-verify the approval against the given clock reading.
    ///
    /// Checks the address binding, the personal-message signature, and the
    /// TTL. Servers call this with the ledger clock, never a client clock.
    pub fn verify(&self, now_ms: i64) -> Result<()> {
        if Address::from_public_key(&self.requester_pub) != self.requester {
            return Err(SessionError::SignatureMismatch);
        }

        let expires_at_ms = self.issued_at_ms + self.ttl_ms;
        if now_ms > expires_at_ms {
            return Err(SessionError::Expired { expires_at_ms });
        }

        let message = personal_message_bytes(
            &self.package,
            self.issued_at_ms,
            self.ttl_ms,
            &self.ephemeral_pub,
        );
        self.requester_pub
            .verify(&message, &self.signature)
            .map_err(|_| SessionError::SignatureMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: i64 = 60 * 60 * 1000;

    fn approved_session(keypair: &Keypair, now_ms: i64) -> SessionKey {
        let requester = Address::from_public_key(&keypair.public_key());
        let mut session =
            SessionKey::create(requester, PackageId::from_bytes([1; 32]), TTL, now_ms).unwrap();
        let signature = keypair.sign(&session.personal_message());
        session
            .attach_signature(keypair.public_key(), signature)
            .unwrap();
        session
    }

    #[test]
    fn test_create_rejects_nonpositive_ttl() {
        let requester = Address::from_bytes([1; 32]);
        let package = PackageId::from_bytes([2; 32]);
        assert!(matches!(
            SessionKey::create(requester, package, 0, 1000),
            Err(SessionError::InvalidParameter(_))
        ));
        assert!(matches!(
            SessionKey::create(requester, package, -5, 1000),
            Err(SessionError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_unsigned_is_invalid() {
        let requester = Address::from_bytes([1; 32]);
        let session =
            SessionKey::create(requester, PackageId::from_bytes([2; 32]), TTL, 1000).unwrap();
        assert!(!session.is_valid(1000));
        assert!(session.certificate().is_err());
    }

    #[test]
    fn test_sign_then_valid_until_ttl() {
        let keypair = Keypair::from_seed(&[3; 32]);
        let session = approved_session(&keypair, 1000);

        assert!(session.is_valid(1000));
        assert!(session.is_valid(1000 + TTL - 1));
        assert!(session.is_valid(1000 + TTL));
        assert!(!session.is_valid(1000 + TTL + 1));
    }

    #[test]
    fn test_attach_signature_twice_fails() {
        let keypair = Keypair::from_seed(&[3; 32]);
        let requester = Address::from_public_key(&keypair.public_key());
        let mut session =
            SessionKey::create(requester, PackageId::from_bytes([2; 32]), TTL, 1000).unwrap();

        let signature = keypair.sign(&session.personal_message());
        session
            .attach_signature(keypair.public_key(), signature)
            .unwrap();

        assert!(matches!(
            session.attach_signature(keypair.public_key(), signature),
            Err(SessionError::AlreadySigned)
        ));
    }

    #[test]
    fn test_wrong_signer_rejected() {
        let keypair = Keypair::from_seed(&[3; 32]);
        let other = Keypair::from_seed(&[4; 32]);
        let requester = Address::from_public_key(&keypair.public_key());
        let mut session =
            SessionKey::create(requester, PackageId::from_bytes([2; 32]), TTL, 1000).unwrap();

        // Signature from a different key over the right message.
        let signature = other.sign(&session.personal_message());
        assert!(matches!(
            session.attach_signature(other.public_key(), signature),
            Err(SessionError::SignatureMismatch)
        ));

        // Right key claimed, wrong signature bytes.
        assert!(matches!(
            session.attach_signature(keypair.public_key(), Ed25519Signature::ZERO),
            Err(SessionError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_certificate_verifies() {
        let keypair = Keypair::from_seed(&[5; 32]);
        let session = approved_session(&keypair, 1000);
        let cert = session.certificate().unwrap();

        cert.verify(1000).unwrap();
        cert.verify(1000 + TTL).unwrap();
        assert!(matches!(
            cert.verify(1000 + TTL + 1),
            Err(SessionError::Expired { .. })
        ));
    }

    #[test]
    fn test_certificate_tamper_detected() {
        let keypair = Keypair::from_seed(&[5; 32]);
        let session = approved_session(&keypair, 1000);
        let mut cert = session.certificate().unwrap();

        cert.ttl_ms += 1;
        assert!(matches!(
            cert.verify(1000),
            Err(SessionError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_request_signature_bound_to_ephemeral() {
        let keypair = Keypair::from_seed(&[6; 32]);
        let session = approved_session(&keypair, 1000);
        let cert = session.certificate().unwrap();

        let sig = session.sign_request(b"fetch-share").unwrap();
        cert.ephemeral_pub.verify(b"fetch-share", &sig).unwrap();
        assert!(cert.ephemeral_pub.verify(b"other", &sig).is_err());
    }

    #[test]
    fn test_independent_sessions_per_requester() {
        let kp_a = Keypair::from_seed(&[7; 32]);
        let kp_b = Keypair::from_seed(&[8; 32]);
        let s_a = approved_session(&kp_a, 1000);
        let s_b = approved_session(&kp_b, 1000);

        assert_ne!(s_a.requester(), s_b.requester());
        assert!(s_a.is_valid(1000));
        assert!(s_b.is_valid(1000));
    }
}
