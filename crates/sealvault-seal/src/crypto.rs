//! Key material for wrapping shares and sealing content.
//!
//! Content is sealed under a random ChaCha20-Poly1305 key. Each Shamir
//! share of that key is wrapped to one key server: the encryptor agrees an
//! ephemeral X25519 secret against the server's static key, then derives
//! the wrapping key from the agreement bound to the identity bytes and the
//! share's evaluation point. The server re-derives the same key from its
//! side of the agreement; nobody else can.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, SharedSecret, StaticSecret};

use sealvault_core::Identity;

use crate::error::{Result, SealError};

const WRAP_KEY_DOMAIN: &str = "sealvault-seal-v0-wrap";

/// Bind an X25519 agreement to the identity and evaluation point of the
/// share it wraps. A key derived for one (identity, index) pair cannot
/// unwrap any other share.
fn share_key(shared: &SharedSecret, identity: &Identity, index: u8) -> EncryptionKey {
    let mut hasher = blake3::Hasher::new_derive_key(WRAP_KEY_DOMAIN);
    hasher.update(shared.as_bytes());
    hasher.update(identity.as_bytes());
    hasher.update(&[index]);
    EncryptionKey(*hasher.finalize().as_bytes())
}

/// An X25519 public key (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; 32]);

impl X25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// A key server's long-lived X25519 secret.
///
/// Only for key agreement, never signing.
pub struct X25519StaticSecret(StaticSecret);

impl X25519StaticSecret {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        Self(StaticSecret::random_from_rng(rand::thread_rng()))
    }

    /// Create from seed bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Derive the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey(*PublicKey::from(&self.0).as_bytes())
    }

    /// Server-side key for one wrapped share: agree with the encryptor's
    /// ephemeral public key and bind to the policy-approved identity and
    /// the share's evaluation point.
    pub fn unwrapping_key(
        &self,
        ephemeral_public: &X25519PublicKey,
        identity: &Identity,
        index: u8,
    ) -> EncryptionKey {
        let shared = self.0.diffie_hellman(&PublicKey::from(ephemeral_public.0));
        share_key(&shared, identity, index)
    }
}

/// One-time encryptor-side key pair; wraps exactly one share.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: X25519PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a new ephemeral key pair.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = X25519PublicKey(*PublicKey::from(&secret).as_bytes());
        Self { secret, public }
    }

    /// Get the public key. Travels with the wrapped share so the server can
    /// run its side of the agreement.
    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    /// Encryptor-side key for the share this pair wraps. Consumes the
    /// secret.
    pub fn wrapping_key(
        self,
        server_public: &X25519PublicKey,
        identity: &Identity,
        index: u8,
    ) -> EncryptionKey {
        let shared = self.secret.diffie_hellman(&PublicKey::from(server_public.0));
        share_key(&shared, identity, index)
    }
}

/// A 256-bit symmetric key for ChaCha20-Poly1305.
///
/// Both the content key and the per-share wrapping keys are this type.
#[derive(Clone)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }

    /// Encrypt data with this key.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        self.cipher()
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|_| SealError::EncryptionError("aead encryption failed".into()))
    }

    /// Decrypt data with this key.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        self.cipher()
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|_| SealError::DecryptionError("authentication failed".into()))
    }
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; 12]);

impl EncryptionNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealvault_core::Address;

    fn identity() -> Identity {
        Identity::encode(&Address::from_bytes([1; 32]), "mri-2024")
    }

    #[test]
    fn test_both_sides_derive_same_share_key() {
        let server = X25519StaticSecret::generate();
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();

        let wrap = ephemeral.wrapping_key(&server.public_key(), &identity(), 1);
        let unwrap = server.unwrapping_key(&ephemeral_public, &identity(), 1);
        assert_eq!(wrap.as_bytes(), unwrap.as_bytes());
    }

    #[test]
    fn test_share_key_bound_to_identity_and_index() {
        let server = X25519StaticSecret::from_bytes([3; 32]);
        let peer = X25519StaticSecret::from_bytes([4; 32]).public_key();
        let other = Identity::encode(&Address::from_bytes([1; 32]), "mri-2025");

        let base = server.unwrapping_key(&peer, &identity(), 1);
        assert_ne!(
            base.as_bytes(),
            server.unwrapping_key(&peer, &other, 1).as_bytes()
        );
        assert_ne!(
            base.as_bytes(),
            server.unwrapping_key(&peer, &identity(), 2).as_bytes()
        );
        assert_eq!(
            base.as_bytes(),
            server.unwrapping_key(&peer, &identity(), 1).as_bytes()
        );
    }

    #[test]
    fn test_wrong_server_derives_different_key() {
        let server = X25519StaticSecret::generate();
        let other_server = X25519StaticSecret::generate();
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();

        let wrap = ephemeral.wrapping_key(&server.public_key(), &identity(), 1);
        let stolen = other_server.unwrapping_key(&ephemeral_public, &identity(), 1);
        assert_ne!(wrap.as_bytes(), stolen.as_bytes());
    }

    #[test]
    fn test_seal_roundtrip() {
        let key = EncryptionKey::generate();
        let nonce = EncryptionNonce::generate();

        let ciphertext = key.encrypt(b"lab results", &nonce).unwrap();
        assert_ne!(ciphertext.as_slice(), b"lab results");
        assert_eq!(key.decrypt(&ciphertext, &nonce).unwrap(), b"lab results");
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let key = EncryptionKey::generate();
        let nonce = EncryptionNonce::generate();

        let mut ciphertext = key.encrypt(b"secret", &nonce).unwrap();
        ciphertext[0] ^= 1;
        assert!(key.decrypt(&ciphertext, &nonce).is_err());
    }
}
