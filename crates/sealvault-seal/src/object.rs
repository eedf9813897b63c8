//! The self-describing encrypted object format.
//!
//! An [`EncryptedObject`] carries everything a holder needs to attempt
//! decryption: the identity the content was encrypted under, the threshold,
//! one wrapped key share per key server, and the content envelope. Nothing
//! in it is secret; it can sit in public blob storage.

use serde::{Deserialize, Serialize};

use sealvault_core::{Identity, ObjectId, PackageId};

use crate::crypto::{
    EncryptionKey, EncryptionNonce, EphemeralKeyPair, X25519PublicKey, X25519StaticSecret,
};
use crate::error::{Result, SealError};
use crate::shamir::{self, Share, SECRET_LEN};

/// Current serialization version of [`EncryptedObject`].
pub const FORMAT_VERSION: u8 = 1;

/// One Shamir share of the content key, wrapped to a single key server via
/// X25519 ECDH + ChaCha20-Poly1305.
///
/// The wrapping key is bound to the identity bytes and the share index, so a
/// share unwrapped for one identity cannot be confused for another's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedShare {
    /// The key server that can unwrap this share.
    pub server_id: ObjectId,

    /// The share's Shamir evaluation point.
    pub index: u8,

    /// Ephemeral X25519 public key (encryptor's side of ECDH).
    pub ephemeral_public: X25519PublicKey,

    /// Nonce used for wrapping.
    pub nonce: EncryptionNonce,

    /// The share data, encrypted with the derived wrapping key.
    pub encrypted_share: Vec<u8>,
}

impl WrappedShare {
    /// Wrap a share to a key server's public key.
    pub fn wrap(
        server_id: ObjectId,
        share: &Share,
        server_public: &X25519PublicKey,
        identity: &Identity,
    ) -> Result<Self> {
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();
        let wrap_key = ephemeral.wrapping_key(server_public, identity, share.index);

        let nonce = EncryptionNonce::generate();
        let encrypted_share = wrap_key.encrypt(&share.data, &nonce)?;

        Ok(Self {
            server_id,
            index: share.index,
            ephemeral_public,
            nonce,
            encrypted_share,
        })
    }

    /// Unwrap with the key server's static secret.
    ///
    /// Only the server whose public key the share was wrapped to can succeed;
    /// everyone else gets an authentication failure.
    pub fn unwrap_share(
        &self,
        server_secret: &X25519StaticSecret,
        identity: &Identity,
    ) -> Result<Share> {
        let wrap_key = server_secret.unwrapping_key(&self.ephemeral_public, identity, self.index);

        let data = wrap_key.decrypt(&self.encrypted_share, &self.nonce)?;
        if data.len() != SECRET_LEN {
            return Err(SealError::InvalidShare(format!(
                "unwrapped share has length {}, expected {SECRET_LEN}",
                data.len()
            )));
        }
        Ok(Share {
            index: self.index,
            data,
        })
    }
}

/// The encrypted content envelope inside an [`EncryptedObject`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Nonce used for the content encryption.
    pub nonce: EncryptionNonce,
    /// ChaCha20-Poly1305 ciphertext, authentication tag included.
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Encrypt plaintext under a fresh nonce.
    pub fn encrypt(plaintext: &[u8], key: &EncryptionKey) -> Result<Self> {
        let nonce = EncryptionNonce::generate();
        let ciphertext = key.encrypt(plaintext, &nonce)?;
        Ok(Self { nonce, ciphertext })
    }

    /// Decrypt with the content key.
    pub fn decrypt(&self, key: &EncryptionKey) -> Result<Vec<u8>> {
        key.decrypt(&self.ciphertext, &self.nonce)
    }
}

/// A threshold-encrypted payload bound to one identity and one policy
/// package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedObject {
    /// Format version, for forward compatibility.
    pub version: u8,

    /// The policy package whose evaluator gates decryption.
    pub package: PackageId,

    /// The identity bytes the content was encrypted under.
    pub identity: Identity,

    /// Minimum number of key shares needed to reconstruct the content key.
    pub threshold: u8,

    /// One wrapped share per key server.
    pub shares: Vec<WrappedShare>,

    /// The encrypted content.
    pub envelope: Envelope,
}

impl EncryptedObject {
    /// Decrypt directly with the backup key, bypassing the key servers.
    ///
    /// Disaster recovery only: the backup key is the content key itself and
    /// must be stored out of band by the encryptor.
    pub fn open_with_backup(&self, backup: &BackupKey) -> Result<Vec<u8>> {
        self.envelope.decrypt(&EncryptionKey::from_bytes(backup.0))
    }

    /// Recombine unwrapped shares and open the envelope.
    pub fn open_with_shares(&self, shares: &[Share]) -> Result<Vec<u8>> {
        let secret = shamir::combine(shares, self.threshold)?;
        self.envelope.decrypt(&EncryptionKey::from_bytes(secret))
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let object: Self = ciborium::from_reader(bytes)
            .map_err(|e| SealError::SerializationError(e.to_string()))?;
        if object.version != FORMAT_VERSION {
            return Err(SealError::SerializationError(format!(
                "unsupported format version {}",
                object.version
            )));
        }
        Ok(object)
    }
}

/// The escape-hatch copy of the content key, handed to the encryptor.
#[derive(Clone, PartialEq, Eq)]
pub struct BackupKey(pub(crate) [u8; 32]);

impl BackupKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex encoding for out-of-band storage.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes =
            hex::decode(s).map_err(|e| SealError::InvalidParameter(format!("bad hex: {e}")))?;
        if bytes.len() != 32 {
            return Err(SealError::InvalidParameter(format!(
                "backup key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl std::fmt::Debug for BackupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        write!(f, "BackupKey(..)")
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
    fn test_wrap_unwrap_roundtrip() {
        let server_secret = X25519StaticSecret::generate();
        let share = Share {
            index: 1,
            data: vec![0x55; SECRET_LEN],
        };

        let wrapped = WrappedShare::wrap(
            ObjectId::from_bytes([2; 32]),
            &share,
            &server_secret.public_key(),
            &identity(),
        )
        .unwrap();

        let unwrapped = wrapped.unwrap_share(&server_secret, &identity()).unwrap();
        assert_eq!(unwrapped, share);
    }

    #[test]
    fn test_unwrap_wrong_server_fails() {
        let server_secret = X25519StaticSecret::generate();
        let other_secret = X25519StaticSecret::generate();
        let share = Share {
            index: 1,
            data: vec![0x55; SECRET_LEN],
        };

        let wrapped = WrappedShare::wrap(
            ObjectId::from_bytes([2; 32]),
            &share,
            &server_secret.public_key(),
            &identity(),
        )
        .unwrap();

        assert!(wrapped.unwrap_share(&other_secret, &identity()).is_err());
    }

    #[test]
    fn test_unwrap_wrong_identity_fails() {
        let server_secret = X25519StaticSecret::generate();
        let share = Share {
            index: 1,
            data: vec![0x55; SECRET_LEN],
        };

        let wrapped = WrappedShare::wrap(
            ObjectId::from_bytes([2; 32]),
            &share,
            &server_secret.public_key(),
            &identity(),
        )
        .unwrap();

        let other = Identity::encode(&Address::from_bytes([1; 32]), "mri-2025");
        assert!(wrapped.unwrap_share(&server_secret, &other).is_err());
    }

    #[test]
    fn test_object_serialization_roundtrip() {
        let key = EncryptionKey::generate();
        let object = EncryptedObject {
            version: FORMAT_VERSION,
            package: PackageId::from_bytes([3; 32]),
            identity: identity(),
            threshold: 2,
            shares: Vec::new(),
            envelope: Envelope::encrypt(b"payload", &key).unwrap(),
        };

        let recovered = EncryptedObject::from_bytes(&object.to_bytes()).unwrap();
        assert_eq!(object, recovered);
    }

    #[test]
    fn test_from_bytes_rejects_unknown_version() {
        let key = EncryptionKey::generate();
        let mut object = EncryptedObject {
            version: FORMAT_VERSION,
            package: PackageId::from_bytes([3; 32]),
            identity: identity(),
            threshold: 1,
            shares: Vec::new(),
            envelope: Envelope::encrypt(b"payload", &key).unwrap(),
        };
        object.version = FORMAT_VERSION + 1;
        assert!(EncryptedObject::from_bytes(&object.to_bytes()).is_err());
    }

    #[test]
    fn test_open_with_backup() {
        let key = EncryptionKey::generate();
        let object = EncryptedObject {
            version: FORMAT_VERSION,
            package: PackageId::from_bytes([3; 32]),
            identity: identity(),
            threshold: 2,
            shares: Vec::new(),
            envelope: Envelope::encrypt(b"payload", &key).unwrap(),
        };

        let backup = BackupKey::from_bytes(*key.as_bytes());
        assert_eq!(object.open_with_backup(&backup).unwrap(), b"payload");

        let wrong = BackupKey::from_bytes([0; 32]);
        assert!(object.open_with_backup(&wrong).is_err());
    }

    #[test]
    fn test_backup_key_hex_roundtrip() {
        let backup = BackupKey::from_bytes([0xab; 32]);
        let recovered = BackupKey::from_hex(&backup.to_hex()).unwrap();
        assert_eq!(backup, recovered);
        assert!(BackupKey::from_hex("deadbeef").is_err());
    }
}
