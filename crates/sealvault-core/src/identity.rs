//! The encryption identity: canonical bytes for an (owner, resource name) pair.
//!
//! An identity is the public "key" under which a record is encrypted. The
//! policy evaluator re-derives (owner, name) from these bytes, so the
//! encoding must be injective: the fixed-width address plus a length-prefixed
//! name means no byte string admits two different decompositions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::types::Address;

/// Encoding layout: 32-byte owner address || u32-BE name length || name bytes.
const ADDRESS_LEN: usize = 32;
const LEN_PREFIX: usize = 4;

/// An immutable encryption identity.
///
/// The bytes never reveal more than the caller chooses to transmit; the
/// identity itself is what ciphertexts embed and what the policy evaluator
/// checks against ledger state.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(Vec<u8>);

impl Identity {
    /// Encode an (owner, name) pair into canonical identity bytes.
    ///
    /// Deterministic and injective for distinct pairs. The caller must
    /// validate that `name` is non-empty before calling.
    pub fn encode(owner: &Address, name: &str) -> Self {
        let name_bytes = name.as_bytes();
        let mut buf = Vec::with_capacity(ADDRESS_LEN + LEN_PREFIX + name_bytes.len());
        buf.extend_from_slice(&owner.0);
        buf.extend_from_slice(&(name_bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(name_bytes);
        Self(buf)
    }

    /// Decode identity bytes back into the (owner, name) pair.
    ///
    /// Rejects any bytes that are not exactly one valid encoding.
    pub fn decode(&self) -> Result<(Address, String), CoreError> {
        let bytes = &self.0;
        if bytes.len() < ADDRESS_LEN + LEN_PREFIX {
            return Err(CoreError::MalformedIdentity("too short".into()));
        }

        let mut addr = [0u8; 32];
        addr.copy_from_slice(&bytes[..ADDRESS_LEN]);

        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&bytes[ADDRESS_LEN..ADDRESS_LEN + LEN_PREFIX]);
        let name_len = u32::from_be_bytes(len_bytes) as usize;

        let rest = &bytes[ADDRESS_LEN + LEN_PREFIX..];
        if rest.len() != name_len {
            return Err(CoreError::MalformedIdentity(format!(
                "declared name length {} but {} bytes remain",
                name_len,
                rest.len()
            )));
        }

        let name = std::str::from_utf8(rest)
            .map_err(|_| CoreError::MalformedIdentity("name is not valid UTF-8".into()))?
            .to_string();

        Ok((Address::from_bytes(addr), name))
    }

    /// View the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Reconstruct an identity from previously encoded bytes.
    ///
    /// Validates the layout so a stored identity is always decodable.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CoreError> {
        let identity = Self(bytes);
        identity.decode()?;
        Ok(identity)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            Ok((owner, name)) => write!(f, "Identity({}, {:?})", owner, name),
            Err(_) => write!(f, "Identity(<malformed>)"),
        }
    }
}

impl AsRef<[u8]> for Identity {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 32])
    }

    #[test]
    fn test_encode_deterministic() {
        let id1 = Identity::encode(&addr(1), "mri-2024");
        let id2 = Identity::encode(&addr(1), "mri-2024");
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_encode_distinct_pairs() {
        let base = Identity::encode(&addr(1), "mri-2024");
        assert_ne!(base, Identity::encode(&addr(2), "mri-2024"));
        assert_ne!(base, Identity::encode(&addr(1), "mri-2025"));
    }

    #[test]
    fn test_decode_roundtrip() {
        let owner = addr(9);
        let id = Identity::encode(&owner, "blood-panel");
        let (decoded_owner, decoded_name) = id.decode().unwrap();
        assert_eq!(decoded_owner, owner);
        assert_eq!(decoded_name, "blood-panel");
    }

    #[test]
    fn test_no_ambiguous_decomposition() {
        // A name containing address-sized prefixes must not shift the split.
        let owner = addr(3);
        let tricky = "a".repeat(36);
        let id = Identity::encode(&owner, &tricky);
        let (decoded_owner, decoded_name) = id.decode().unwrap();
        assert_eq!(decoded_owner, owner);
        assert_eq!(decoded_name, tricky);
    }

    #[test]
    fn test_from_bytes_rejects_truncated() {
        let id = Identity::encode(&addr(1), "scan");
        let mut bytes = id.as_bytes().to_vec();
        bytes.pop();
        assert!(Identity::from_bytes(bytes).is_err());
    }

    #[test]
    fn test_from_bytes_rejects_trailing_garbage() {
        let id = Identity::encode(&addr(1), "scan");
        let mut bytes = id.as_bytes().to_vec();
        bytes.push(0);
        assert!(Identity::from_bytes(bytes).is_err());
    }

    proptest! {
        #[test]
        fn prop_roundtrip(owner in any::<[u8; 32]>(), name in "[a-zA-Z0-9._-]{1,64}") {
            let owner = Address::from_bytes(owner);
            let id = Identity::encode(&owner, &name);
            let (o, n) = id.decode().unwrap();
            prop_assert_eq!(o, owner);
            prop_assert_eq!(n, name);
        }

        #[test]
        fn prop_injective(
            a in any::<[u8; 32]>(),
            b in any::<[u8; 32]>(),
            na in "[a-z]{1,32}",
            nb in "[a-z]{1,32}",
        ) {
            let ia = Identity::encode(&Address::from_bytes(a), &na);
            let ib = Identity::encode(&Address::from_bytes(b), &nb);
            if (a, &na) != (b, &nb) {
                prop_assert_ne!(ia, ib);
            }
        }
    }
}
