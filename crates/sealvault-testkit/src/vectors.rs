//! Golden vectors for the identity encoding.
//!
//! The identity layout (owner address, big-endian length prefix, name
//! bytes) must stay byte-for-byte stable across versions: ciphertexts in
//! blob storage embed these bytes, and the policy evaluator re-derives the
//! (owner, name) pair from them. Each vector pins the exact encoding of
//! the length prefix and name; the leading 32 bytes are the owner address
//! verbatim.

use sealvault_core::{Address, Identity};

/// One golden identity-encoding case.
pub struct GoldenVector {
    pub name: &'static str,
    /// The owner address is this byte repeated 32 times.
    pub owner_byte: u8,
    pub record_name: &'static str,
    /// Expected hex of everything after the owner address: the u32
    /// big-endian name length followed by the name bytes.
    pub expected_tail_hex: &'static str,
}

/// All golden vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "short-name",
            owner_byte: 0x11,
            record_name: "mri-2024",
            expected_tail_hex: "000000086d72692d32303234",
        },
        GoldenVector {
            name: "single-char",
            owner_byte: 0x00,
            record_name: "a",
            expected_tail_hex: "0000000161",
        },
        GoldenVector {
            name: "dotted-name",
            owner_byte: 0xab,
            record_name: "blood-panel.v2",
            expected_tail_hex: "0000000e626c6f6f642d70616e656c2e7632",
        },
    ]
}

/// Encode a vector's inputs into an identity.
pub fn identity_from_vector(vector: &GoldenVector) -> Identity {
    Identity::encode(
        &Address::from_bytes([vector.owner_byte; 32]),
        vector.record_name,
    )
}

/// The full expected hex encoding for a vector.
pub fn expected_hex(vector: &GoldenVector) -> String {
    let mut expected = hex::encode([vector.owner_byte; 32]);
    expected.push_str(vector.expected_tail_hex);
    expected
}

/// Verify every golden vector; returns the first failure.
pub fn verify_all_vectors() -> Result<(), String> {
    for vector in all_vectors() {
        let identity = identity_from_vector(&vector);
        let expected = expected_hex(&vector);
        if identity.to_hex() != expected {
            return Err(format!(
                "vector {} mismatch: got {}, expected {}",
                vector.name,
                identity.to_hex(),
                expected
            ));
        }
    }
    Ok(())
}
