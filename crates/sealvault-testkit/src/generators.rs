//! Proptest generators for property-based testing.

use proptest::prelude::*;

use sealvault_core::{Address, BlobId, Identity, Keypair, ObjectId, PackageId};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 32]>().prop_map(Address::from_bytes)
}

/// Generate a random object id.
pub fn object_id() -> impl Strategy<Value = ObjectId> {
    any::<[u8; 32]>().prop_map(ObjectId::from_bytes)
}

/// Generate a random package id.
pub fn package_id() -> impl Strategy<Value = PackageId> {
    any::<[u8; 32]>().prop_map(PackageId::from_bytes)
}

/// Generate a random blob id.
pub fn blob_id() -> impl Strategy<Value = BlobId> {
    any::<[u8; 32]>().prop_map(BlobId::from_bytes)
}

/// Generate a plausible record name.
pub fn record_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9._-]{0,63}".prop_map(String::from)
}

/// Generate a well-formed identity.
pub fn identity() -> impl Strategy<Value = Identity> {
    (address(), record_name()).prop_map(|(owner, name)| Identity::encode(&owner, &name))
}

/// Generate a (threshold, total) pair with `1 <= threshold <= total`.
pub fn threshold_pair(max_total: u8) -> impl Strategy<Value = (u8, u8)> {
    (1..=max_total).prop_flat_map(|total| (1..=total).prop_map(move |t| (t, total)))
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a reasonable ledger timestamp.
pub fn timestamp_ms() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 2
}
