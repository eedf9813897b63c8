//! Authorization requests: the call shape the policy evaluator re-checks.
//!
//! Two variants, never one function with optional parameters: an owner
//! proves control of their twin object, a subscriber proves an unexpired
//! subscription in a pool that staked the record.

use serde::{Deserialize, Serialize};

use sealvault_core::{Identity, ObjectId};

use crate::error::{Result, SessionError};

/// A serialized-checkable decrypt authorization.
///
/// Both variants embed the same identity bytes used at encryption time plus
/// the capability reference the on-chain evaluator needs. These are the only
/// two authorization paths; no other exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationRequest {
    /// The requester is the record owner and supplies a live twin reference.
    OwnerProof {
        identity: Identity,
        twin_id: ObjectId,
    },

    /// The requester holds an active subscription in a pool that staked the
    /// record; the evaluator pairs the pool with the shared clock object.
    SubscriberProof {
        identity: Identity,
        pool_id: ObjectId,
    },
}

impl AuthorizationRequest {
    /// The identity bytes this request authorizes access to.
    pub fn identity(&self) -> &Identity {
        match self {
            AuthorizationRequest::OwnerProof { identity, .. } => identity,
            AuthorizationRequest::SubscriberProof { identity, .. } => identity,
        }
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| SessionError::SerializationError(e.to_string()))
    }
}
