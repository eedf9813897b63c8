//! The client-side threshold encryption engine.
//!
//! Encryption is entirely local: generate a content key, encrypt the
//! payload, split the key into shares, and wrap one share per key server.
//! Decryption fans out share fetches to the servers concurrently and stops
//! as soon as the threshold is met, the deadline passes, or a server
//! reports a policy denial.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use sealvault_core::{Identity, PackageId};
use sealvault_session::{AuthorizationRequest, SessionKey};

use crate::crypto::EncryptionKey;
use crate::error::{Result, SealError};
use crate::object::{BackupKey, EncryptedObject, Envelope, WrappedShare, FORMAT_VERSION};
use crate::server::{KeyServer, ShareRequest};
use crate::shamir;

/// Engine configuration.
#[derive(Clone)]
pub struct EngineConfig {
    /// The policy package ciphertexts and sessions are scoped to.
    pub package: PackageId,
    /// How long to wait for key servers before giving up on missing shares.
    pub share_deadline: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            package: PackageId::ZERO,
            share_deadline: Duration::from_secs(10),
        }
    }
}

/// The threshold encryption engine for one key-server committee.
pub struct SealEngine {
    servers: Vec<Arc<dyn KeyServer>>,
    config: EngineConfig,
}

impl SealEngine {
    pub fn new(servers: Vec<Arc<dyn KeyServer>>, config: EngineConfig) -> Self {
        Self { servers, config }
    }

    /// The committee size, which is also the number of shares per ciphertext.
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Encrypt a payload under an identity with a `threshold`-of-n policy.
    ///
    /// Returns the ciphertext and the backup key. The backup key is the raw
    /// content key; the caller decides whether to keep or discard it.
    pub fn encrypt(
        &self,
        identity: &Identity,
        plaintext: &[u8],
        threshold: u8,
    ) -> Result<(EncryptedObject, BackupKey)> {
        if self.servers.is_empty() {
            return Err(SealError::InvalidParameter(
                "engine has no key servers".into(),
            ));
        }
        if self.servers.len() > u8::MAX as usize {
            return Err(SealError::InvalidParameter(format!(
                "committee too large: {} servers",
                self.servers.len()
            )));
        }
        let total = self.servers.len() as u8;
        if threshold == 0 || threshold > total {
            return Err(SealError::InvalidThreshold { threshold, total });
        }

        let content_key = EncryptionKey::generate();
        let envelope = Envelope::encrypt(plaintext, &content_key)?;

        let shares = shamir::split(content_key.as_bytes(), threshold, total)?;
        let mut wrapped = Vec::with_capacity(shares.len());
        for (share, server) in shares.iter().zip(&self.servers) {
            wrapped.push(WrappedShare::wrap(
                server.id(),
                share,
                &server.public_key(),
                identity,
            )?);
        }

        let object = EncryptedObject {
            version: FORMAT_VERSION,
            package: self.config.package,
            identity: identity.clone(),
            threshold,
            shares: wrapped,
            envelope,
        };
        let backup = BackupKey::from_bytes(*content_key.as_bytes());
        Ok((object, backup))
    }

    /// Decrypt a ciphertext by collecting key shares through an approved
    /// session.
    ///
    /// `now_ms` must come from the ledger clock. Fetches run concurrently;
    /// the first policy denial aborts the whole operation since the
    /// evaluator is deterministic and every server would answer the same.
    pub async fn decrypt(
        &self,
        object: &EncryptedObject,
        session: &SessionKey,
        request: &AuthorizationRequest,
        now_ms: i64,
    ) -> Result<Vec<u8>> {
        if object.package != self.config.package {
            return Err(SealError::InvalidParameter(
                "ciphertext is scoped to a different package".into(),
            ));
        }
        if !session.is_valid(now_ms) {
            return Err(SealError::SessionExpiredOrUnsigned);
        }
        if request.identity() != &object.identity {
            return Err(SealError::IdentityMismatch);
        }

        let share_request = ShareRequest::new(session, request)?;

        let mut fetches = JoinSet::new();
        for wrapped in &object.shares {
            let Some(server) = self.servers.iter().find(|s| s.id() == wrapped.server_id) else {
                debug!(server = %wrapped.server_id, "no such server in committee, skipping share");
                continue;
            };
            let server = Arc::clone(server);
            let share_request = share_request.clone();
            let wrapped = wrapped.clone();
            fetches.spawn(async move { server.fetch_share(&share_request, &wrapped).await });
        }

        let deadline = tokio::time::sleep(self.config.share_deadline);
        tokio::pin!(deadline);

        let mut shares = Vec::new();
        while (shares.len() as u64) < object.threshold as u64 {
            tokio::select! {
                joined = fetches.join_next() => {
                    match joined {
                        None => break,
                        Some(Ok(Ok(share))) => shares.push(share),
                        Some(Ok(Err(fatal @ (SealError::AccessDenied(_)
                            | SealError::SessionExpiredOrUnsigned)))) => {
                            fetches.abort_all();
                            return Err(fatal);
                        }
                        Some(Ok(Err(err))) => {
                            warn!(%err, "key server failed to release a share");
                        }
                        Some(Err(join_err)) => {
                            warn!(%join_err, "share fetch task panicked");
                        }
                    }
                }
                _ = &mut deadline => {
                    warn!("share fetch deadline elapsed");
                    break;
                }
            }
        }
        fetches.abort_all();

        if (shares.len() as u64) < object.threshold as u64 {
            return Err(SealError::InsufficientShares {
                got: shares.len(),
                need: object.threshold,
            });
        }
        object.open_with_shares(&shares)
    }
}
