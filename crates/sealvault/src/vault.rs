//! The unified vault API.
//!
//! Glues the layers together for one actor: encrypt-then-upload on the way
//! in, policy-gated share collection and decryption on the way out. All
//! time readings come from the ledger clock.

use std::sync::Arc;

use tracing::info;

use sealvault_core::{Address, BlobId, Identity, PackageId};
use sealvault_ledger::Ledger;
use sealvault_market::Market;
use sealvault_seal::{BackupKey, EncryptedObject, SealEngine};
use sealvault_session::{AuthorizationRequest, SessionKey};

use crate::error::{Result, VaultError};
use crate::store::BlobStore;

/// Vault configuration.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// The policy package sessions and ciphertexts are scoped to.
    pub package: PackageId,
    /// TTL for session keys created by this vault, in ledger milliseconds.
    pub session_ttl_ms: i64,
    /// Storage term requested when uploading ciphertexts.
    pub storage_epochs: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            package: PackageId::ZERO,
            session_ttl_ms: 10 * 60 * 1000,
            storage_epochs: 5,
        }
    }
}

/// What `upload_record` hands back: where the ciphertext lives and the
/// disaster-recovery key.
#[derive(Debug)]
pub struct UploadReceipt {
    pub blob_id: BlobId,
    pub backup: BackupKey,
}

/// The unified vault for one actor.
pub struct SealVault<L, B> {
    market: Market<L>,
    engine: SealEngine,
    store: Arc<B>,
    config: VaultConfig,
}

impl<L: Ledger, B: BlobStore> SealVault<L, B> {
    pub fn new(market: Market<L>, engine: SealEngine, store: Arc<B>, config: VaultConfig) -> Self {
        Self {
            market,
            engine,
            store,
            config,
        }
    }

    /// The marketplace client, for twin/pool/staking operations.
    pub fn market(&self) -> &Market<L> {
        &self.market
    }

    /// Create and approve a session key for this actor.
    ///
    /// Issued against the ledger clock and signed in one step since the
    /// vault holds the actor's signing capability.
    pub async fn create_session(&self) -> Result<SessionKey> {
        let now_ms = self.market.ledger().clock_ms().await?;
        let mut session = SessionKey::create(
            *self.market.address(),
            self.config.package,
            self.config.session_ttl_ms,
            now_ms,
        )?;
        let signature = self.market.sign_message(&session.personal_message());
        session.attach_signature(self.market.public_key(), signature)?;
        Ok(session)
    }

    /// Encrypt a record, upload the ciphertext, and register the reference
    /// on the actor's twin.
    ///
    /// The returned backup key is the only copy; losing it leaves the
    /// key-server path as the sole way back to the plaintext.
    pub async fn upload_record(
        &self,
        name: &str,
        plaintext: &[u8],
        metadata_json: &str,
        threshold: u8,
    ) -> Result<UploadReceipt> {
        if name.is_empty() {
            return Err(VaultError::InvalidParameter(
                "record name must be non-empty".into(),
            ));
        }
        let twin = self.require_twin(self.market.address()).await?;

        let identity = Identity::encode(self.market.address(), name);
        let (object, backup) = self.engine.encrypt(&identity, plaintext, threshold)?;

        let blob_id = self
            .store
            .put(object.to_bytes(), self.config.storage_epochs)
            .await?;
        self.market
            .add_record(twin.id, name, blob_id, metadata_json)
            .await?;

        info!(record = name, blob = %blob_id, "record encrypted and uploaded");
        Ok(UploadReceipt { blob_id, backup })
    }

    /// Download and decrypt one of this actor's own records.
    pub async fn download_as_owner(&self, name: &str, session: &SessionKey) -> Result<Vec<u8>> {
        let twin = self.require_twin(self.market.address()).await?;
        let object = self.fetch_object(&twin, name).await?;

        let request = AuthorizationRequest::OwnerProof {
            identity: Identity::encode(self.market.address(), name),
            twin_id: twin.id,
        };
        self.decrypt(&object, session, &request).await
    }

    /// Download and decrypt a provider's record through a pool subscription.
    pub async fn download_as_subscriber(
        &self,
        provider: &Address,
        name: &str,
        pool_id: sealvault_core::ObjectId,
        session: &SessionKey,
    ) -> Result<Vec<u8>> {
        let twin = self.require_twin(provider).await?;
        let object = self.fetch_object(&twin, name).await?;

        let request = AuthorizationRequest::SubscriberProof {
            identity: Identity::encode(provider, name),
            pool_id,
        };
        self.decrypt(&object, session, &request).await
    }

    /// Recover a ciphertext with its backup key, bypassing key servers and
    /// policy entirely.
    pub async fn recover_with_backup(&self, blob_id: &BlobId, backup: &BackupKey) -> Result<Vec<u8>> {
        let bytes = self.store.get(blob_id).await?;
        let object = EncryptedObject::from_bytes(&bytes)?;
        Ok(object.open_with_backup(backup)?)
    }

    async fn require_twin(
        &self,
        owner: &Address,
    ) -> Result<sealvault_ledger::DigitalTwin> {
        self.market
            .ledger()
            .twin_by_owner(owner)
            .await?
            .ok_or(VaultError::TwinNotMinted(*owner))
    }

    async fn fetch_object(
        &self,
        twin: &sealvault_ledger::DigitalTwin,
        name: &str,
    ) -> Result<EncryptedObject> {
        let record = twin
            .record(name)
            .ok_or_else(|| VaultError::RecordNotFound(name.to_string()))?;
        let bytes = self.store.get(&record.blob_id).await?;
        Ok(EncryptedObject::from_bytes(&bytes)?)
    }

    async fn decrypt(
        &self,
        object: &EncryptedObject,
        session: &SessionKey,
        request: &AuthorizationRequest,
    ) -> Result<Vec<u8>> {
        let now_ms = self.market.ledger().clock_ms().await?;
        Ok(self.engine.decrypt(object, session, request, now_ms).await?)
    }
}
