//! End-to-end scenarios across the marketplace and decryption paths.

use std::sync::Arc;
use std::time::Duration;

use sealvault::{
    BlobId, BlobStore, Keypair, Ledger, LocalKeyServer, Market, MarketConfig, MemoryBlobStore,
    MemoryLedger, PackageId, PoolParams, SealEngine, SealVault, VaultConfig,
    SUBSCRIPTION_PERIOD_MS,
};
use sealvault_core::ObjectId;
use sealvault_ledger::LedgerError;
use sealvault_market::MarketError;
use sealvault_seal::{EngineConfig, KeyServer, SealError};
use sealvault::VaultError;

const SESSION_TTL_MS: i64 = 10 * 60 * 1000;

struct TestNet {
    ledger: Arc<MemoryLedger>,
    store: Arc<MemoryBlobStore>,
    servers: Vec<Arc<dyn KeyServer>>,
    package: PackageId,
}

impl TestNet {
    fn new(server_count: u8) -> Self {
        let ledger = Arc::new(MemoryLedger::new());
        let package = PackageId::from_bytes([9; 32]);
        let servers = (0..server_count)
            .map(|i| {
                Arc::new(LocalKeyServer::from_seed(
                    ObjectId::from_bytes([0x70 + i; 32]),
                    package,
                    [0x40 + i; 32],
                    ledger.clone(),
                )) as Arc<dyn KeyServer>
            })
            .collect();
        Self {
            ledger,
            store: Arc::new(MemoryBlobStore::new()),
            servers,
            package,
        }
    }

    fn vault(&self, seed: u8) -> SealVault<MemoryLedger, MemoryBlobStore> {
        let market = Market::new(
            self.ledger.clone(),
            Keypair::from_seed(&[seed; 32]),
            MarketConfig::default(),
        );
        let engine = SealEngine::new(
            self.servers.clone(),
            EngineConfig {
                package: self.package,
                share_deadline: Duration::from_secs(2),
            },
        );
        SealVault::new(
            market,
            engine,
            self.store.clone(),
            VaultConfig {
                package: self.package,
                session_ttl_ms: SESSION_TTL_MS,
                storage_epochs: 5,
            },
        )
    }
}

fn pool_params(price: u64) -> PoolParams {
    PoolParams {
        name: "oncology-imaging".into(),
        description: "verified MRI studies".into(),
        criteria: "mri".into(),
        subscription_price: price,
    }
}

#[tokio::test]
async fn owner_uploads_and_reads_back() {
    let net = TestNet::new(3);
    let owner = net.vault(1);

    owner.market().mint_twin().await.unwrap();
    owner
        .upload_record("mri-2024", b"scan bytes", r#"{"modality":"mri"}"#, 2)
        .await
        .unwrap();

    let session = owner.create_session().await.unwrap();
    let plaintext = owner.download_as_owner("mri-2024", &session).await.unwrap();
    assert_eq!(plaintext, b"scan bytes");

    // One approved session serves several decrypts within its TTL.
    owner
        .upload_record("ekg-2024", b"trace bytes", "{}", 2)
        .await
        .unwrap();
    assert_eq!(
        owner.download_as_owner("ekg-2024", &session).await.unwrap(),
        b"trace bytes"
    );
}

#[tokio::test]
async fn subscriber_full_lifecycle() {
    let net = TestNet::new(3);
    let provider = net.vault(1);
    let buyer = net.vault(2);

    let twin_id = provider.market().mint_twin().await.unwrap();
    provider
        .upload_record("mri-2024", b"shared scan", "{}", 2)
        .await
        .unwrap();

    let pool_id = provider.market().create_pool(pool_params(50)).await.unwrap();
    provider
        .market()
        .stake_record(pool_id, twin_id, "mri-2024")
        .await
        .unwrap();

    net.ledger.credit(buyer.market().address(), 50).await;
    buyer.market().subscribe(pool_id).await.unwrap();

    let session = buyer.create_session().await.unwrap();
    let plaintext = buyer
        .download_as_subscriber(provider.market().address(), "mri-2024", pool_id, &session)
        .await
        .unwrap();
    assert_eq!(plaintext, b"shared scan");
}

#[tokio::test]
async fn expired_subscription_is_denied() {
    let net = TestNet::new(3);
    let provider = net.vault(1);
    let buyer = net.vault(2);

    let twin_id = provider.market().mint_twin().await.unwrap();
    provider
        .upload_record("mri-2024", b"scan", "{}", 2)
        .await
        .unwrap();
    let pool_id = provider.market().create_pool(pool_params(50)).await.unwrap();
    provider
        .market()
        .stake_record(pool_id, twin_id, "mri-2024")
        .await
        .unwrap();

    net.ledger.credit(buyer.market().address(), 50).await;
    buyer.market().subscribe(pool_id).await.unwrap();

    // The whole period elapses; a brand-new session cannot help.
    net.ledger.advance_clock(SUBSCRIPTION_PERIOD_MS).await;
    let session = buyer.create_session().await.unwrap();
    let err = buyer
        .download_as_subscriber(provider.market().address(), "mri-2024", pool_id, &session)
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Seal(SealError::AccessDenied(_))));
    assert!(!buyer.market().subscription_active(pool_id).await.unwrap());
}

#[tokio::test]
async fn resubscribe_overwrites_remaining_time() {
    let net = TestNet::new(3);
    let provider = net.vault(1);
    let buyer = net.vault(2);

    provider.market().mint_twin().await.unwrap();
    let pool_id = provider.market().create_pool(pool_params(50)).await.unwrap();

    net.ledger.credit(buyer.market().address(), 100).await;
    let first = buyer.market().subscribe(pool_id).await.unwrap();

    net.ledger.advance_clock(SUBSCRIPTION_PERIOD_MS / 2).await;
    let second = buyer.market().subscribe(pool_id).await.unwrap();

    // Half the old period was forfeited, not added.
    assert_eq!(second, first + SUBSCRIPTION_PERIOD_MS / 2);
}

#[tokio::test]
async fn stranger_cannot_read_owner_record() {
    let net = TestNet::new(3);
    let owner = net.vault(1);
    let stranger = net.vault(2);

    owner.market().mint_twin().await.unwrap();
    owner
        .upload_record("mri-2024", b"private", "{}", 2)
        .await
        .unwrap();
    stranger.market().mint_twin().await.unwrap();

    // The stranger builds an owner proof against the owner's twin.
    let session = stranger.create_session().await.unwrap();
    let owner_twin = net
        .ledger
        .twin_by_owner(owner.market().address())
        .await
        .unwrap()
        .unwrap();
    let record = owner_twin.record("mri-2024").unwrap();
    let bytes = net.store.get(&record.blob_id).await.unwrap();
    let object = sealvault::EncryptedObject::from_bytes(&bytes).unwrap();

    let request = sealvault::AuthorizationRequest::OwnerProof {
        identity: object.identity.clone(),
        twin_id: owner_twin.id,
    };
    let engine = SealEngine::new(
        net.servers.clone(),
        EngineConfig {
            package: net.package,
            share_deadline: Duration::from_secs(2),
        },
    );
    let now = net.ledger.clock_ms().await.unwrap();
    let err = engine
        .decrypt(&object, &session, &request, now)
        .await
        .unwrap_err();
    assert!(matches!(err, SealError::AccessDenied(_)));
}

#[tokio::test]
async fn session_expiry_boundary() {
    let net = TestNet::new(3);
    let owner = net.vault(1);

    owner.market().mint_twin().await.unwrap();
    owner
        .upload_record("mri-2024", b"scan", "{}", 2)
        .await
        .unwrap();
    let session = owner.create_session().await.unwrap();

    // Exactly at the TTL the session is still valid.
    net.ledger.set_clock_ms(SESSION_TTL_MS).await;
    assert_eq!(
        owner.download_as_owner("mri-2024", &session).await.unwrap(),
        b"scan"
    );

    // One millisecond later it is not.
    net.ledger.advance_clock(1).await;
    let err = owner
        .download_as_owner("mri-2024", &session)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        VaultError::Seal(SealError::SessionExpiredOrUnsigned)
    ));
}

#[tokio::test]
async fn backup_key_recovers_without_servers() {
    let net = TestNet::new(3);
    let owner = net.vault(1);

    owner.market().mint_twin().await.unwrap();
    let receipt = owner
        .upload_record("mri-2024", b"scan", "{}", 3)
        .await
        .unwrap();

    let plaintext = owner
        .recover_with_backup(&receipt.blob_id, &receipt.backup)
        .await
        .unwrap();
    assert_eq!(plaintext, b"scan");
}

#[tokio::test]
async fn upload_requires_twin_and_name() {
    let net = TestNet::new(3);
    let owner = net.vault(1);

    assert!(matches!(
        owner.upload_record("mri-2024", b"scan", "{}", 2).await,
        Err(VaultError::TwinNotMinted(_))
    ));

    owner.market().mint_twin().await.unwrap();
    assert!(matches!(
        owner.upload_record("", b"scan", "{}", 2).await,
        Err(VaultError::InvalidParameter(_))
    ));
}

#[tokio::test]
async fn duplicate_record_names_rejected() {
    let net = TestNet::new(3);
    let owner = net.vault(1);
    owner.market().mint_twin().await.unwrap();

    owner
        .upload_record("mri-2024", b"first", "{}", 2)
        .await
        .unwrap();
    let err = owner
        .upload_record("mri-2024", b"second", "{}", 2)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        VaultError::Market(MarketError::Ledger(LedgerError::RecordExists(_)))
    ));
}

#[tokio::test]
async fn missing_record_reported() {
    let net = TestNet::new(3);
    let owner = net.vault(1);
    owner.market().mint_twin().await.unwrap();

    let session = owner.create_session().await.unwrap();
    assert!(matches!(
        owner.download_as_owner("no-such-record", &session).await,
        Err(VaultError::RecordNotFound(_))
    ));
    assert!(matches!(
        owner
            .recover_with_backup(
                &BlobId::for_bytes(b"never stored"),
                &sealvault::BackupKey::from_bytes([0; 32])
            )
            .await,
        Err(VaultError::Store(_))
    ));
}
