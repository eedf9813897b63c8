//! The marketplace client.
//!
//! Wraps one actor's signing capability and a ledger handle behind the
//! read-pin-sign-execute cycle: every mutation reads fresh state, pins the
//! versions it depends on, and resubmits from a fresh read when the ledger
//! reports a stale pin, up to a bounded retry budget.

use std::sync::Arc;

use tracing::debug;

use sealvault_core::{Address, BlobId, Keypair, ObjectId};
use sealvault_ledger::{
    Command, Effects, Event, EventFilter, EventKind, EventType, Ledger, LedgerError,
    SignedTransaction, StakedRecord, Transaction,
};

use crate::error::{MarketError, Result};

/// Marketplace client configuration.
#[derive(Debug, Clone, Copy)]
pub struct MarketConfig {
    /// How many times to resubmit after a stale version pin before giving up.
    pub max_retries: u32,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

/// Parameters for creating a pool.
#[derive(Debug, Clone)]
pub struct PoolParams {
    pub name: String,
    pub description: String,
    pub criteria: String,
    pub subscription_price: u64,
}

/// A marketplace client acting for one address.
pub struct Market<L> {
    ledger: Arc<L>,
    keypair: Keypair,
    address: Address,
    config: MarketConfig,
}

impl<L: Ledger> Market<L> {
    pub fn new(ledger: Arc<L>, keypair: Keypair, config: MarketConfig) -> Self {
        let address = Address::from_public_key(&keypair.public_key());
        Self {
            ledger,
            keypair,
            address,
            config,
        }
    }

    /// The address this client signs for.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The public half of this client's signing capability.
    pub fn public_key(&self) -> sealvault_core::Ed25519PublicKey {
        self.keypair.public_key()
    }

    /// Sign an arbitrary message, e.g. a session-key personal message.
    pub fn sign_message(&self, message: &[u8]) -> sealvault_core::Ed25519Signature {
        self.keypair.sign(message)
    }

    /// The underlying ledger handle.
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    fn sign(&self, transaction: Transaction) -> SignedTransaction {
        transaction.sign(&self.keypair)
    }

    /// Mint this actor's digital twin. Fails if one already exists.
    pub async fn mint_twin(&self) -> Result<ObjectId> {
        let effects = self
            .ledger
            .execute(self.sign(Transaction::new(self.address, Command::MintTwin)))
            .await?;
        created_id(&effects)
    }

    /// Append a record reference to this actor's twin.
    pub async fn add_record(
        &self,
        twin_id: ObjectId,
        name: &str,
        blob_id: BlobId,
        metadata_json: &str,
    ) -> Result<()> {
        let mut attempt = 0u32;
        loop {
            let twin = self.ledger.twin(&twin_id).await?;
            let tx = Transaction::new(
                self.address,
                Command::AddRecord {
                    twin: twin_id,
                    name: name.to_string(),
                    blob_id,
                    metadata_json: metadata_json.to_string(),
                },
            )
            .pin(twin_id, twin.version);

            match self.ledger.execute(self.sign(tx)).await {
                Ok(_) => return Ok(()),
                Err(err) => self.retry_or_bail(err, &mut attempt)?,
            }
        }
    }

    /// Create a new pool owned by this actor.
    pub async fn create_pool(&self, params: PoolParams) -> Result<ObjectId> {
        let effects = self
            .ledger
            .execute(self.sign(Transaction::new(
                self.address,
                Command::CreatePool {
                    name: params.name,
                    description: params.description,
                    criteria: params.criteria,
                    subscription_price: params.subscription_price,
                },
            )))
            .await?;
        created_id(&effects)
    }

    /// Move funds from this actor's balance into a pool.
    pub async fn fund_pool(&self, pool_id: ObjectId, amount: u64) -> Result<()> {
        let mut attempt = 0u32;
        loop {
            let pool = self.ledger.pool(&pool_id).await?;
            let tx = Transaction::new(
                self.address,
                Command::FundPool {
                    pool: pool_id,
                    amount,
                },
            )
            .pin(pool_id, pool.version);

            match self.ledger.execute(self.sign(tx)).await {
                Ok(_) => return Ok(()),
                Err(err) => self.retry_or_bail(err, &mut attempt)?,
            }
        }
    }

    /// Stake one of this actor's records into a pool.
    pub async fn stake_record(
        &self,
        pool_id: ObjectId,
        twin_id: ObjectId,
        record_name: &str,
    ) -> Result<()> {
        let mut attempt = 0u32;
        loop {
            let pool = self.ledger.pool(&pool_id).await?;
            let tx = Transaction::new(
                self.address,
                Command::StakeRecord {
                    pool: pool_id,
                    twin: twin_id,
                    record_name: record_name.to_string(),
                },
            )
            .pin(pool_id, pool.version);

            match self.ledger.execute(self.sign(tx)).await {
                Ok(_) => return Ok(()),
                Err(err) => self.retry_or_bail(err, &mut attempt)?,
            }
        }
    }

    /// Subscribe to a pool at its current price. Returns the new expiry.
    ///
    /// The price is re-read on every attempt, so a concurrent price change
    /// is picked up rather than underpaid.
    pub async fn subscribe(&self, pool_id: ObjectId) -> Result<i64> {
        let mut attempt = 0u32;
        loop {
            let pool = self.ledger.pool(&pool_id).await?;
            let tx = Transaction::new(
                self.address,
                Command::Subscribe {
                    pool: pool_id,
                    payment: pool.subscription_price,
                },
            )
            .pin(pool_id, pool.version);

            match self.ledger.execute(self.sign(tx)).await {
                Ok(effects) => return subscription_expiry(&effects),
                Err(err) => self.retry_or_bail(err, &mut attempt)?,
            }
        }
    }

    /// Whether this actor currently holds an active subscription, judged
    /// against the ledger clock.
    pub async fn subscription_active(&self, pool_id: ObjectId) -> Result<bool> {
        let pool = self.ledger.pool(&pool_id).await?;
        let now_ms = self.ledger.clock_ms().await?;
        Ok(pool.subscription_active(&self.address, now_ms))
    }

    /// All records ever staked into a pool, reconstructed from the event log.
    ///
    /// The event index only filters by type; the pool correlation happens
    /// here, client-side.
    pub async fn staked_records(&self, pool_id: ObjectId) -> Result<Vec<StakedRecord>> {
        let events = self
            .ledger
            .query_events(&EventFilter::by_type(EventType::DataStaked))
            .await?;

        Ok(events
            .into_iter()
            .filter_map(|event| match event.kind {
                EventKind::DataStaked {
                    pool,
                    provider,
                    record_name,
                } if pool == pool_id => Some(StakedRecord {
                    provider,
                    record_name,
                }),
                _ => None,
            })
            .collect())
    }

    /// Subscription events for a pool, for audit trails.
    pub async fn subscription_events(&self, pool_id: ObjectId) -> Result<Vec<Event>> {
        let events = self
            .ledger
            .query_events(&EventFilter::by_type(EventType::Subscribed))
            .await?;
        Ok(events
            .into_iter()
            .filter(|event| matches!(event.kind, EventKind::Subscribed { pool, .. } if pool == pool_id))
            .collect())
    }

    fn retry_or_bail(&self, err: LedgerError, attempt: &mut u32) -> Result<()> {
        match err {
            LedgerError::StaleObjectVersion { .. } if *attempt < self.config.max_retries => {
                *attempt += 1;
                debug!(attempt, "stale version pin, re-reading and resubmitting");
                Ok(())
            }
            other => Err(other.into()),
        }
    }
}

fn created_id(effects: &Effects) -> Result<ObjectId> {
    effects
        .created
        .first()
        .copied()
        .ok_or_else(|| MarketError::UnexpectedEffects("no object created".into()))
}

fn subscription_expiry(effects: &Effects) -> Result<i64> {
    effects
        .events
        .iter()
        .find_map(|event| match event.kind {
            EventKind::Subscribed { expires_at_ms, .. } => Some(expires_at_ms),
            _ => None,
        })
        .ok_or_else(|| MarketError::UnexpectedEffects("no subscription event".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    use sealvault_core::ObjectId;
    use sealvault_ledger::{DigitalTwin, MemoryLedger, Pool, SUBSCRIPTION_PERIOD_MS};
    use sealvault_session::AuthorizationRequest;

    fn market(ledger: &Arc<MemoryLedger>, seed: u8) -> Market<MemoryLedger> {
        Market::new(
            ledger.clone(),
            Keypair::from_seed(&[seed; 32]),
            MarketConfig::default(),
        )
    }

    fn pool_params(price: u64) -> PoolParams {
        PoolParams {
            name: "oncology".into(),
            description: "imaging studies".into(),
            criteria: "mri".into(),
            subscription_price: price,
        }
    }

    #[tokio::test]
    async fn test_full_marketplace_flow() {
        let ledger = Arc::new(MemoryLedger::new());
        let provider = market(&ledger, 1);
        let buyer = market(&ledger, 2);

        let twin_id = provider.mint_twin().await.unwrap();
        provider
            .add_record(twin_id, "mri-2024", BlobId::for_bytes(b"ct"), "{}")
            .await
            .unwrap();

        let pool_id = provider.create_pool(pool_params(50)).await.unwrap();
        provider
            .stake_record(pool_id, twin_id, "mri-2024")
            .await
            .unwrap();

        ledger.credit(buyer.address(), 100).await;
        let expires = buyer.subscribe(pool_id).await.unwrap();
        assert_eq!(expires, SUBSCRIPTION_PERIOD_MS);
        assert!(buyer.subscription_active(pool_id).await.unwrap());

        let staked = buyer.staked_records(pool_id).await.unwrap();
        assert_eq!(staked.len(), 1);
        assert_eq!(staked[0].provider, *provider.address());
        assert_eq!(staked[0].record_name, "mri-2024");

        ledger.advance_clock(SUBSCRIPTION_PERIOD_MS).await;
        assert!(!buyer.subscription_active(pool_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_staked_records_filters_by_pool() {
        let ledger = Arc::new(MemoryLedger::new());
        let provider = market(&ledger, 1);

        let twin_id = provider.mint_twin().await.unwrap();
        provider
            .add_record(twin_id, "a", BlobId::for_bytes(b"a"), "{}")
            .await
            .unwrap();
        provider
            .add_record(twin_id, "b", BlobId::for_bytes(b"b"), "{}")
            .await
            .unwrap();

        let pool_a = provider.create_pool(pool_params(10)).await.unwrap();
        let pool_b = provider.create_pool(pool_params(10)).await.unwrap();
        provider.stake_record(pool_a, twin_id, "a").await.unwrap();
        provider.stake_record(pool_b, twin_id, "b").await.unwrap();

        let staked = provider.staked_records(pool_a).await.unwrap();
        assert_eq!(staked.len(), 1);
        assert_eq!(staked[0].record_name, "a");
    }

    #[tokio::test]
    async fn test_fund_pool() {
        let ledger = Arc::new(MemoryLedger::new());
        let owner = market(&ledger, 1);
        let pool_id = owner.create_pool(pool_params(10)).await.unwrap();

        ledger.credit(owner.address(), 500).await;
        owner.fund_pool(pool_id, 200).await.unwrap();

        assert_eq!(ledger.pool(&pool_id).await.unwrap().balance, 200);
        assert_eq!(ledger.balance_of(owner.address()).await.unwrap(), 300);
    }

    /// Delegating ledger that reports one stale pin before behaving.
    struct StaleOnce {
        inner: MemoryLedger,
        tripped: AtomicBool,
    }

    #[async_trait]
    impl Ledger for StaleOnce {
        async fn twin(&self, id: &ObjectId) -> sealvault_ledger::Result<DigitalTwin> {
            self.inner.twin(id).await
        }
        async fn twin_by_owner(
            &self,
            owner: &Address,
        ) -> sealvault_ledger::Result<Option<DigitalTwin>> {
            self.inner.twin_by_owner(owner).await
        }
        async fn pool(&self, id: &ObjectId) -> sealvault_ledger::Result<Pool> {
            self.inner.pool(id).await
        }
        async fn balance_of(&self, address: &Address) -> sealvault_ledger::Result<u64> {
            self.inner.balance_of(address).await
        }
        async fn clock_ms(&self) -> sealvault_ledger::Result<i64> {
            self.inner.clock_ms().await
        }
        async fn query_events(
            &self,
            filter: &EventFilter,
        ) -> sealvault_ledger::Result<Vec<Event>> {
            self.inner.query_events(filter).await
        }
        async fn execute(&self, signed: SignedTransaction) -> sealvault_ledger::Result<Effects> {
            if let Some(pin) = signed.transaction.pins.first() {
                if !self.tripped.swap(true, Ordering::SeqCst) {
                    return Err(LedgerError::StaleObjectVersion {
                        object: pin.object,
                        pinned: pin.version,
                        current: pin.version + 1,
                    });
                }
            }
            self.inner.execute(signed).await
        }
        async fn check_policy(
            &self,
            request: &AuthorizationRequest,
            requester: &Address,
        ) -> sealvault_ledger::Result<()> {
            self.inner.check_policy(request, requester).await
        }
    }

    #[tokio::test]
    async fn test_retries_after_stale_pin() {
        let ledger = Arc::new(StaleOnce {
            inner: MemoryLedger::new(),
            tripped: AtomicBool::new(false),
        });
        let provider = Market::new(
            ledger.clone(),
            Keypair::from_seed(&[1; 32]),
            MarketConfig::default(),
        );

        let twin_id = provider.mint_twin().await.unwrap();
        // First execute reports a stale pin; the client re-reads and lands it.
        provider
            .add_record(twin_id, "mri-2024", BlobId::for_bytes(b"ct"), "{}")
            .await
            .unwrap();

        let twin = ledger.twin(&twin_id).await.unwrap();
        assert!(twin.record("mri-2024").is_some());
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted() {
        let stale = Arc::new(StaleOnce {
            inner: MemoryLedger::new(),
            tripped: AtomicBool::new(false),
        });
        let impatient = Market::new(
            stale,
            Keypair::from_seed(&[1; 32]),
            MarketConfig { max_retries: 0 },
        );

        let twin_id = impatient.mint_twin().await.unwrap();
        let err = impatient
            .add_record(twin_id, "a", BlobId::for_bytes(b"a"), "{}")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MarketError::Ledger(LedgerError::StaleObjectVersion { .. })
        ));
    }
}
