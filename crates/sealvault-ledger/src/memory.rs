//! In-memory reference ledger.
//!
//! Backs tests and the local key-server network. The clock is settable so
//! tests can walk time across subscription expiries without sleeping.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use sealvault_core::{Address, ObjectId};
use sealvault_session::AuthorizationRequest;

use crate::error::{LedgerError, Result};
use crate::objects::{DigitalTwin, HealthRecordRef, Pool, StakedRecord, SUBSCRIPTION_PERIOD_MS};
use crate::policy;
use crate::traits::Ledger;
use crate::transaction::{Command, Effects, Event, EventFilter, EventKind, SignedTransaction};

#[derive(Default)]
struct Inner {
    twins: HashMap<ObjectId, DigitalTwin>,
    twin_by_owner: HashMap<Address, ObjectId>,
    pools: HashMap<ObjectId, Pool>,
    balances: HashMap<Address, u64>,
    events: Vec<Event>,
    clock_ms: i64,
    object_counter: u64,
}

impl Inner {
    fn current_version(&self, object: &ObjectId) -> Option<u64> {
        if let Some(twin) = self.twins.get(object) {
            return Some(twin.version);
        }
        self.pools.get(object).map(|p| p.version)
    }

    fn next_object_id(&mut self, creator: &Address) -> ObjectId {
        let id = ObjectId::derive(creator, self.object_counter);
        self.object_counter += 1;
        id
    }
}

/// An in-memory [`Ledger`] with a manually driven clock.
#[derive(Default)]
pub struct MemoryLedger {
    inner: RwLock<Inner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ledger clock to an absolute timestamp.
    pub async fn set_clock_ms(&self, clock_ms: i64) {
        self.inner.write().await.clock_ms = clock_ms;
    }

    /// Advance the ledger clock by a delta.
    pub async fn advance_clock(&self, delta_ms: i64) {
        self.inner.write().await.clock_ms += delta_ms;
    }

    /// Credit an account out of thin air. Test faucet only; real ledgers
    /// mint through their own issuance rules.
    pub async fn credit(&self, address: &Address, amount: u64) {
        let mut inner = self.inner.write().await;
        *inner.balances.entry(*address).or_insert(0) += amount;
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn twin(&self, id: &ObjectId) -> Result<DigitalTwin> {
        let inner = self.inner.read().await;
        inner
            .twins
            .get(id)
            .cloned()
            .ok_or(LedgerError::ObjectNotFound(*id))
    }

    async fn twin_by_owner(&self, owner: &Address) -> Result<Option<DigitalTwin>> {
        let inner = self.inner.read().await;
        Ok(inner
            .twin_by_owner
            .get(owner)
            .and_then(|id| inner.twins.get(id))
            .cloned())
    }

    async fn pool(&self, id: &ObjectId) -> Result<Pool> {
        let inner = self.inner.read().await;
        inner
            .pools
            .get(id)
            .cloned()
            .ok_or(LedgerError::ObjectNotFound(*id))
    }

    async fn balance_of(&self, address: &Address) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner.balances.get(address).copied().unwrap_or(0))
    }

    async fn clock_ms(&self) -> Result<i64> {
        Ok(self.inner.read().await.clock_ms)
    }

    async fn query_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let inner = self.inner.read().await;
        Ok(inner
            .events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    async fn execute(&self, signed: SignedTransaction) -> Result<Effects> {
        signed.verify()?;
        let sender = signed.transaction.sender;

        let mut inner = self.inner.write().await;

        // All pins are checked before any mutation; a stale pin fails the
        // whole transaction.
        for pin in &signed.transaction.pins {
            let current = inner
                .current_version(&pin.object)
                .ok_or(LedgerError::ObjectNotFound(pin.object))?;
            if current != pin.version {
                return Err(LedgerError::StaleObjectVersion {
                    object: pin.object,
                    pinned: pin.version,
                    current,
                });
            }
        }

        let now_ms = inner.clock_ms;
        let mut effects = Effects::default();

        match &signed.transaction.command {
            Command::MintTwin => {
                if inner.twin_by_owner.contains_key(&sender) {
                    return Err(LedgerError::TwinExists(sender));
                }
                let id = inner.next_object_id(&sender);
                inner.twins.insert(
                    id,
                    DigitalTwin {
                        id,
                        owner: sender,
                        reputation_score: 0,
                        records: Default::default(),
                        version: 1,
                    },
                );
                inner.twin_by_owner.insert(sender, id);
                effects.created.push(id);
                effects.events.push(Event {
                    kind: EventKind::TwinMinted {
                        twin: id,
                        owner: sender,
                    },
                    timestamp_ms: now_ms,
                });
            }

            Command::AddRecord {
                twin,
                name,
                blob_id,
                metadata_json,
            } => {
                if name.is_empty() {
                    return Err(LedgerError::InvalidParameter(
                        "record name must be non-empty".into(),
                    ));
                }
                let twin_obj = inner
                    .twins
                    .get(twin)
                    .ok_or(LedgerError::ObjectNotFound(*twin))?;
                if twin_obj.owner != sender {
                    return Err(LedgerError::AccessDenied(format!(
                        "sender {sender} does not own twin {twin}"
                    )));
                }
                if twin_obj.records.contains_key(name) {
                    return Err(LedgerError::RecordExists(name.clone()));
                }

                let twin_obj = inner.twins.get_mut(twin).expect("checked above");
                twin_obj.records.insert(
                    name.clone(),
                    HealthRecordRef {
                        name: name.clone(),
                        blob_id: *blob_id,
                        metadata_json: metadata_json.clone(),
                        timestamp_ms: now_ms,
                        verified: false,
                    },
                );
                twin_obj.version += 1;
                effects.events.push(Event {
                    kind: EventKind::RecordAdded {
                        twin: *twin,
                        name: name.clone(),
                    },
                    timestamp_ms: now_ms,
                });
            }

            Command::CreatePool {
                name,
                description,
                criteria,
                subscription_price,
            } => {
                if name.is_empty() {
                    return Err(LedgerError::InvalidParameter(
                        "pool name must be non-empty".into(),
                    ));
                }
                let id = inner.next_object_id(&sender);
                inner.pools.insert(
                    id,
                    Pool {
                        id,
                        name: name.clone(),
                        description: description.clone(),
                        criteria: criteria.clone(),
                        balance: 0,
                        data_count: 0,
                        subscription_price: *subscription_price,
                        owner: sender,
                        subscribers: Default::default(),
                        staked: Vec::new(),
                        version: 1,
                    },
                );
                effects.created.push(id);
                effects.events.push(Event {
                    kind: EventKind::PoolCreated {
                        pool: id,
                        owner: sender,
                    },
                    timestamp_ms: now_ms,
                });
            }

            Command::FundPool { pool, amount } => {
                if *amount == 0 {
                    return Err(LedgerError::InvalidParameter(
                        "fund amount must be positive".into(),
                    ));
                }
                let pool_balance = inner
                    .pools
                    .get(pool)
                    .ok_or(LedgerError::ObjectNotFound(*pool))?
                    .balance;
                let new_balance = pool_balance.checked_add(*amount).ok_or_else(|| {
                    LedgerError::InvalidParameter("pool balance overflow".into())
                })?;
                let available = inner.balances.get(&sender).copied().unwrap_or(0);
                if available < *amount {
                    return Err(LedgerError::InsufficientBalance {
                        required: *amount,
                        available,
                    });
                }

                *inner.balances.get_mut(&sender).expect("checked above") -= amount;
                let pool_obj = inner.pools.get_mut(pool).expect("checked above");
                pool_obj.balance = new_balance;
                pool_obj.version += 1;
                effects.events.push(Event {
                    kind: EventKind::PoolFunded {
                        pool: *pool,
                        amount: *amount,
                    },
                    timestamp_ms: now_ms,
                });
            }

            Command::StakeRecord {
                pool,
                twin,
                record_name,
            } => {
                let twin_obj = inner
                    .twins
                    .get(twin)
                    .ok_or(LedgerError::ObjectNotFound(*twin))?;
                if twin_obj.owner != sender {
                    return Err(LedgerError::AccessDenied(format!(
                        "sender {sender} does not own twin {twin}"
                    )));
                }
                if twin_obj.record(record_name).is_none() {
                    return Err(LedgerError::RecordNotFound(record_name.clone()));
                }
                let pool_obj = inner
                    .pools
                    .get(pool)
                    .ok_or(LedgerError::ObjectNotFound(*pool))?;
                if pool_obj.is_staked(&sender, record_name) {
                    return Err(LedgerError::AlreadyStaked(record_name.clone()));
                }

                let pool_obj = inner.pools.get_mut(pool).expect("checked above");
                pool_obj.staked.push(StakedRecord {
                    provider: sender,
                    record_name: record_name.clone(),
                });
                pool_obj.data_count += 1;
                pool_obj.version += 1;
                effects.events.push(Event {
                    kind: EventKind::DataStaked {
                        pool: *pool,
                        provider: sender,
                        record_name: record_name.clone(),
                    },
                    timestamp_ms: now_ms,
                });
            }

            Command::Subscribe { pool, payment } => {
                let pool_obj = inner
                    .pools
                    .get(pool)
                    .ok_or(LedgerError::ObjectNotFound(*pool))?;
                if *payment < pool_obj.subscription_price {
                    return Err(LedgerError::InsufficientPayment {
                        price: pool_obj.subscription_price,
                        offered: *payment,
                    });
                }
                let new_balance = pool_obj.balance.checked_add(*payment).ok_or_else(|| {
                    LedgerError::InvalidParameter("pool balance overflow".into())
                })?;
                let available = inner.balances.get(&sender).copied().unwrap_or(0);
                if available < *payment {
                    return Err(LedgerError::InsufficientBalance {
                        required: *payment,
                        available,
                    });
                }

                let expires_at_ms = now_ms + SUBSCRIPTION_PERIOD_MS;
                *inner.balances.get_mut(&sender).expect("checked above") -= payment;
                let pool_obj = inner.pools.get_mut(pool).expect("checked above");
                pool_obj.balance = new_balance;
                // Overwrite, never extend: re-subscribing with time left
                // resets the expiry rather than stacking periods.
                pool_obj.subscribers.insert(sender, expires_at_ms);
                pool_obj.version += 1;
                effects.events.push(Event {
                    kind: EventKind::Subscribed {
                        pool: *pool,
                        subscriber: sender,
                        expires_at_ms,
                    },
                    timestamp_ms: now_ms,
                });
            }
        }

        inner.events.extend(effects.events.iter().cloned());
        debug!(
            sender = %sender,
            created = effects.created.len(),
            events = effects.events.len(),
            "executed transaction"
        );
        Ok(effects)
    }

    async fn check_policy(
        &self,
        request: &AuthorizationRequest,
        requester: &Address,
    ) -> Result<()> {
        let inner = self.inner.read().await;
        match request {
            AuthorizationRequest::OwnerProof { identity, twin_id } => {
                // A dangling object reference is a policy failure, not a
                // lookup failure the caller should retry.
                let twin = inner
                    .twins
                    .get(twin_id)
                    .ok_or_else(|| LedgerError::AccessDenied(format!("no twin {twin_id}")))?;
                policy::approve_owner(identity, twin, requester)
            }
            AuthorizationRequest::SubscriberProof { identity, pool_id } => {
                let pool = inner
                    .pools
                    .get(pool_id)
                    .ok_or_else(|| LedgerError::AccessDenied(format!("no pool {pool_id}")))?;
                policy::approve_subscriber(identity, pool, inner.clock_ms, requester)
            }
        }
    }
}
