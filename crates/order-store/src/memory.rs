use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{Order, OrderStatus};
use tokio::sync::RwLock;

use crate::{
    OrderRecord, Result, StatusChange, StoreError,
    store::{OrderStore, UpdateOptions, UserLookup, skip_undecodable},
};

/// A stored item: the owner attribute plus the encoded record document.
#[derive(Debug, Clone)]
struct StoredItem {
    owner_id: UserId,
    document: String,
}

#[derive(Default)]
struct Table {
    /// Items keyed by sort key (the order ID).
    items: BTreeMap<String, StoredItem>,
    /// Secondary index from owner to sort keys.
    by_owner: HashMap<UserId, BTreeSet<String>>,
}

impl Table {
    fn put(&mut self, key: String, item: StoredItem) {
        if let Some(previous) = self.items.get(&key)
            && previous.owner_id != item.owner_id
            && let Some(keys) = self.by_owner.get_mut(&previous.owner_id)
        {
            keys.remove(&key);
        }
        self.by_owner
            .entry(item.owner_id.clone())
            .or_default()
            .insert(key.clone());
        self.items.insert(key, item);
    }
}

/// In-memory order store implementation for testing and local runs.
///
/// Records are kept as encoded JSON documents so that decode failures behave
/// the same way as with the PostgreSQL implementation. Reads and writes can
/// be made to fail or stall on demand.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    table: Arc<RwLock<Table>>,
    lookup: UserLookup,
    fail_on_read: Arc<AtomicBool>,
    fail_on_write: Arc<AtomicBool>,
    latency_ms: Arc<AtomicU64>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty store using the given orders-by-user strategy.
    pub fn with_lookup(lookup: UserLookup) -> Self {
        Self {
            lookup,
            ..Self::default()
        }
    }

    /// Makes subsequent reads fail with `Unavailable`.
    pub fn set_fail_on_read(&self, fail: bool) {
        self.fail_on_read.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent writes fail with `Unavailable`.
    pub fn set_fail_on_write(&self, fail: bool) {
        self.fail_on_write.store(fail, Ordering::SeqCst);
    }

    /// Delays every operation by the given duration.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.table.read().await.items.len()
    }

    /// Returns true if no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.table.read().await.items.is_empty()
    }

    /// Clears all records.
    pub async fn clear(&self) {
        let mut table = self.table.write().await;
        table.items.clear();
        table.by_owner.clear();
    }

    /// Stores a raw document under the given key without encoding it.
    ///
    /// Lets tests plant records that fail to decode.
    pub async fn insert_raw(
        &self,
        order_id: &OrderId,
        owner_id: &UserId,
        document: impl Into<String>,
    ) {
        self.table.write().await.put(
            order_id.as_str().to_string(),
            StoredItem {
                owner_id: owner_id.clone(),
                document: document.into(),
            },
        );
    }

    async fn before_read(&self) -> Result<()> {
        self.simulate_latency().await;
        if self.fail_on_read.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated read failure".to_string()));
        }
        Ok(())
    }

    async fn before_write(&self) -> Result<()> {
        self.simulate_latency().await;
        if self.fail_on_write.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "simulated write failure".to_string(),
            ));
        }
        Ok(())
    }

    async fn simulate_latency(&self) {
        let millis = self.latency_ms.load(Ordering::SeqCst);
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    fn encode(record: &OrderRecord) -> Result<StoredItem> {
        Ok(StoredItem {
            owner_id: record.owner_id().clone(),
            document: serde_json::to_string(record)?,
        })
    }

    fn decode(key: &str, item: &StoredItem) -> Result<OrderRecord> {
        serde_json::from_str(&item.document).map_err(|e| StoreError::Corrupt {
            order_id: OrderId::new(key),
            reason: e.to_string(),
        })
    }

    fn decode_all<'a>(items: impl Iterator<Item = (&'a String, &'a StoredItem)>) -> Vec<OrderRecord> {
        items
            .filter_map(|(key, item)| match Self::decode(key, item) {
                Ok(record) => Some(record),
                Err(e) => {
                    skip_undecodable(key, &e);
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, mut order: Order, status: OrderStatus) -> Result<OrderRecord> {
        self.before_write().await?;

        if !order.order_id.is_assigned() {
            order.order_id = OrderId::generate();
        }
        let record = OrderRecord::new(order, status);
        let key = record.order_id().as_str().to_string();
        let item = Self::encode(&record)?;

        let mut table = self.table.write().await;
        if table.items.contains_key(&key) {
            return Err(StoreError::AlreadyExists(record.order_id().clone()));
        }
        table.put(key, item);

        Ok(record)
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<OrderRecord>> {
        self.before_read().await?;

        let table = self.table.read().await;
        table
            .items
            .get(order_id.as_str())
            .map(|item| Self::decode(order_id.as_str(), item))
            .transpose()
    }

    async fn get_all(&self) -> Result<Vec<OrderRecord>> {
        self.before_read().await?;

        let table = self.table.read().await;
        Ok(Self::decode_all(table.items.iter()))
    }

    async fn get_by_user(&self, user_id: &UserId) -> Result<Vec<OrderRecord>> {
        self.before_read().await?;

        let table = self.table.read().await;
        let records = match self.lookup {
            UserLookup::Index => {
                let keys = table.by_owner.get(user_id);
                Self::decode_all(
                    keys.into_iter()
                        .flatten()
                        .filter_map(|key| table.items.get_key_value(key)),
                )
            }
            UserLookup::Scan => Self::decode_all(
                table
                    .items
                    .iter()
                    .filter(|(_, item)| &item.owner_id == user_id),
            ),
        };
        Ok(records)
    }

    async fn update_status(
        &self,
        order_id: &OrderId,
        change: StatusChange,
        options: UpdateOptions,
    ) -> Result<OrderRecord> {
        self.before_write().await?;

        let key = order_id.as_str();
        let mut table = self.table.write().await;
        let item = table
            .items
            .get(key)
            .ok_or_else(|| StoreError::NotFound(order_id.clone()))?;
        let mut record = Self::decode(key, item)?;

        if let Some(expected) = options.expected_version
            && record.version != expected
        {
            return Err(StoreError::ConcurrencyConflict {
                order_id: order_id.clone(),
                expected,
                actual: record.version,
            });
        }

        record.apply(&change);
        let item = Self::encode(&record)?;
        table.put(key.to_string(), item);

        Ok(record)
    }
}
