use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{Order, OrderStatus};

use crate::{OrderRecord, Result, StatusChange, StoreError, Version};

/// Options for a status update.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Expected version of the record for optimistic concurrency control.
    /// If None, the update is unconditional.
    pub expected_version: Option<Version>,
}

impl UpdateOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the record to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }
}

/// How orders-by-user are looked up.
///
/// Both strategies return the same logical result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserLookup {
    /// Query the secondary owner attribute.
    #[default]
    Index,
    /// Scan every order record and filter on the owner attribute.
    Scan,
}

impl std::str::FromStr for UserLookup {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "index" | "query" => Ok(UserLookup::Index),
            "scan" => Ok(UserLookup::Scan),
            other => Err(format!("unknown user lookup strategy: {other}")),
        }
    }
}

impl std::fmt::Display for UserLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserLookup::Index => write!(f, "index"),
            UserLookup::Scan => write!(f, "scan"),
        }
    }
}

/// Durable storage for order records.
///
/// Records are keyed by `(ORDER_ENTITY, order_id)` and carry the owner as a
/// secondary attribute. All implementations must be thread-safe (Send + Sync)
/// and must apply `update_status` atomically per record.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Writes a new order record with the given status.
    ///
    /// An unassigned order ID is replaced by a freshly generated one. Fails
    /// with `AlreadyExists` if a record with the same ID is stored.
    async fn create(&self, order: Order, status: OrderStatus) -> Result<OrderRecord>;

    /// Loads a single order record by primary key.
    async fn get(&self, order_id: &OrderId) -> Result<Option<OrderRecord>>;

    /// Returns every order record.
    ///
    /// Records that fail to decode are logged and skipped.
    async fn get_all(&self) -> Result<Vec<OrderRecord>>;

    /// Returns the order records owned by a user.
    ///
    /// Records that fail to decode are logged and skipped.
    async fn get_by_user(&self, user_id: &UserId) -> Result<Vec<OrderRecord>>;

    /// Overwrites the status of a stored order and returns the updated record.
    ///
    /// Fails with `NotFound` if the order doesn't exist and with
    /// `ConcurrencyConflict` if `options.expected_version` doesn't match.
    /// A failed update leaves the record unchanged.
    async fn update_status(
        &self,
        order_id: &OrderId,
        change: StatusChange,
        options: UpdateOptions,
    ) -> Result<OrderRecord>;
}

/// Extension trait providing convenience methods for order stores.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Loads an order record, failing with `NotFound` if it doesn't exist.
    async fn get_required(&self, order_id: &OrderId) -> Result<OrderRecord> {
        self.get(order_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(order_id.clone()))
    }

    /// Checks if an order exists.
    async fn exists(&self, order_id: &OrderId) -> Result<bool> {
        Ok(self.get(order_id).await?.is_some())
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}

/// Logs and counts a record that was skipped because it failed to decode.
pub(crate) fn skip_undecodable(key: &str, reason: &dyn std::fmt::Display) {
    tracing::warn!(sk = %key, error = %reason, "skipping undecodable order record");
    metrics::counter!("order_store_decode_failures_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_lookup_parsing() {
        assert_eq!("index".parse::<UserLookup>().unwrap(), UserLookup::Index);
        assert_eq!("Query".parse::<UserLookup>().unwrap(), UserLookup::Index);
        assert_eq!("scan".parse::<UserLookup>().unwrap(), UserLookup::Scan);
        assert!("gsi".parse::<UserLookup>().is_err());
    }

    #[test]
    fn update_options() {
        assert!(UpdateOptions::new().expected_version.is_none());
        assert_eq!(
            UpdateOptions::expect_version(Version::new(4)).expected_version,
            Some(Version::new(4))
        );
    }
}
