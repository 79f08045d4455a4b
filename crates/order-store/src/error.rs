use common::OrderId;
use thiserror::Error;

use crate::Version;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No order is stored under the given ID.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// An order with the given ID already exists.
    #[error("Order already exists: {0}")]
    AlreadyExists(OrderId),

    /// The record changed since it was read.
    #[error(
        "Concurrency conflict for order {order_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: Version,
        actual: Version,
    },

    /// A stored record could not be decoded.
    #[error("Corrupt record for order {order_id}: {reason}")]
    Corrupt { order_id: OrderId, reason: String },

    /// The backend is unreachable or refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
