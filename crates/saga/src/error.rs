//! Coordinator error types.

use std::time::Duration;

use common::OrderId;
use domain::{OrderStatus, ValidationError};
use emitter::EmitError;
use order_store::StoreError;
use thiserror::Error;

/// Errors that can occur while driving the order lifecycle.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The input was malformed. Never retried.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No order is stored under the given ID.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// Reading from the order store failed.
    #[error("Storage read failed: {0}")]
    StorageRead(#[source] StoreError),

    /// Writing to the order store failed.
    #[error("Storage write failed: {0}")]
    StorageWrite(#[source] StoreError),

    /// An event could not be handed to the transport.
    #[error("Event emission failed: {0}")]
    Emit(#[from] EmitError),

    /// The order's current status does not permit the requested transition.
    #[error("Invalid transition for order {order_id}: {from} -> {to}")]
    InvalidTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// A store or transport call did not finish in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl CoordinatorError {
    /// Returns true if delivering the same input again may succeed.
    ///
    /// A missing order is retryable because an event can overtake the write
    /// that creates its order. An invalid transition is retryable only when
    /// a shipment update arrives before the payment outcome has landed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoordinatorError::Validation(_) => false,
            CoordinatorError::NotFound(_) => true,
            CoordinatorError::StorageRead(_) | CoordinatorError::StorageWrite(_) => true,
            CoordinatorError::Emit(_) => true,
            CoordinatorError::Timeout { .. } => true,
            CoordinatorError::InvalidTransition { from, to, .. } => {
                to.is_shipping_status()
                    && matches!(
                        from,
                        OrderStatus::Created
                            | OrderStatus::PendingPayment
                            | OrderStatus::PaymentRequestFailed
                    )
            }
        }
    }

    pub(crate) fn from_read(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(order_id) => CoordinatorError::NotFound(order_id),
            other => CoordinatorError::StorageRead(other),
        }
    }

    pub(crate) fn from_write(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(order_id) => CoordinatorError::NotFound(order_id),
            other => CoordinatorError::StorageWrite(other),
        }
    }
}

/// Convenience type alias for coordinator results.
pub type Result<T> = std::result::Result<T, CoordinatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid(from: OrderStatus, to: OrderStatus) -> CoordinatorError {
        CoordinatorError::InvalidTransition {
            order_id: OrderId::new("o-1"),
            from,
            to,
        }
    }

    #[test]
    fn retry_classification() {
        assert!(!CoordinatorError::Validation(ValidationError::EmptyCart).is_retryable());
        assert!(CoordinatorError::NotFound(OrderId::new("o-1")).is_retryable());
        assert!(
            CoordinatorError::StorageWrite(StoreError::Unavailable("down".into())).is_retryable()
        );
        assert!(
            CoordinatorError::Timeout {
                operation: "get",
                after: Duration::from_millis(10)
            }
            .is_retryable()
        );
    }

    #[test]
    fn shipment_before_payment_is_retryable() {
        assert!(invalid(OrderStatus::PendingPayment, OrderStatus::Shipped).is_retryable());
        assert!(!invalid(OrderStatus::PaymentFailed, OrderStatus::Shipped).is_retryable());
        assert!(!invalid(OrderStatus::PendingShipment, OrderStatus::PaymentFailed).is_retryable());
    }

    #[test]
    fn store_errors_map_by_direction() {
        assert!(matches!(
            CoordinatorError::from_read(StoreError::NotFound(OrderId::new("o-1"))),
            CoordinatorError::NotFound(_)
        ));
        assert!(matches!(
            CoordinatorError::from_read(StoreError::Unavailable("down".into())),
            CoordinatorError::StorageRead(_)
        ));
        assert!(matches!(
            CoordinatorError::from_write(StoreError::Unavailable("down".into())),
            CoordinatorError::StorageWrite(_)
        ));
    }
}
