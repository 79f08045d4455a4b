//! Domain error types.

use thiserror::Error;

/// Malformed or incomplete input. Never retried; reported back to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The order has no owner.
    #[error("User ID is required")]
    MissingUserId,

    /// An inbound event did not name the order it refers to.
    #[error("Order ID is required")]
    MissingOrderId,

    /// The cart is empty.
    #[error("Cart must contain at least one item")]
    EmptyCart,

    /// A monetary field is not a non-negative decimal with at most two fraction digits.
    #[error("Invalid amount for {field}: {value:?}")]
    InvalidAmount { field: &'static str, value: String },

    /// A cart line item is malformed.
    #[error("Invalid cart item at position {index}: {reason}")]
    InvalidCartItem { index: usize, reason: String },

    /// The payment card is malformed.
    #[error("Invalid card: {0}")]
    InvalidCard(String),

    /// A status string does not name a known order status.
    #[error("Unknown order status: {0:?}")]
    UnknownStatus(String),

    /// The status is known but not one a shipment update may set.
    #[error("Status {0} cannot be set by a shipment update")]
    NotAShipmentStatus(String),

    /// The message envelope names an event type this service does not consume.
    #[error("Unsupported event type: {0:?}")]
    UnsupportedEventType(String),

    /// The payload could not be decoded.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        ValidationError::MalformedPayload(e.to_string())
    }
}
