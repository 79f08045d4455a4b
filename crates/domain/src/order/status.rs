//! Order lifecycle state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Created ──► PendingPayment ──┬──► PaymentFailed
///                 ▲   │        │
///                 │   ▼        └──► PendingShipment ──► Shipped ──► Delivered
///          PaymentRequestFailed ──────────▲  │                          ▲
///                                            └──────────────────────────┘
/// ```
///
/// `PaymentRequestFailed` marks an order whose payment request could not be
/// handed to the transport. It sits beside `PendingPayment` and accepts the
/// same payment outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order accepted but not yet durably recorded.
    #[default]
    Created,

    /// Order recorded, payment requested, awaiting the card validation outcome.
    PendingPayment,

    /// Order recorded but the payment request could not be sent.
    PaymentRequestFailed,

    /// The card was declined (terminal state).
    PaymentFailed,

    /// Payment succeeded, shipment requested.
    PendingShipment,

    /// The shipment service reported the parcel as shipped.
    Shipped,

    /// The parcel was delivered (terminal state).
    Delivered,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Created,
        OrderStatus::PendingPayment,
        OrderStatus::PaymentRequestFailed,
        OrderStatus::PaymentFailed,
        OrderStatus::PendingShipment,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ];

    /// Returns true if a direct transition from `self` to `target` is allowed.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (Created, PendingPayment)
                | (PendingPayment, PaymentRequestFailed | PaymentFailed | PendingShipment)
                | (PaymentRequestFailed, PendingPayment | PaymentFailed | PendingShipment)
                | (PendingShipment, Shipped | Delivered)
                | (Shipped, Delivered)
        )
    }

    /// Returns true if the order already is at `target` or has moved past it.
    ///
    /// Used to absorb duplicate deliveries: an event whose target has been
    /// reached or superseded is a no-op. The failed-payment branch never
    /// supersedes the shipping branch and vice versa.
    pub fn has_reached(&self, target: OrderStatus) -> bool {
        if *self == target {
            return true;
        }
        match (self, target) {
            (OrderStatus::PaymentFailed, _) => target.stage() < 2,
            (_, OrderStatus::PaymentFailed) => false,
            _ => self.stage() > target.stage(),
        }
    }

    /// Returns true if a shipment status update may set this status.
    pub fn is_shipping_status(&self) -> bool {
        matches!(self, OrderStatus::Shipped | OrderStatus::Delivered)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::PaymentFailed | OrderStatus::Delivered)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "Created",
            OrderStatus::PendingPayment => "PendingPayment",
            OrderStatus::PaymentRequestFailed => "PaymentRequestFailed",
            OrderStatus::PaymentFailed => "PaymentFailed",
            OrderStatus::PendingShipment => "PendingShipment",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
        }
    }

    /// Position along the lifecycle path. Both payment outcomes share stage 2.
    fn stage(&self) -> u8 {
        match self {
            OrderStatus::Created => 0,
            OrderStatus::PendingPayment | OrderStatus::PaymentRequestFailed => 1,
            OrderStatus::PaymentFailed | OrderStatus::PendingShipment => 2,
            OrderStatus::Shipped => 3,
            OrderStatus::Delivered => 4,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parses status names leniently: case, spaces, `_` and `-` are ignored, so
/// `"Pending Payment"`, `"pending_payment"` and `"PendingPayment"` are equal.
/// `"sent"` is accepted as a synonym for `Shipped`.
impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        let status = match normalized.as_str() {
            "created" => OrderStatus::Created,
            "pendingpayment" => OrderStatus::PendingPayment,
            "paymentrequestfailed" => OrderStatus::PaymentRequestFailed,
            "paymentfailed" => OrderStatus::PaymentFailed,
            "pendingshipment" => OrderStatus::PendingShipment,
            "shipped" | "sent" => OrderStatus::Shipped,
            "delivered" => OrderStatus::Delivered,
            _ => return Err(ValidationError::UnknownStatus(s.to_string())),
        };
        Ok(status)
    }
}
