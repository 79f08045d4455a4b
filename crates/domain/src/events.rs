//! Event contracts exchanged with the payment and shipment services.
//!
//! Every message is a JSON envelope `{metadata, data}`. The service emits
//! [`PaymentRequested`] and [`ShipmentRequested`] and consumes
//! [`CreditCardValidated`] and [`ShipmentStatusUpdate`].

use common::OrderId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::order::{CardDetails, OrderStatus};

/// Domain name stamped on every event this service emits.
pub const ORDER_DOMAIN: &str = "Order";

/// Status stamped on every event this service emits.
pub const DEFAULT_SUCCESS_STATUS: &str = "success";

/// Envelope types under which shipment status updates arrive.
pub const SHIPMENT_STATUS_EVENT_TYPES: [&str; 3] =
    ["SentShipment", "ShipmentSent", "ShipmentStatusUpdate"];

/// Payload of an event envelope.
pub trait EventData: Serialize + DeserializeOwned {
    /// Value of `metadata.type` for this event.
    const EVENT_TYPE: &'static str;
}

/// Routing information carried by every envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Where the event came from, e.g. "Order" or "Payment".
    #[serde(default)]
    pub domain: String,
    /// Function that produced the event, e.g. "AddOrder".
    #[serde(default)]
    pub source: String,
    /// Event type, e.g. "CreditCardValidated".
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub status: String,
}

/// A domain event with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub metadata: Metadata,
    pub data: T,
}

impl<T: EventData> Envelope<T> {
    /// Wraps an event emitted by the order domain.
    pub fn new(source: impl Into<String>, data: T) -> Self {
        Self {
            metadata: Metadata {
                domain: ORDER_DOMAIN.to_string(),
                source: source.into(),
                event_type: T::EVENT_TYPE.to_string(),
                status: DEFAULT_SUCCESS_STATUS.to_string(),
            },
            data,
        }
    }

    /// Encodes the envelope as JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decodes an envelope from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Asks the payment service to charge a card for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequested {
    #[serde(rename = "orderID")]
    pub order_id: OrderId,
    pub card: CardDetails,
    pub total: String,
}

impl EventData for PaymentRequested {
    const EVENT_TYPE: &'static str = "PaymentRequested";
}

/// Asks the shipment service to ship an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRequested {
    #[serde(rename = "orderID")]
    pub order_id: OrderId,
    pub delivery: String,
}

impl EventData for ShipmentRequested {
    const EVENT_TYPE: &'static str = "ShipmentRequested";
}

/// Outcome of a card validation, sent by the payment service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCardValidated {
    #[serde(rename = "orderID")]
    pub order_id: OrderId,
    pub success: bool,
    /// HTTP-style status code reported by the payment service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "transactionID", default)]
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

impl CreditCardValidated {
    /// Status the order moves to when this outcome is applied.
    pub fn target_status(&self) -> OrderStatus {
        if self.success {
            OrderStatus::PendingShipment
        } else {
            OrderStatus::PaymentFailed
        }
    }
}

impl EventData for CreditCardValidated {
    const EVENT_TYPE: &'static str = "CreditCardValidated";
}

/// Shipment progress reported by the shipment service. May arrive several
/// times for the same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentStatusUpdate {
    #[serde(rename = "orderNumber")]
    pub order_number: OrderId,
    pub status: String,
    #[serde(rename = "trackingNumber", default)]
    pub tracking_number: String,
}

impl ShipmentStatusUpdate {
    /// Parses the reported status; only shipping statuses are accepted.
    pub fn target_status(&self) -> Result<OrderStatus, ValidationError> {
        let status: OrderStatus = self.status.parse()?;
        if !status.is_shipping_status() {
            return Err(ValidationError::NotAShipmentStatus(status.to_string()));
        }
        Ok(status)
    }
}

impl EventData for ShipmentStatusUpdate {
    const EVENT_TYPE: &'static str = "SentShipment";
}

/// Any message this service consumes, decoded by `metadata.type`.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    PaymentValidated(Envelope<CreditCardValidated>),
    ShipmentStatus(Envelope<ShipmentStatusUpdate>),
}

impl InboundEvent {
    /// Decodes a raw message body.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
        #[derive(Deserialize)]
        struct Head {
            metadata: Metadata,
        }

        let head: Head = serde_json::from_slice(bytes)?;
        let event_type = head.metadata.event_type.as_str();

        if event_type == CreditCardValidated::EVENT_TYPE {
            Ok(InboundEvent::PaymentValidated(Envelope::from_slice(bytes)?))
        } else if SHIPMENT_STATUS_EVENT_TYPES.contains(&event_type) {
            Ok(InboundEvent::ShipmentStatus(Envelope::from_slice(bytes)?))
        } else {
            Err(ValidationError::UnsupportedEventType(event_type.to_string()))
        }
    }

    /// The order the event refers to.
    pub fn order_id(&self) -> &OrderId {
        match self {
            InboundEvent::PaymentValidated(e) => &e.data.order_id,
            InboundEvent::ShipmentStatus(e) => &e.data.order_number,
        }
    }

    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            InboundEvent::PaymentValidated(_) => CreditCardValidated::EVENT_TYPE,
            InboundEvent::ShipmentStatus(_) => ShipmentStatusUpdate::EVENT_TYPE,
        }
    }
}
