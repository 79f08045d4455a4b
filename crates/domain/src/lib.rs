//! Domain layer for the order lifecycle service.
//!
//! This crate provides:
//! - The order document and the payload used to place a new order
//! - The `OrderStatus` state machine for the order → payment → shipment saga
//! - Value objects (money, cart items, addresses, payment cards)
//! - Wire envelopes for the events exchanged with the payment and shipment services

pub mod error;
pub mod events;
pub mod order;

pub use error::ValidationError;
pub use events::{
    CreditCardValidated, Envelope, EventData, InboundEvent, Metadata, PaymentRequested,
    ShipmentRequested, ShipmentStatusUpdate,
};
pub use order::{
    Address, CardDetails, CartItem, Money, NewOrder, Order, OrderStatus, OrderStatusView,
    PaymentStatusView,
};
