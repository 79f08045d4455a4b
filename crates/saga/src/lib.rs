//! Order lifecycle coordinator.
//!
//! Drives a single linear saga: an order is placed and a payment is
//! requested, the payment outcome moves it to `PaymentFailed` or
//! `PendingShipment` (requesting a shipment), and shipment updates move it
//! to `Shipped` and `Delivered`.
//!
//! Every inbound event may be delivered more than once. The coordinator
//! checks the stored status before each transition and treats an event whose
//! target is already reached as a successful no-op, so redelivery never
//! emits a second downstream request.

pub mod coordinator;
pub mod error;
pub mod services;

pub use coordinator::{
    CoordinatorOptions, OrderCoordinator, SOURCE_ADD_ORDER, SOURCE_SHIP_ORDER, TransitionOutcome,
};
pub use error::{CoordinatorError, Result};
pub use services::{SimulatedPaymentService, SimulatedShippingService};
