//! Simulated downstream services.
//!
//! Stand-ins for the payment and shipment services, answering requests with
//! the events those services would publish. Used for local runs and tests.

pub mod payment;
pub mod shipping;

pub use payment::SimulatedPaymentService;
pub use shipping::SimulatedShippingService;
