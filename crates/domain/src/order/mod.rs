//! Order document, lifecycle status and related value objects.

mod model;
mod status;
mod value_objects;

pub use model::{NewOrder, Order, OrderStatusView, PaymentStatusView};
pub use status::OrderStatus;
pub use value_objects::{Address, CardDetails, CartItem, Money};
