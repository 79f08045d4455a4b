//! Identifier types shared by every crate of the order lifecycle service.

mod types;

pub use types::{OrderId, UserId};
