pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use record::{ORDER_ENTITY, OrderRecord, StatusChange, Version};
pub use store::{OrderStore, OrderStoreExt, UpdateOptions, UserLookup};
