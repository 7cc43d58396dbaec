//! Storage layer for order placement.
//!
//! Three stores sit behind async traits so the ordering core can run against
//! memory in tests and PostgreSQL in production:
//! - `ProductStore`: catalog reads and the atomic conditional stock decrement
//! - `OrderRepository`: order persistence and per-user listing
//! - `UserDirectory`: contact data used for order confirmations

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryOrderRepository, InMemoryProductStore, InMemoryUserDirectory};
pub use postgres::{
    PostgresOrderRepository, PostgresProductStore, PostgresUserDirectory, run_migrations,
};
pub use query::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, OrderFilter, OrderQuery, Page};
pub use store::{OrderRepository, ProductStore, ProductStoreExt, StockUpdate, UserContact, UserDirectory};
