//! Domain layer for order placement.
//!
//! This crate provides the core domain types:
//! - `Money` in integer cents
//! - `Product` catalog snapshot
//! - `Order` aggregate root with its embedded `OrderItem`s
//! - `OrderRequest` / `LineItem` with shape and quantity validation

pub mod error;
pub mod order;
pub mod product;

pub use common::{OrderId, ProductId, UserId};
pub use error::ValidationError;
pub use order::{
    LineItem, MAX_ITEM_QUANTITY, MIN_ITEM_QUANTITY, Money, NewOrder, Order, OrderItem,
    OrderRequest, OrderStatus, ParseStatusError,
};
pub use product::Product;
