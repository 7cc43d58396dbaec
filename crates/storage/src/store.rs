use async_trait::async_trait;
use common::{OrderId, ProductId, UserId};
use domain::{NewOrder, Order, Product};
use serde::{Deserialize, Serialize};

use crate::{OrderQuery, Page, Result};

/// Outcome of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockUpdate {
    /// The decrement was applied; `remaining` is the stock left afterwards.
    Applied { remaining: u32 },
    /// The product is missing or has fewer units than requested. Nothing changed.
    Rejected,
}

impl StockUpdate {
    pub fn is_applied(&self) -> bool {
        matches!(self, StockUpdate::Applied { .. })
    }
}

/// Catalog access needed by order placement.
///
/// Implementations must make `decrement_if_available` a single atomic
/// compare-and-decrement per product: two concurrent callers can never both
/// take the last unit.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Reads the current snapshot of a product.
    ///
    /// Returns None if the product doesn't exist.
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>>;

    /// Decrements `available_quantity` by `quantity` only if at least
    /// `quantity` units are available at the moment of the write.
    async fn decrement_if_available(&self, id: &ProductId, quantity: u32) -> Result<StockUpdate>;

    /// Adds `quantity` units back. Used to compensate a decrement.
    async fn restock(&self, id: &ProductId, quantity: u32) -> Result<()>;
}

/// Extension trait providing convenience methods for product stores.
#[async_trait]
pub trait ProductStoreExt: ProductStore {
    /// Returns the available quantity of a product, if it exists.
    async fn available_quantity(&self, id: &ProductId) -> Result<Option<u32>> {
        Ok(self.get_product(id).await?.map(|p| p.available_quantity))
    }
}

impl<T: ProductStore + ?Sized> ProductStoreExt for T {}

/// Persistence for order records.
///
/// Storing an order has no side effects beyond the write itself.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores a new order with status `pending`, assigning its ID and
    /// timestamps, and returns the stored record.
    async fn insert(&self, order: NewOrder) -> Result<Order>;

    /// Loads an order by ID.
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists the orders created by `user`, newest first.
    async fn list_for_user(&self, user: UserId, query: &OrderQuery) -> Result<Page<Order>>;
}

/// Contact and profile data of the user who placed an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContact {
    pub user_id: UserId,
    pub full_name: String,
    pub email: String,
}

/// Read-only lookup of user contact data.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_contact(&self, user: UserId) -> Result<Option<UserContact>>;
}
