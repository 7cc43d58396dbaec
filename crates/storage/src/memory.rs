use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, ProductId, UserId};
use domain::{NewOrder, Order, Product};
use tokio::sync::{Mutex, RwLock};

use crate::{
    OrderQuery, Page, Result, StoreError,
    store::{OrderRepository, ProductStore, StockUpdate, UserContact, UserDirectory},
};

/// In-memory product store.
///
/// Every product sits behind its own mutex, so a conditional decrement is
/// atomic per product while unrelated products never contend. The outer map
/// lock is only held long enough to find the product.
#[derive(Clone, Default)]
pub struct InMemoryProductStore {
    products: Arc<RwLock<HashMap<ProductId, Arc<Mutex<Product>>>>>,
    lookups: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
    restock_failures: Arc<AtomicUsize>,
}

impl InMemoryProductStore {
    /// Creates a new empty product store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given products.
    pub async fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        for product in products {
            store.upsert(product).await;
        }
        store
    }

    /// Builds a store from a JSON array of products (prices in cents).
    pub async fn from_json(seed: &str) -> Result<Self> {
        let products: Vec<Product> = serde_json::from_str(seed)?;
        Ok(Self::with_products(products).await)
    }

    /// Inserts or replaces a product.
    pub async fn upsert(&self, product: Product) {
        let mut products = self.products.write().await;
        products.insert(product.id.clone(), Arc::new(Mutex::new(product)));
    }

    /// Returns the current available quantity of a product.
    pub async fn stock_of(&self, id: &ProductId) -> Option<u32> {
        let entry = self.products.read().await.get(id).cloned()?;
        let product = entry.lock().await;
        Some(product.available_quantity)
    }

    /// Returns how many catalog reads have been served.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Makes every read and decrement fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes the next `count` restock calls fail with `Unavailable`.
    pub fn fail_next_restocks(&self, count: usize) {
        self.restock_failures.store(count, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("product store offline".to_string()));
        }
        Ok(())
    }

    async fn entry(&self, id: &ProductId) -> Option<Arc<Mutex<Product>>> {
        self.products.read().await.get(id).cloned()
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    #[tracing::instrument(skip(self, id), fields(product_id = %id))]
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>> {
        self.check_available()?;
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let Some(entry) = self.entry(id).await else {
            return Ok(None);
        };
        let product = entry.lock().await;
        Ok(Some(product.clone()))
    }

    #[tracing::instrument(skip(self, id), fields(product_id = %id))]
    async fn decrement_if_available(&self, id: &ProductId, quantity: u32) -> Result<StockUpdate> {
        self.check_available()?;

        let Some(entry) = self.entry(id).await else {
            metrics::counter!("inventory_decrement_rejections_total").increment(1);
            return Ok(StockUpdate::Rejected);
        };
        let mut product = entry.lock().await;
        if !product.has_available(quantity) {
            metrics::counter!("inventory_decrement_rejections_total").increment(1);
            return Ok(StockUpdate::Rejected);
        }
        product.available_quantity -= quantity;
        Ok(StockUpdate::Applied {
            remaining: product.available_quantity,
        })
    }

    #[tracing::instrument(skip(self, id), fields(product_id = %id))]
    async fn restock(&self, id: &ProductId, quantity: u32) -> Result<()> {
        let pending_failures = self.restock_failures.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.restock_failures
                .store(pending_failures - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("restock rejected".to_string()));
        }

        let entry = self
            .entry(id)
            .await
            .ok_or_else(|| StoreError::ProductNotFound(id.clone()))?;
        let mut product = entry.lock().await;
        product.available_quantity = product.available_quantity.saturating_add(quantity);
        Ok(())
    }
}

/// In-memory order repository for testing and local runs.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<Vec<Order>>>,
    fail_on_insert: Arc<AtomicBool>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures every subsequent insert to fail.
    pub fn set_fail_on_insert(&self, fail: bool) {
        self.fail_on_insert.store(fail, Ordering::SeqCst);
    }

    /// Returns the total number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    #[tracing::instrument(skip(self, order), fields(created_by = %order.created_by))]
    async fn insert(&self, order: NewOrder) -> Result<Order> {
        if self.fail_on_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("order store rejected write".to_string()));
        }

        let order = order.into_order(OrderId::new(), Utc::now());
        self.orders.write().await.push(order.clone());
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.iter().find(|o| o.id == id).cloned())
    }

    #[tracing::instrument(skip(self, query), fields(page = query.page, limit = query.limit))]
    async fn list_for_user(&self, user: UserId, query: &OrderQuery) -> Result<Page<Order>> {
        let orders = self.orders.read().await;

        // Newest insert first, so equal timestamps keep that order under the stable sort.
        let mut matching: Vec<Order> = orders
            .iter()
            .rev()
            .filter(|o| o.created_by == user && query.matches(o))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .collect();

        Ok(Page {
            items,
            page: query.page,
            limit: query.limit,
            total,
        })
    }
}

/// In-memory user directory.
#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<UserId, UserContact>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user's contact data.
    pub async fn insert(&self, contact: UserContact) {
        self.users.write().await.insert(contact.user_id, contact);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    #[tracing::instrument(skip(self))]
    async fn find_contact(&self, user: UserId) -> Result<Option<UserContact>> {
        Ok(self.users.read().await.get(&user).cloned())
    }
}
