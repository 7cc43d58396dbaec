//! Order placement orchestrator.

use std::time::{Duration, Instant};

use common::UserId;
use domain::{NewOrder, Order, OrderRequest};
use storage::{OrderQuery, OrderRepository, Page, ProductStore, UserDirectory};
use tracing::Instrument;

use crate::committer::InventoryCommitter;
use crate::error::{OrderingError, Result};
use crate::notification::{NotificationConfig, NotificationDispatcher, Notifier};
use crate::pricing;
use crate::validator::StockValidator;

/// Tuning for the placement path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementConfig {
    /// Budget for the advisory stock check.
    pub validation_timeout: Duration,
    /// Tries per compensating restock.
    pub compensation_attempts: u32,
    /// Base delay between compensation retries.
    pub compensation_backoff: Duration,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            validation_timeout: Duration::from_secs(5),
            compensation_attempts: 3,
            compensation_backoff: Duration::from_millis(50),
        }
    }
}

/// Places orders against a shared inventory.
///
/// Validation and pricing may be cancelled at any point since nothing is
/// reserved yet. Commit, persistence, compensation and the confirmation
/// hand-off run on a spawned task, so a dropped request never leaves stock
/// decremented without an order, nor a stored order without a confirmation.
pub struct OrderPlacement<P, R, U, N>
where
    P: ProductStore,
    R: OrderRepository,
    U: UserDirectory,
    N: Notifier,
{
    validator: StockValidator<P>,
    committer: InventoryCommitter<P>,
    orders: R,
    notifications: NotificationDispatcher<U, N>,
    config: PlacementConfig,
}

impl<P, R, U, N> OrderPlacement<P, R, U, N>
where
    P: ProductStore + Clone + 'static,
    R: OrderRepository + Clone + 'static,
    U: UserDirectory + Clone + 'static,
    N: Notifier + Clone + 'static,
{
    /// Creates a new placement service.
    pub fn new(
        products: P,
        orders: R,
        directory: U,
        notifier: N,
        config: PlacementConfig,
        notification: NotificationConfig,
    ) -> Self {
        Self {
            validator: StockValidator::new(products.clone()),
            committer: InventoryCommitter::new(
                products,
                config.compensation_attempts,
                config.compensation_backoff,
            ),
            orders,
            notifications: NotificationDispatcher::new(directory, notifier, notification),
            config,
        }
    }

    /// Returns the order repository.
    pub fn orders(&self) -> &R {
        &self.orders
    }

    /// Places an order.
    ///
    /// On success the order is stored with status `pending`, stock for every
    /// item has been decremented, and a confirmation has been queued.
    #[tracing::instrument(
        skip(self, request),
        fields(created_by = %request.created_by, item_count = request.items.len())
    )]
    pub async fn place(&self, request: OrderRequest) -> Result<Order> {
        let started = Instant::now();
        let result = self.place_inner(request).await;
        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    grand_total = %order.grand_total,
                    "order placed"
                );
            }
            Err(e) => {
                metrics::counter!("orders_rejected_total", "reason" => e.kind()).increment(1);
                if e.is_client_error() {
                    tracing::info!(error = %e, "order rejected");
                } else {
                    tracing::error!(error = %e, "order placement failed");
                }
            }
        }

        result
    }

    async fn place_inner(&self, request: OrderRequest) -> Result<Order> {
        let timeout = self.config.validation_timeout;
        let validated = tokio::time::timeout(timeout, self.validator.validate(&request.items))
            .await
            .map_err(|_| OrderingError::Timeout(timeout))??;

        let new_order = pricing::price(validated)?.into_new_order(request.created_by);

        let committer = self.committer.clone();
        let orders = self.orders.clone();
        let notifications = self.notifications.clone();
        tokio::spawn(
            commit_and_persist(committer, orders, notifications, new_order)
                .instrument(tracing::Span::current()),
        )
        .await
        .map_err(|e| OrderingError::Internal(e.to_string()))?
    }

    /// Lists the caller's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, user: UserId, query: &OrderQuery) -> Result<Page<Order>> {
        Ok(self.orders.list_for_user(user, query).await?)
    }
}

/// Commits stock and stores the order, then queues its confirmation.
/// Releases the stock if the write fails.
async fn commit_and_persist<P, R, U, N>(
    committer: InventoryCommitter<P>,
    orders: R,
    notifications: NotificationDispatcher<U, N>,
    new_order: NewOrder,
) -> Result<Order>
where
    P: ProductStore,
    R: OrderRepository,
    U: UserDirectory + Clone + 'static,
    N: Notifier + Clone + 'static,
{
    let reservation = committer.commit(&new_order.items).await?;

    match orders.insert(new_order).await {
        Ok(order) => {
            notifications.dispatch(order.clone());
            Ok(order)
        }
        Err(e) => {
            tracing::error!(error = %e, "order insert failed, releasing stock");
            let report = committer.release(reservation).await;
            if !report.is_complete() {
                tracing::error!(
                    unrecovered = report.unrecovered.len(),
                    "stock could not be fully restored after failed insert"
                );
            }
            Err(OrderingError::PersistenceFailure(e.to_string()))
        }
    }
}
