//! Atomic inventory commit with compensation.

use std::time::Duration;

use common::ProductId;
use domain::OrderItem;
use storage::{ProductStore, StockUpdate, StoreError};

use crate::error::{OrderingError, Result};

/// Stock decrements applied for one order attempt, in the order they were
/// applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reservation {
    lines: Vec<(ProductId, u32)>,
}

impl Reservation {
    pub fn lines(&self) -> &[(ProductId, u32)] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn record(&mut self, product_id: ProductId, quantity: u32) {
        self.lines.push((product_id, quantity));
    }
}

/// Result of undoing a reservation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompensationReport {
    /// Lines whose units were put back.
    pub restored: usize,
    /// Lines that could not be put back after every retry.
    pub unrecovered: Vec<(ProductId, u32)>,
}

impl CompensationReport {
    pub fn is_complete(&self) -> bool {
        self.unrecovered.is_empty()
    }
}

/// Commits stock for priced items using the store's conditional decrement.
///
/// Items are committed strictly in the order given, so two orders touching
/// the same products always lock them in the same sequence.
#[derive(Clone)]
pub struct InventoryCommitter<P> {
    store: P,
    compensation_attempts: u32,
    retry_backoff: Duration,
}

impl<P: ProductStore> InventoryCommitter<P> {
    /// Creates a committer that retries each compensating restock up to
    /// `compensation_attempts` times, sleeping `retry_backoff * attempt`
    /// between tries.
    pub fn new(store: P, compensation_attempts: u32, retry_backoff: Duration) -> Self {
        Self {
            store,
            compensation_attempts: compensation_attempts.max(1),
            retry_backoff,
        }
    }

    /// Decrements stock for every item or for none of them.
    ///
    /// On the first rejected or failed decrement, everything applied so far
    /// is restored before the error is returned.
    #[tracing::instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn commit(&self, items: &[OrderItem]) -> Result<Reservation> {
        let mut reservation = Reservation::default();

        for item in items {
            let outcome = self
                .store
                .decrement_if_available(&item.product_id, item.quantity)
                .await;

            match outcome {
                Ok(StockUpdate::Applied { remaining }) => {
                    metrics::counter!("inventory_decrements_total").increment(1);
                    tracing::debug!(
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        remaining,
                        "stock decremented"
                    );
                    reservation.record(item.product_id.clone(), item.quantity);
                }
                Ok(StockUpdate::Rejected) => {
                    tracing::info!(
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        "conditional decrement rejected"
                    );
                    self.release(reservation).await;
                    return Err(OrderingError::InsufficientStock {
                        product_id: item.product_id.clone(),
                    });
                }
                Err(e) => {
                    tracing::error!(product_id = %item.product_id, error = %e, "decrement failed");
                    self.release(reservation).await;
                    return Err(OrderingError::Storage(e));
                }
            }
        }

        Ok(reservation)
    }

    /// Restores every line of a reservation, newest first.
    ///
    /// Never fails: lines that cannot be restored are logged, counted and
    /// returned in the report.
    #[tracing::instrument(skip(self, reservation), fields(lines = reservation.lines.len()))]
    pub async fn release(&self, reservation: Reservation) -> CompensationReport {
        let mut report = CompensationReport::default();

        for (product_id, quantity) in reservation.lines.into_iter().rev() {
            match self.restock_with_retry(&product_id, quantity).await {
                Ok(()) => {
                    metrics::counter!("inventory_compensations_total").increment(1);
                    report.restored += 1;
                }
                Err(e) => {
                    metrics::counter!("inventory_compensation_failures_total").increment(1);
                    tracing::error!(
                        %product_id,
                        quantity,
                        error = %e,
                        "compensation failed; stock left decremented"
                    );
                    report.unrecovered.push((product_id, quantity));
                }
            }
        }

        report
    }

    async fn restock_with_retry(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> std::result::Result<(), StoreError> {
        let mut attempt = 1;
        loop {
            match self.store.restock(product_id, quantity).await {
                Ok(()) => return Ok(()),
                // A vanished product will not come back on retry.
                Err(e @ StoreError::ProductNotFound(_)) => return Err(e),
                Err(e) if attempt >= self.compensation_attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(%product_id, attempt, error = %e, "restock failed, retrying");
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, Product};
    use storage::InMemoryProductStore;

    async fn store() -> InMemoryProductStore {
        InMemoryProductStore::with_products([
            Product::new("SKU-001", "Widget", Money::from_cents(1000), 3),
            Product::new("SKU-002", "Gadget", Money::from_cents(2500), 1),
        ])
        .await
    }

    fn committer(store: &InMemoryProductStore) -> InventoryCommitter<InMemoryProductStore> {
        InventoryCommitter::new(store.clone(), 3, Duration::from_millis(1))
    }

    fn line(id: &str, quantity: u32) -> OrderItem {
        OrderItem::new(id, id, Money::from_cents(100), quantity)
    }

    async fn stock(store: &InMemoryProductStore, id: &str) -> Option<u32> {
        store.stock_of(&ProductId::new(id)).await
    }

    #[tokio::test]
    async fn test_commit_decrements_every_item() {
        let store = store().await;
        let reservation = committer(&store)
            .commit(&[line("SKU-001", 2), line("SKU-002", 1)])
            .await
            .unwrap();

        assert_eq!(reservation.lines().len(), 2);
        assert_eq!(stock(&store, "SKU-001").await, Some(1));
        assert_eq!(stock(&store, "SKU-002").await, Some(0));
    }

    #[tokio::test]
    async fn test_rejection_compensates_earlier_items() {
        let store = store().await;
        let err = committer(&store)
            .commit(&[line("SKU-001", 2), line("SKU-002", 2)])
            .await
            .unwrap_err();

        assert!(matches!(err, OrderingError::InsufficientStock { ref product_id } if product_id.as_str() == "SKU-002"));
        assert_eq!(stock(&store, "SKU-001").await, Some(3));
        assert_eq!(stock(&store, "SKU-002").await, Some(1));
    }

    #[tokio::test]
    async fn test_duplicate_lines_share_stock() {
        let store = store().await;
        let err = committer(&store)
            .commit(&[line("SKU-001", 2), line("SKU-001", 2)])
            .await
            .unwrap_err();

        assert!(matches!(err, OrderingError::InsufficientStock { .. }));
        assert_eq!(stock(&store, "SKU-001").await, Some(3));
    }

    #[tokio::test]
    async fn test_store_fault_compensates_and_surfaces_storage_error() {
        let store = store().await;
        let committer = committer(&store);
        let reservation = committer.commit(&[line("SKU-001", 1)]).await.unwrap();
        assert_eq!(stock(&store, "SKU-001").await, Some(2));

        store.set_unavailable(true);
        let err = committer.commit(&[line("SKU-002", 1)]).await.unwrap_err();
        assert!(matches!(err, OrderingError::Storage(_)));

        store.set_unavailable(false);
        let report = committer.release(reservation).await;
        assert!(report.is_complete());
        assert_eq!(stock(&store, "SKU-001").await, Some(3));
    }

    #[tokio::test]
    async fn test_release_retries_transient_failures() {
        let store = store().await;
        let committer = committer(&store);
        let reservation = committer.commit(&[line("SKU-001", 3)]).await.unwrap();

        store.fail_next_restocks(2);
        let report = committer.release(reservation).await;

        assert_eq!(report.restored, 1);
        assert!(report.is_complete());
        assert_eq!(stock(&store, "SKU-001").await, Some(3));
    }

    #[tokio::test]
    async fn test_release_gives_up_after_attempts() {
        let store = store().await;
        let committer = committer(&store);
        let reservation = committer.commit(&[line("SKU-001", 1)]).await.unwrap();

        store.fail_next_restocks(10);
        let report = committer.release(reservation).await;

        assert_eq!(report.restored, 0);
        assert_eq!(
            report.unrecovered,
            vec![(ProductId::new("SKU-001"), 1)]
        );
    }
}
