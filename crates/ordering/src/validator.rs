//! Advisory stock validation.

use common::ProductId;
use domain::{LineItem, Money, Product};
use futures_util::stream::{FuturesUnordered, StreamExt};
use storage::ProductStore;

use crate::error::{OrderingError, Result};

/// A line item that looked satisfiable when the catalog was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedItem {
    /// Catalog snapshot taken during validation.
    pub product: Product,
    pub quantity: u32,
    /// Price the caller submitted, kept only for tamper logging.
    pub claimed_price: Option<Money>,
}

/// Checks line items against the catalog without reserving anything.
///
/// The result may be stale by the time stock is committed; the committer
/// re-checks atomically.
#[derive(Clone)]
pub struct StockValidator<P> {
    catalog: P,
}

impl<P: ProductStore> StockValidator<P> {
    pub fn new(catalog: P) -> Self {
        Self { catalog }
    }

    /// Looks up every item concurrently and returns the validated items in
    /// submission order.
    ///
    /// Stops at the first missing or short product; lookups still in flight
    /// are dropped.
    #[tracing::instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn validate(&self, items: &[LineItem]) -> Result<Vec<ValidatedItem>> {
        let mut lookups: FuturesUnordered<_> = items
            .iter()
            .enumerate()
            .map(|(index, item)| async move {
                match self.catalog.get_product(&item.product_id).await {
                    Ok(product) => check_item(item, product).map(|validated| (index, validated)),
                    Err(e) => Err(OrderingError::Storage(e)),
                }
            })
            .collect();

        let mut validated: Vec<Option<ValidatedItem>> = vec![None; items.len()];
        while let Some(result) = lookups.next().await {
            let (index, item) = result?;
            validated[index] = Some(item);
        }

        Ok(validated.into_iter().flatten().collect())
    }
}

fn check_item(item: &LineItem, product: Option<Product>) -> Result<ValidatedItem> {
    match product {
        Some(product) if product.has_available(item.quantity) => Ok(ValidatedItem {
            product,
            quantity: item.quantity,
            claimed_price: item.claimed_price,
        }),
        Some(product) => {
            tracing::debug!(
                product_id = %item.product_id,
                requested = item.quantity,
                available = product.available_quantity,
                "advisory stock check failed"
            );
            Err(insufficient(&item.product_id))
        }
        None => {
            tracing::debug!(product_id = %item.product_id, "product not in catalog");
            Err(insufficient(&item.product_id))
        }
    }
}

fn insufficient(product_id: &ProductId) -> OrderingError {
    OrderingError::InsufficientStock {
        product_id: product_id.clone(),
    }
}
