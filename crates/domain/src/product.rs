//! Catalog product snapshot.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::order::Money;

/// A product as seen by order placement: price and stock at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price in cents.
    pub price: Money,
    pub available_quantity: u32,
}

impl Product {
    /// Creates a new product snapshot.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Money,
        available_quantity: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            available_quantity,
        }
    }

    /// Returns true if at least `quantity` units are available.
    pub fn has_available(&self, quantity: u32) -> bool {
        self.available_quantity >= quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_available_boundaries() {
        let product = Product::new("SKU-001", "Widget", Money::from_cents(1000), 3);
        assert!(product.has_available(0));
        assert!(product.has_available(3));
        assert!(!product.has_available(4));
    }

    #[test]
    fn test_out_of_stock_product() {
        let product = Product::new("SKU-002", "Gadget", Money::from_cents(500), 0);
        assert!(!product.has_available(1));
    }
}
