//! Order requests as submitted by a caller.

use common::{ProductId, UserId};

use super::Money;
use crate::error::ValidationError;

/// Smallest quantity a single line item may request.
pub const MIN_ITEM_QUANTITY: i64 = 1;

/// Largest quantity a single line item may request.
pub const MAX_ITEM_QUANTITY: i64 = 5;

/// One product/quantity pair of an order request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price the caller claims for the product. Never used for pricing.
    pub claimed_price: Option<Money>,
}

impl LineItem {
    /// Validates a raw product id and quantity.
    ///
    /// `index` is the item's position in the request, used in error messages.
    pub fn parse(
        index: usize,
        product_id: impl Into<ProductId>,
        quantity: i64,
    ) -> Result<Self, ValidationError> {
        let product_id = product_id.into();
        if product_id.is_blank() {
            return Err(ValidationError::BlankProductId { index });
        }
        if !(MIN_ITEM_QUANTITY..=MAX_ITEM_QUANTITY).contains(&quantity) {
            return Err(ValidationError::QuantityOutOfRange {
                product_id,
                quantity,
                min: MIN_ITEM_QUANTITY,
                max: MAX_ITEM_QUANTITY,
            });
        }
        Ok(Self {
            product_id,
            // Range-checked above.
            quantity: quantity as u32,
            claimed_price: None,
        })
    }

    /// Records the price the caller submitted alongside the item.
    pub fn with_claimed_price(mut self, price: Option<Money>) -> Self {
        self.claimed_price = price;
        self
    }
}

/// A shape-validated request to place an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub created_by: UserId,
    pub items: Vec<LineItem>,
}

impl OrderRequest {
    /// Builds a request, rejecting an empty item list.
    pub fn new(created_by: UserId, items: Vec<LineItem>) -> Result<Self, ValidationError> {
        if items.is_empty() {
            return Err(ValidationError::NoItems);
        }
        Ok(Self { created_by, items })
    }

    /// Total units requested across all items.
    pub fn total_units(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_bounds_inclusive() {
        assert!(LineItem::parse(0, "SKU-001", 1).is_ok());
        assert!(LineItem::parse(0, "SKU-001", 5).is_ok());
    }

    #[test]
    fn test_quantity_below_minimum_rejected() {
        for quantity in [0, -1, i64::MIN] {
            let err = LineItem::parse(0, "SKU-001", quantity).unwrap_err();
            assert!(matches!(err, ValidationError::QuantityOutOfRange { .. }));
        }
    }

    #[test]
    fn test_quantity_above_maximum_rejected() {
        let err = LineItem::parse(2, "SKU-001", 6).unwrap_err();
        assert_eq!(
            err,
            ValidationError::QuantityOutOfRange {
                product_id: ProductId::new("SKU-001"),
                quantity: 6,
                min: 1,
                max: 5,
            }
        );
    }

    #[test]
    fn test_blank_product_id_rejected() {
        let err = LineItem::parse(3, "  ", 1).unwrap_err();
        assert_eq!(err, ValidationError::BlankProductId { index: 3 });
    }

    #[test]
    fn test_empty_request_rejected() {
        let err = OrderRequest::new(UserId::new(), vec![]).unwrap_err();
        assert_eq!(err, ValidationError::NoItems);
    }

    #[test]
    fn test_total_units() {
        let items = vec![
            LineItem::parse(0, "SKU-001", 2).unwrap(),
            LineItem::parse(1, "SKU-002", 3).unwrap(),
        ];
        let request = OrderRequest::new(UserId::new(), items).unwrap();
        assert_eq!(request.total_units(), 5);
    }
}
