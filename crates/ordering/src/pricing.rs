//! Pricing from catalog snapshots.

use common::UserId;
use domain::{Money, NewOrder, OrderItem, ValidationError};

use crate::error::Result;
use crate::validator::ValidatedItem;

/// Items priced from the catalog plus their grand total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub items: Vec<OrderItem>,
    pub grand_total: Money,
}

impl PricedOrder {
    /// Attaches the creator, producing an order ready to be stored.
    pub fn into_new_order(self, created_by: UserId) -> NewOrder {
        NewOrder {
            items: self.items,
            grand_total: self.grand_total,
            created_by,
        }
    }
}

/// Prices validated items using the catalog snapshot only.
///
/// Prices submitted by the caller are ignored. Fails if a line total or the
/// grand total overflows.
pub fn price(validated: Vec<ValidatedItem>) -> Result<PricedOrder> {
    let items: Vec<OrderItem> = validated
        .into_iter()
        .map(|v| {
            if let Some(claimed) = v.claimed_price
                && claimed != v.product.price
            {
                tracing::debug!(
                    product_id = %v.product.id,
                    claimed = %claimed,
                    catalog = %v.product.price,
                    "ignoring caller-supplied price"
                );
            }
            OrderItem::new(v.product.id, v.product.name, v.product.price, v.quantity)
        })
        .collect();

    let mut grand_total = Money::zero();
    for item in &items {
        grand_total = item
            .checked_line_total()
            .and_then(|line| grand_total.checked_add(line))
            .ok_or_else(|| ValidationError::AmountOverflow {
                product_id: item.product_id.clone(),
            })?;
    }

    Ok(PricedOrder { items, grand_total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrderingError;
    use domain::Product;

    fn validated(id: &str, price_cents: i64, quantity: u32, claimed: Option<i64>) -> ValidatedItem {
        ValidatedItem {
            product: Product::new(id, format!("{id} name"), Money::from_cents(price_cents), 10),
            quantity,
            claimed_price: claimed.map(Money::from_cents),
        }
    }

    #[test]
    fn test_grand_total_is_sum_of_lines() {
        let priced = price(vec![
            validated("SKU-001", 1000, 2, None),
            validated("SKU-002", 333, 3, None),
        ])
        .unwrap();
        assert_eq!(priced.grand_total.cents(), 2999);
        assert_eq!(priced.items[1].unit_price.cents(), 333);
    }

    #[test]
    fn test_claimed_price_is_ignored() {
        let priced = price(vec![validated("SKU-001", 1000, 2, Some(1))]).unwrap();
        assert_eq!(priced.items[0].unit_price.cents(), 1000);
        assert_eq!(priced.grand_total.cents(), 2000);
    }

    #[test]
    fn test_names_are_catalog_snapshots() {
        let priced = price(vec![validated("SKU-009", 50, 1, None)]).unwrap();
        assert_eq!(priced.items[0].name, "SKU-009 name");
    }

    #[test]
    fn test_into_new_order_keeps_total() {
        let user = UserId::new();
        let order = price(vec![validated("SKU-001", 1000, 2, None)])
            .unwrap()
            .into_new_order(user);
        assert_eq!(order.created_by, user);
        assert_eq!(order.grand_total.cents(), 2000);
    }

    #[test]
    fn test_overflowing_total_is_rejected() {
        let err = price(vec![
            validated("SKU-001", 1000, 1, None),
            validated("SKU-MAX", i64::MAX / 2 + 1, 2, None),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            OrderingError::Validation(ValidationError::AmountOverflow { ref product_id })
                if product_id.as_str() == "SKU-MAX"
        ));

        let err = price(vec![
            validated("SKU-A", i64::MAX, 1, None),
            validated("SKU-B", 1, 1, None),
        ])
        .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }
}
