//! Order aggregate root.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::{Money, OrderItem, OrderStatus};

/// An order that has been priced and whose stock has been committed, but
/// which has not been stored yet. Identity and timestamps are assigned by the
/// repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub items: Vec<OrderItem>,
    pub grand_total: Money,
    pub created_by: UserId,
}

impl NewOrder {
    /// Builds a new order, deriving the grand total from the items.
    pub fn new(created_by: UserId, items: Vec<OrderItem>) -> Self {
        let grand_total = items.iter().map(OrderItem::line_total).sum();
        Self {
            items,
            grand_total,
            created_by,
        }
    }

    /// Assigns identity and timestamps, producing the stored record.
    pub fn into_order(self, id: OrderId, now: DateTime<Utc>) -> Order {
        Order {
            id,
            items: self.items,
            grand_total: self.grand_total,
            created_by: self.created_by,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<OrderItem>,
    pub grand_total: Money,
    pub created_by: UserId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Number of distinct lines in the order.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the stored total matches its items.
    pub fn total_is_consistent(&self) -> bool {
        self.items.iter().map(OrderItem::line_total).sum::<Money>() == self.grand_total
    }
}
