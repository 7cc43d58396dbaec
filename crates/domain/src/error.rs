//! Domain error types.

use common::ProductId;
use thiserror::Error;

/// Reasons an order request is rejected before any stock is looked at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The request carries no line items.
    #[error("Order has no items")]
    NoItems,

    /// A line item has an empty product identifier.
    #[error("Item {index} has no product id")]
    BlankProductId { index: usize },

    /// A line item quantity lies outside the allowed range.
    #[error("Invalid quantity for {product_id}: {quantity} (must be between {min} and {max})")]
    QuantityOutOfRange {
        product_id: ProductId,
        quantity: i64,
        min: i64,
        max: i64,
    },

    /// The body names a creator other than the authenticated caller.
    #[error("createdBy does not match the authenticated caller")]
    CreatorMismatch,

    /// A line total or the grand total does not fit in the money range.
    #[error("Order total overflows for product {product_id}")]
    AmountOverflow { product_id: ProductId },

    /// The request body could not be decoded.
    #[error("Malformed request: {0}")]
    Malformed(String),
}
