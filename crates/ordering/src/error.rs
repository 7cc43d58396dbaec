//! Order placement error types.

use std::time::Duration;

use common::ProductId;
use domain::ValidationError;
use storage::StoreError;
use thiserror::Error;

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum OrderingError {
    /// The request was malformed or a quantity was out of range.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A product is missing or has fewer units than requested.
    #[error("Insufficient stock for product {product_id}")]
    InsufficientStock { product_id: ProductId },

    /// Stock was committed but the order could not be stored. All
    /// decrements were compensated before this was returned.
    #[error("Order could not be persisted: {0}")]
    PersistenceFailure(String),

    /// A store failed before anything was left reserved.
    #[error("Store error: {0}")]
    Storage(#[from] StoreError),

    /// Stock validation did not finish in time.
    #[error("Stock validation timed out after {0:?}")]
    Timeout(Duration),

    /// The commit task panicked or was aborted.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrderingError {
    /// Short machine-readable name, used as a metric label and in responses.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderingError::Validation(_) => "validation",
            OrderingError::InsufficientStock { .. } => "insufficient_stock",
            OrderingError::PersistenceFailure(_) => "persistence",
            OrderingError::Storage(_) => "storage",
            OrderingError::Timeout(_) => "timeout",
            OrderingError::Internal(_) => "internal",
        }
    }

    /// Returns true if the caller can fix the request and retry.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            OrderingError::Validation(_) | OrderingError::InsufficientStock { .. }
        )
    }
}

/// Convenience type alias for ordering results.
pub type Result<T> = std::result::Result<T, OrderingError>;
