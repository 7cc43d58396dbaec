use common::ProductId;
use thiserror::Error;

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A compensating update targeted a product that no longer exists.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The store could not be reached or refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be turned back into a domain value.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
