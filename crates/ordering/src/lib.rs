//! Order placement core.
//!
//! Placing an order runs these steps:
//! 1. Check stock for every line item concurrently (advisory)
//! 2. Price every item from the catalog snapshot
//! 3. Atomically decrement stock per item, in submission order
//! 4. Persist the order
//! 5. Hand the stored order to the notification dispatcher (detached)
//!
//! If step 3 or 4 fails, every decrement already applied is compensated
//! before the error is returned.

pub mod committer;
pub mod error;
pub mod notification;
pub mod placement;
pub mod pricing;
pub mod validator;

pub use committer::{CompensationReport, InventoryCommitter, Reservation};
pub use error::{OrderingError, Result};
pub use notification::{
    InMemoryNotifier, InvoiceRenderer, LogNotifier, NotificationConfig, NotificationDispatcher,
    NotificationError, Notifier, OrderConfirmation,
};
pub use placement::{OrderPlacement, PlacementConfig};
pub use pricing::{PricedOrder, price};
pub use validator::{StockValidator, ValidatedItem};
