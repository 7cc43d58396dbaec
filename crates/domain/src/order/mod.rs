//! Order aggregate and related types.

mod aggregate;
mod request;
mod state;
mod value_objects;

pub use aggregate::{NewOrder, Order};
pub use request::{LineItem, MAX_ITEM_QUANTITY, MIN_ITEM_QUANTITY, OrderRequest};
pub use state::{OrderStatus, ParseStatusError};
pub use value_objects::{Money, OrderItem};
