//! Order status.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of a persisted order.
///
/// Order placement only ever writes `Pending`; fulfillment moves it on.
/// ```text
/// Pending ──┬──► Completed
///           └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Stock committed, awaiting fulfillment.
    #[default]
    Pending,

    /// Fulfilled (terminal state).
    Completed,

    /// Cancelled (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// All statuses, in lifecycle order.
    pub fn all() -> [OrderStatus; 3] {
        [
            OrderStatus::Pending,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ]
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returned when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown order status: {0}")]
pub struct ParseStatusError(pub String);

impl std::str::FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}
