//! Value objects for the order domain.

use common::ProductId;
use serde::{Deserialize, Serialize};

/// Money amount held in integer cents.
///
/// All pricing arithmetic happens in cents; decimal values only appear at the
/// HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Converts a decimal amount (e.g. `10.5`) to cents, rounding half away
    /// from zero. Returns None for NaN or infinite input.
    pub fn from_decimal(amount: f64) -> Option<Self> {
        if !amount.is_finite() {
            return None;
        }
        Some(Self((amount * 100.0).round() as i64))
    }

    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the amount as a decimal number of currency units.
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the whole-unit portion.
    pub fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents remainder after whole units.
    pub fn cents_part(&self) -> i64 {
        self.0.abs() % 100
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity, saturating at the `i64` bounds.
    pub fn times(&self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(i64::from(quantity)))
    }

    /// Multiplies a unit price by a quantity. None on overflow.
    pub fn checked_times(&self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }

    /// Adds two amounts. None on overflow.
    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}{}.{:02}", self.units().abs(), self.cents_part())
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// A line of a persisted order.
///
/// `name` and `unit_price` are snapshots of the catalog at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(
        product_id: impl Into<ProductId>,
        name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            quantity,
        }
    }

    /// Returns `unit_price * quantity`.
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    /// Returns `unit_price * quantity`, or None if it overflows.
    pub fn checked_line_total(&self) -> Option<Money> {
        self.unit_price.checked_times(self.quantity)
    }
}
