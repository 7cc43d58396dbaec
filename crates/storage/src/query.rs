use domain::{Money, Order};

/// Page size used when the caller gives none.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Largest page size a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Width of the `grandTotal` search window, in cents.
const GRAND_TOTAL_WINDOW_CENTS: i64 = 100;

/// A single search predicate over orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderFilter {
    /// Status contains the given text, case-insensitively.
    StatusContains(String),
    /// Grand total lies in `[amount, amount + 1.00]`.
    GrandTotalAround(Money),
}

impl OrderFilter {
    /// Parses a structured search string of comma-separated `field:value`
    /// pairs. Unknown fields and unparsable values are skipped.
    pub fn parse_search(search: &str) -> Vec<OrderFilter> {
        search
            .split(',')
            .filter_map(|pair| {
                let (field, value) = pair.split_once(':')?;
                let value = value.trim();
                match field.trim() {
                    "status" if !value.is_empty() => {
                        Some(OrderFilter::StatusContains(value.to_lowercase()))
                    }
                    "grandTotal" => value
                        .parse::<f64>()
                        .ok()
                        .and_then(Money::from_decimal)
                        .map(OrderFilter::GrandTotalAround),
                    _ => None,
                }
            })
            .collect()
    }

    /// Inclusive cents bounds of a `GrandTotalAround` filter. The upper
    /// bound saturates for amounts near `i64::MAX`.
    pub fn grand_total_bounds(amount: Money) -> (i64, i64) {
        (
            amount.cents(),
            amount.cents().saturating_add(GRAND_TOTAL_WINDOW_CENTS),
        )
    }

    pub fn matches(&self, order: &Order) -> bool {
        match self {
            OrderFilter::StatusContains(text) => order.status.as_str().contains(text.as_str()),
            OrderFilter::GrandTotalAround(amount) => {
                let (low, high) = Self::grand_total_bounds(*amount);
                (low..=high).contains(&order.grand_total.cents())
            }
        }
    }
}

/// Pagination and filtering for order listings.
///
/// Filters are OR-combined; an empty filter list matches everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    pub page: u32,
    pub limit: u32,
    pub filters: Vec<OrderFilter>,
}

impl OrderQuery {
    /// First page with the default limit and no filters.
    pub fn new() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            filters: Vec::new(),
        }
    }

    /// Sets the page number (1-based, clamped to at least 1).
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Sets the page size, clamped to `[1, MAX_PAGE_LIMIT]`.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit.clamp(1, MAX_PAGE_LIMIT);
        self
    }

    /// Adds the filters parsed from a structured search string.
    pub fn search(mut self, search: &str) -> Self {
        self.filters.extend(OrderFilter::parse_search(search));
        self
    }

    /// Number of records to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    pub fn matches(&self, order: &Order) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|f| f.matches(order))
    }
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self::new()
    }
}

/// One page of a listing plus the total number of matching records.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

impl<T> Page<T> {
    /// `ceil(total / limit)`; zero when there are no records.
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.limit.max(1)))
    }
}
