//! Dashboard and sales report figures.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{InventoryItem, OrderSummary};

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardStats {
    pub order_count: i64,
    pub revenue_ytd: Decimal,
    pub customer_count: i64,
    pub product_count: i64,
    pub low_stock: Vec<InventoryItem>,
    pub recent_orders: Vec<OrderSummary>,
}

/// Inclusive date range for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Raw `?start=&end=` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRangeQuery {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

impl DateRange {
    /// Earliest date used when no start is given.
    pub const DEFAULT_START: NaiveDate = match NaiveDate::from_ymd_opt(1900, 1, 1) {
        Some(d) => d,
        None => NaiveDate::MIN,
    };

    /// Latest date used when no end is given.
    pub const DEFAULT_END: NaiveDate = match NaiveDate::from_ymd_opt(2100, 12, 31) {
        Some(d) => d,
        None => NaiveDate::MAX,
    };

    /// Parse the query, falling back to the defaults for blank or invalid dates.
    /// Reversed ranges are swapped.
    #[must_use]
    pub fn from_query(query: &DateRangeQuery) -> Self {
        let parse = |value: Option<&String>| {
            value.and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
        };
        let start = parse(query.start.as_ref()).unwrap_or(Self::DEFAULT_START);
        let end = parse(query.end.as_ref()).unwrap_or(Self::DEFAULT_END);
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.start == Self::DEFAULT_START && self.end == Self::DEFAULT_END
    }
}

/// A labelled count, e.g. orders per payment method.
#[derive(Debug, Clone, Serialize)]
pub struct Breakdown {
    pub label: String,
    pub count: i64,
}

/// Best sellers by quantity.
#[derive(Debug, Clone, Serialize)]
pub struct TopItem {
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub revenue: Decimal,
}

/// The sales report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub range: DateRange,
    pub revenue_ytd: Decimal,
    pub orders_ytd: i64,
    pub customer_count: i64,
    pub product_count: i64,
    pub revenue_in_range: Decimal,
    pub orders_in_range: i64,
    pub by_payment_status: Vec<Breakdown>,
    pub by_payment_method: Vec<Breakdown>,
    pub top_items: Vec<TopItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(start: &str, end: &str) -> DateRangeQuery {
        DateRangeQuery {
            start: Some(start.to_owned()),
            end: Some(end.to_owned()),
        }
    }

    #[test]
    fn test_defaults() {
        let range = DateRange::from_query(&DateRangeQuery::default());
        assert_eq!(range.start.to_string(), "1900-01-01");
        assert_eq!(range.end.to_string(), "2100-12-31");
        assert!(range.is_default());
    }

    #[test]
    fn test_invalid_dates_fall_back() {
        let range = DateRange::from_query(&query("yesterday", "2025-02-30"));
        assert!(range.is_default());
    }

    #[test]
    fn test_reversed_range_is_swapped() {
        let range = DateRange::from_query(&query("2025-03-01", "2025-01-01"));
        assert_eq!(range.start.to_string(), "2025-01-01");
        assert_eq!(range.end.to_string(), "2025-03-01");
    }
}
