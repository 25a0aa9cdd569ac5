//! Order and order-item identifiers.
//!
//! Order ids are short, human-readable codes such as `07C15U01`:
//!
//! | Part | Example | Meaning |
//! |------|---------|---------|
//! | customer | `07` | user id modulo 100 |
//! | month | `C` | `A` (January) through `L` (December) |
//! | day | `15` | day of month |
//! | shipping | `U` | [`ShippingMethod::code`] |
//! | sequence | `01` | next free number for this prefix |
//!
//! Order item ids are `OI` followed by a 10-digit global sequence.

use chrono::{Datelike, NaiveDate};

use crate::{ShippingMethod, UserId};

const MONTH_LETTERS: [char; 12] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L'];

/// Errors raised while allocating identifiers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderNumberError {
    /// All 99 sequence numbers for a prefix are taken.
    #[error("no order numbers left for prefix {0}")]
    SequenceExhausted(String),
}

/// Two-digit customer component.
#[must_use]
pub fn customer_number(user_id: UserId) -> String {
    format!("{:02}", user_id.as_i32().rem_euclid(100))
}

/// Month letter plus two-digit day.
#[must_use]
pub fn compact_date(date: NaiveDate) -> String {
    let letter = MONTH_LETTERS
        .get(date.month0() as usize)
        .copied()
        .unwrap_or('A');
    format!("{letter}{:02}", date.day())
}

/// Everything except the trailing sequence number.
#[must_use]
pub fn order_prefix(user_id: UserId, date: NaiveDate, shipping: ShippingMethod) -> String {
    format!(
        "{}{}{}",
        customer_number(user_id),
        compact_date(date),
        shipping.code()
    )
}

/// Build the next order id for `prefix`.
///
/// `highest_existing` is the greatest id already stored that starts with
/// `prefix` (ids sort lexicographically because the sequence is fixed-width).
///
/// # Errors
///
/// Returns [`OrderNumberError::SequenceExhausted`] once `99` is taken.
pub fn next_order_id(
    prefix: &str,
    highest_existing: Option<&str>,
) -> Result<String, OrderNumberError> {
    let current = highest_existing
        .and_then(|id| id.strip_prefix(prefix))
        .and_then(|seq| seq.parse::<u32>().ok())
        .unwrap_or(0);
    let next = current + 1;
    if next > 99 {
        return Err(OrderNumberError::SequenceExhausted(prefix.to_owned()));
    }
    Ok(format!("{prefix}{next:02}"))
}

/// Format an order item id.
#[must_use]
pub fn order_item_id(sequence: u64) -> String {
    format!("OI{sequence:010}")
}

/// Parse the sequence back out of an order item id.
#[must_use]
pub fn order_item_sequence(id: &str) -> Option<u64> {
    let digits = id.strip_prefix("OI")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_customer_number() {
        assert_eq!(customer_number(UserId::new(7)), "07");
        assert_eq!(customer_number(UserId::new(1234)), "34");
        assert_eq!(customer_number(UserId::new(100)), "00");
    }

    #[test]
    fn test_compact_date() {
        assert_eq!(compact_date(date(2025, 1, 5)), "A05");
        assert_eq!(compact_date(date(2025, 12, 31)), "L31");
    }

    #[test]
    fn test_order_prefix() {
        let prefix = order_prefix(UserId::new(7), date(2025, 3, 15), ShippingMethod::Usps);
        assert_eq!(prefix, "07C15U");
    }

    #[test]
    fn test_first_order_for_prefix() {
        assert_eq!(next_order_id("07C15U", None).unwrap(), "07C15U01");
    }

    #[test]
    fn test_next_order_increments() {
        assert_eq!(
            next_order_id("07C15U", Some("07C15U09")).unwrap(),
            "07C15U10"
        );
    }

    #[test]
    fn test_sequence_exhausted() {
        assert_eq!(
            next_order_id("07C15U", Some("07C15U99")),
            Err(OrderNumberError::SequenceExhausted("07C15U".to_owned()))
        );
    }

    #[test]
    fn test_order_item_ids() {
        assert_eq!(order_item_id(42), "OI0000000042");
        assert_eq!(order_item_sequence("OI0000000042"), Some(42));
        assert_eq!(order_item_sequence("OIX"), None);
        assert_eq!(order_item_sequence("42"), None);
    }
}
