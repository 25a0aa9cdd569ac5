//! Orders as managed from the back office.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use whimsical_frog_core::{
    OrderStatus, PaymentMethod, PaymentStatus, ShippingMethod, UnknownLabel, UserId,
};

use super::Address;

/// One row of the orders table.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: String,
    pub user_id: UserId,
    pub customer: String,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub shipping_method: ShippingMethod,
    pub order_status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl OrderLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// An order with everything the detail page shows.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub summary: OrderSummary,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    /// The customer's current address.
    pub address: Address,
    /// Address captured at checkout, if any.
    pub shipping_address: Option<Address>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax_amount: Decimal,
    pub check_number: Option<String>,
    pub tracking_number: Option<String>,
    pub payment_date: Option<NaiveDate>,
    pub payment_notes: Option<String>,
    pub lines: Vec<OrderLine>,
}

/// An item offered when adding lines to an order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AvailableItem {
    pub sku: String,
    pub name: String,
    pub retail_price: Decimal,
    pub image_url: Option<String>,
}

/// Whether `add_item` created a line or merged into an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange {
    Added,
    Merged,
}

impl LineChange {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Added => "Item added to order",
            Self::Merged => "Item quantity updated in order",
        }
    }
}

/// Raw `GET /orders` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilterQuery {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub items: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub shipping_method: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
}

/// Parsed order list filters. Blank or unrecognised values are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub date: Option<NaiveDate>,
    pub item_text: Option<String>,
    pub status: Option<OrderStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub shipping_method: Option<ShippingMethod>,
    pub payment_status: Option<PaymentStatus>,
}

fn blank_to_none(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty() && *v != "All")
}

impl From<&OrderFilterQuery> for OrderFilter {
    fn from(query: &OrderFilterQuery) -> Self {
        Self {
            date: blank_to_none(query.date.as_ref())
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            item_text: blank_to_none(query.items.as_ref()).map(str::to_owned),
            status: blank_to_none(query.status.as_ref()).and_then(|s| s.parse().ok()),
            payment_method: blank_to_none(query.payment_method.as_ref())
                .and_then(|s| s.parse().ok()),
            shipping_method: blank_to_none(query.shipping_method.as_ref())
                .and_then(|s| s.parse().ok()),
            payment_status: blank_to_none(query.payment_status.as_ref())
                .and_then(|s| s.parse().ok()),
        }
    }
}

/// `POST /orders/{id}` form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderUpdateForm {
    pub order_status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub shipping_method: String,
    #[serde(default)]
    pub tracking_number: String,
    #[serde(default)]
    pub payment_date: String,
    #[serde(default)]
    pub payment_notes: String,
    #[serde(default)]
    pub check_number: String,
}

/// Validated order header changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderUpdate {
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub shipping_method: ShippingMethod,
    pub tracking_number: Option<String>,
    pub payment_date: Option<NaiveDate>,
    pub payment_notes: Option<String>,
    pub check_number: Option<String>,
}

/// Invalid order update input.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum OrderUpdateError {
    #[error("Invalid {0}")]
    Label(#[from] UnknownLabel),
    #[error("Invalid payment date")]
    PaymentDate,
}

fn optional(value: &str) -> Option<String> {
    Some(value.trim().to_owned()).filter(|v| !v.is_empty())
}

impl TryFrom<OrderUpdateForm> for OrderUpdate {
    type Error = OrderUpdateError;

    fn try_from(form: OrderUpdateForm) -> Result<Self, Self::Error> {
        let payment_date = match optional(&form.payment_date) {
            Some(date) => Some(
                NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                    .map_err(|_| OrderUpdateError::PaymentDate)?,
            ),
            None => None,
        };
        let payment_method: PaymentMethod = form.payment_method.parse()?;
        Ok(Self {
            order_status: form.order_status.parse()?,
            payment_status: form.payment_status.parse()?,
            shipping_method: form.shipping_method.parse()?,
            tracking_number: optional(&form.tracking_number),
            payment_date,
            payment_notes: optional(&form.payment_notes),
            check_number: optional(&form.check_number)
                .filter(|_| payment_method == PaymentMethod::Check),
            payment_method,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> OrderUpdateForm {
        OrderUpdateForm {
            order_status: "Shipped".to_owned(),
            payment_status: "Received".to_owned(),
            payment_method: "Cash".to_owned(),
            shipping_method: "USPS".to_owned(),
            tracking_number: " 9400 1000 ".to_owned(),
            payment_date: "2025-03-14".to_owned(),
            payment_notes: String::new(),
            check_number: "1001".to_owned(),
        }
    }

    #[test]
    fn test_update_from_form() {
        let update = OrderUpdate::try_from(form()).unwrap();
        assert_eq!(update.order_status, OrderStatus::Shipped);
        assert_eq!(update.shipping_method, ShippingMethod::Usps);
        assert_eq!(update.tracking_number.as_deref(), Some("9400 1000"));
        assert_eq!(update.payment_notes, None);
        assert_eq!(update.check_number, None);
        assert_eq!(update.payment_date.unwrap().to_string(), "2025-03-14");
    }

    #[test]
    fn test_update_rejects_unknown_status() {
        let bad = OrderUpdateForm {
            order_status: "Lost".to_owned(),
            ..form()
        };
        assert!(matches!(
            OrderUpdate::try_from(bad),
            Err(OrderUpdateError::Label(_))
        ));
    }

    #[test]
    fn test_update_rejects_bad_date() {
        let bad = OrderUpdateForm {
            payment_date: "14/03/2025".to_owned(),
            ..form()
        };
        assert_eq!(
            OrderUpdate::try_from(bad).unwrap_err(),
            OrderUpdateError::PaymentDate
        );
    }

    #[test]
    fn test_filter_ignores_blank_and_unknown() {
        let query = OrderFilterQuery {
            date: Some("2025-01-05".to_owned()),
            items: Some("  ".to_owned()),
            status: Some("All".to_owned()),
            payment_method: Some("venmo".to_owned()),
            shipping_method: Some("teleport".to_owned()),
            payment_status: None,
        };
        let filter = OrderFilter::from(&query);
        assert_eq!(filter.date.unwrap().to_string(), "2025-01-05");
        assert_eq!(filter.item_text, None);
        assert_eq!(filter.status, None);
        assert_eq!(filter.payment_method, Some(PaymentMethod::Venmo));
        assert_eq!(filter.shipping_method, None);
    }
}
