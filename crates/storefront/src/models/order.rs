//! Order types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use whimsical_frog_core::{OrderStatus, PaymentMethod, PaymentStatus, ShippingMethod, UserId};

use super::Address;

/// Checkout input before an id and prices have been assigned.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub payment_method: PaymentMethod,
    pub shipping_method: ShippingMethod,
    pub check_number: Option<String>,
    pub shipping_address: Option<Address>,
    pub lines: Vec<NewOrderLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub sku: String,
    pub quantity: i32,
    pub color: Option<String>,
    pub size: Option<String>,
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

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: String,
    pub user_id: UserId,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub check_number: Option<String>,
    pub payment_status: PaymentStatus,
    pub shipping_method: ShippingMethod,
    pub order_status: OrderStatus,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}
