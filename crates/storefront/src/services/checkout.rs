//! Checkout: pricing carts, validating order requests and placing orders.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::{info, warn};

use whimsical_frog_core::pricing::{Quote, quote, subtotal};
use whimsical_frog_core::{PaymentMethod, ShippingMethod, UnknownLabel, UserId};

use crate::db::orders::{PlaceOrderError, PlacedOrder};
use crate::db::{CatalogRepository, OrderRepository, RepositoryError, SettingsRepository};
use crate::models::{Address, Cart, CartLine, CurrentUser, Item, NewOrder, NewOrderLine};

/// Errors raised while pricing or placing an order.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid items array")]
    InvalidItems,

    #[error("Invalid items or quantities")]
    InvalidItemsOrQuantities,

    #[error("Item SKU cannot be empty")]
    EmptySku,

    #[error("Invalid payment method")]
    InvalidPaymentMethod(#[source] UnknownLabel),

    #[error("Invalid shipping method")]
    InvalidShippingMethod(#[source] UnknownLabel),

    #[error("Not allowed to place orders for this customer")]
    Forbidden,

    #[error("Unknown item: {0}")]
    UnknownSku(String),

    #[error("Could not place order")]
    Order(#[source] PlaceOrderError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CheckoutError {
    /// Whether the caller sent something wrong (as opposed to a server fault).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Order(_) | Self::Repository(_))
    }
}

impl From<PlaceOrderError> for CheckoutError {
    fn from(err: PlaceOrderError) -> Self {
        match err {
            PlaceOrderError::UnknownSku(sku) => Self::UnknownSku(sku),
            other => Self::Order(other),
        }
    }
}

/// A cart line joined with its catalog item.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub line: CartLine,
    pub item: Item,
    pub line_total: Decimal,
}

/// Cart contents with live prices and a quote.
#[derive(Debug, Clone)]
pub struct CartSummary {
    pub lines: Vec<PricedLine>,
    /// SKUs in the cart that are no longer sold.
    pub unavailable: Vec<String>,
    pub quote: Quote,
}

impl CartSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Pricing breakdown returned by the pricing API.
#[derive(Debug, Clone, Serialize)]
pub struct PricingResponse {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub currency: String,
}

impl From<Quote> for PricingResponse {
    fn from(q: Quote) -> Self {
        Self {
            subtotal: q.subtotal,
            shipping: q.shipping,
            tax: q.tax,
            total: q.total,
            currency: q.currency,
        }
    }
}

/// A validated add-order API request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiOrderRequest {
    pub customer_id: UserId,
    pub payment_method: PaymentMethod,
    pub shipping_method: ShippingMethod,
    pub check_number: Option<String>,
    /// Client-computed total; informational only.
    pub client_total: Decimal,
    pub lines: Vec<NewOrderLine>,
}

impl ApiOrderRequest {
    /// Validate a JSON body.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure, e.g. `Missing field: itemIds`.
    pub fn from_json(body: &Value) -> Result<Self, CheckoutError> {
        let field = |name: &'static str| {
            body.get(name)
                .filter(|v| !v.is_null())
                .ok_or(CheckoutError::MissingField(name))
        };

        let customer_id = field("customerId")?;
        let item_ids = field("itemIds")?;
        let quantities = field("quantities")?;
        let payment_method = field("paymentMethod")?;
        let total = field("total")?;

        let customer_id = as_i64(customer_id)
            .and_then(|n| i32::try_from(n).ok())
            .map(UserId::new)
            .ok_or(CheckoutError::MissingField("customerId"))?;

        let (Some(item_ids), Some(quantities)) = (item_ids.as_array(), quantities.as_array())
        else {
            return Err(CheckoutError::InvalidItems);
        };
        if item_ids.is_empty() || item_ids.len() != quantities.len() {
            return Err(CheckoutError::InvalidItems);
        }

        let payment_method = payment_method
            .as_str()
            .unwrap_or_default()
            .parse::<PaymentMethod>()
            .map_err(CheckoutError::InvalidPaymentMethod)?;

        let shipping_method = match body.get("shippingMethod").and_then(Value::as_str) {
            Some(s) if !s.trim().is_empty() => s
                .parse::<ShippingMethod>()
                .map_err(CheckoutError::InvalidShippingMethod)?,
            _ => ShippingMethod::CustomerPickup,
        };

        let client_total = as_decimal(total).ok_or(CheckoutError::MissingField("total"))?;

        let colors = padded_strings(body.get("colors"), item_ids.len());
        let sizes = padded_strings(body.get("sizes"), item_ids.len());

        let mut lines = Vec::with_capacity(item_ids.len());
        for (((sku, qty), color), size) in item_ids.iter().zip(quantities).zip(colors).zip(sizes) {
            let sku = sku.as_str().map(str::trim).unwrap_or_default();
            if sku.is_empty() {
                return Err(CheckoutError::EmptySku);
            }
            let quantity = positive_quantity(qty).ok_or(CheckoutError::InvalidItems)?;
            lines.push(NewOrderLine {
                sku: sku.to_owned(),
                quantity,
                color,
                size,
            });
        }

        let check_number = body
            .get("checkNumber")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);

        Ok(Self {
            customer_id,
            payment_method,
            shipping_method,
            check_number,
            client_total,
            lines,
        })
    }
}

impl ApiOrderRequest {
    /// Customers may order for themselves; admins for anyone.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Forbidden` otherwise.
    pub fn authorize(&self, caller: &CurrentUser) -> Result<(), CheckoutError> {
        if caller.id == self.customer_id || caller.is_admin() {
            Ok(())
        } else {
            Err(CheckoutError::Forbidden)
        }
    }
}

/// Parse the pricing API body into lines and a shipping method.
///
/// # Errors
///
/// Returns `CheckoutError::InvalidItemsOrQuantities` if the arrays are
/// missing, empty or of different lengths.
pub fn parse_pricing_request(
    body: &Value,
) -> Result<(Vec<(String, i32)>, ShippingMethod), CheckoutError> {
    let item_ids = body.get("itemIds").and_then(Value::as_array);
    let quantities = body.get("quantities").and_then(Value::as_array);
    let (Some(item_ids), Some(quantities)) = (item_ids, quantities) else {
        return Err(CheckoutError::InvalidItemsOrQuantities);
    };
    if item_ids.is_empty() || item_ids.len() != quantities.len() {
        return Err(CheckoutError::InvalidItemsOrQuantities);
    }

    let lines = item_ids
        .iter()
        .zip(quantities)
        .map(|(sku, qty)| {
            let sku = sku.as_str().map(str::trim).filter(|s| !s.is_empty())?;
            Some((sku.to_owned(), positive_quantity(qty)?))
        })
        .collect::<Option<Vec<_>>>()
        .ok_or(CheckoutError::InvalidItemsOrQuantities)?;

    let shipping = match body.get("shippingMethod").and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => s
            .parse::<ShippingMethod>()
            .map_err(CheckoutError::InvalidShippingMethod)?,
        _ => ShippingMethod::CustomerPickup,
    };

    Ok((lines, shipping))
}

fn as_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn positive_quantity(value: &Value) -> Option<i32> {
    as_i64(value)
        .and_then(|n| i32::try_from(n).ok())
        .filter(|n| *n > 0)
}

/// Read an optional array of strings, padded with `None` to `len`.
fn padded_strings(value: Option<&Value>, len: usize) -> Vec<Option<String>> {
    let mut out: Vec<Option<String>> = value
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .take(len)
                .map(|v| {
                    v.as_str()
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_owned)
                })
                .collect()
        })
        .unwrap_or_default();
    out.resize(len, None);
    out
}

pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Price a cart with current catalog prices.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if a query fails.
    pub async fn summarize(
        &self,
        cart: &Cart,
        shipping: ShippingMethod,
    ) -> Result<CartSummary, CheckoutError> {
        let catalog = CatalogRepository::new(self.pool);
        let skus: Vec<String> = cart.lines.iter().map(|l| l.sku.clone()).collect();
        let matches = catalog.resolve_prices(&skus).await?;
        let matched: Vec<String> = matches.iter().flatten().map(|m| m.sku.clone()).collect();
        let items = catalog.items_by_sku(&matched).await?;
        let settings = SettingsRepository::new(self.pool).pricing().await?;

        let mut lines = Vec::with_capacity(cart.lines.len());
        let mut unavailable = Vec::new();
        for (line, found) in cart.lines.iter().zip(&matches) {
            let item = found
                .as_ref()
                .and_then(|m| items.iter().find(|i| i.sku == m.sku));
            match item {
                Some(item) => lines.push(PricedLine {
                    line_total: item.retail_price * Decimal::from(line.quantity),
                    item: item.clone(),
                    line: line.clone(),
                }),
                None => unavailable.push(line.sku.clone()),
            }
        }

        let sub = subtotal(lines.iter().map(|l| (l.item.retail_price, l.line.quantity)));
        Ok(CartSummary {
            quote: quote(sub, shipping, &settings),
            lines,
            unavailable,
        })
    }

    /// Quote arbitrary `(sku, quantity)` lines.
    ///
    /// Variant SKUs are priced like their base item, the same way
    /// [`OrderRepository::place`] prices them. Unknown SKUs price at zero.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if a query fails.
    pub async fn price(
        &self,
        lines: &[(String, i32)],
        shipping: ShippingMethod,
    ) -> Result<Quote, CheckoutError> {
        let skus: Vec<String> = lines.iter().map(|(sku, _)| sku.clone()).collect();
        let matches = CatalogRepository::new(self.pool).resolve_prices(&skus).await?;
        let settings = SettingsRepository::new(self.pool).pricing().await?;

        let sub = subtotal(lines.iter().zip(&matches).map(|((_, qty), found)| {
            (found.as_ref().map_or(Decimal::ZERO, |m| m.price), *qty)
        }));
        Ok(quote(sub, shipping, &settings))
    }

    /// Place an order from the session cart.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` for an empty cart and
    /// `CheckoutError::UnknownSku` if an item is no longer sold.
    pub async fn place_cart(
        &self,
        user: &CurrentUser,
        cart: &Cart,
        payment_method: PaymentMethod,
        shipping_method: ShippingMethod,
        check_number: Option<String>,
        shipping_address: Option<Address>,
    ) -> Result<PlacedOrder, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let order = NewOrder {
            user_id: user.id,
            payment_method,
            shipping_method,
            check_number: check_number.filter(|_| payment_method == PaymentMethod::Check),
            shipping_address: shipping_address.filter(|a| !a.is_empty()),
            lines: cart
                .lines
                .iter()
                .map(|l| NewOrderLine {
                    sku: l.sku.clone(),
                    quantity: l.quantity,
                    color: l.color.clone(),
                    size: l.size.clone(),
                })
                .collect(),
        };
        self.place(&order).await
    }

    /// Place an order from the JSON API on behalf of `caller`.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Forbidden` unless the caller is the customer or
    /// an admin.
    pub async fn place_api_order(
        &self,
        caller: &CurrentUser,
        request: ApiOrderRequest,
        shipping_address: Option<Address>,
    ) -> Result<PlacedOrder, CheckoutError> {
        request.authorize(caller)?;
        let order = NewOrder {
            user_id: request.customer_id,
            payment_method: request.payment_method,
            shipping_method: request.shipping_method,
            check_number: request.check_number,
            shipping_address,
            lines: request.lines,
        };
        let placed = self.place(&order).await?;
        if placed.quote.total != request.client_total {
            info!(
                order_id = %placed.id,
                client_total = %request.client_total,
                total = %placed.quote.total,
                "Client total differs from recomputed total"
            );
        }
        Ok(placed)
    }

    async fn place(&self, order: &NewOrder) -> Result<PlacedOrder, CheckoutError> {
        let settings = SettingsRepository::new(self.pool).pricing().await?;
        let placed = OrderRepository::new(self.pool)
            .place(order, &settings, Utc::now().date_naive())
            .await?;

        info!(order_id = %placed.id, user_id = %order.user_id, total = %placed.quote.total, "Order placed");
        for item in &placed.low_stock {
            warn!(
                "Low Stock Alert: Item {} is at {} (Threshold: {})",
                item.sku, item.stock_level, item.reorder_point
            );
        }
        Ok(placed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_body() -> Value {
        json!({
            "customerId": 7,
            "itemIds": ["WF-TS-001", "WF-TU-002"],
            "quantities": [2, 1],
            "paymentMethod": "Cash",
            "total": 42.5
        })
    }

    #[test]
    fn test_api_order_valid() {
        let req = ApiOrderRequest::from_json(&valid_body()).unwrap();
        assert_eq!(req.customer_id, UserId::new(7));
        assert_eq!(req.payment_method, PaymentMethod::Cash);
        assert_eq!(req.shipping_method, ShippingMethod::CustomerPickup);
        assert_eq!(req.lines.len(), 2);
        assert_eq!(req.lines[1].quantity, 1);
        assert_eq!(req.lines[0].color, None);
        assert_eq!(req.client_total, Decimal::new(425, 1));
    }

    #[test]
    fn test_api_order_missing_fields() {
        for name in ["customerId", "itemIds", "quantities", "paymentMethod", "total"] {
            let mut body = valid_body();
            body.as_object_mut().unwrap().remove(name);
            let err = ApiOrderRequest::from_json(&body).unwrap_err();
            assert_eq!(err.to_string(), format!("Missing field: {name}"));
        }
    }

    #[test]
    fn test_api_order_mismatched_arrays() {
        let mut body = valid_body();
        body["quantities"] = json!([1]);
        let err = ApiOrderRequest::from_json(&body).unwrap_err();
        assert_eq!(err.to_string(), "Invalid items array");
    }

    #[test]
    fn test_api_order_empty_sku() {
        let mut body = valid_body();
        body["itemIds"] = json!(["WF-TS-001", "  "]);
        assert!(matches!(
            ApiOrderRequest::from_json(&body),
            Err(CheckoutError::EmptySku)
        ));
    }

    #[test]
    fn test_api_order_pads_colors_and_sizes() {
        let mut body = valid_body();
        body["colors"] = json!(["Green"]);
        body["sizes"] = json!(["L", "XL", "XXL"]);
        body["shippingMethod"] = json!("USPS");
        let req = ApiOrderRequest::from_json(&body).unwrap();
        assert_eq!(req.lines[0].color.as_deref(), Some("Green"));
        assert_eq!(req.lines[1].color, None);
        assert_eq!(req.lines[1].size.as_deref(), Some("XL"));
        assert_eq!(req.shipping_method, ShippingMethod::Usps);
    }

    #[test]
    fn test_api_order_string_numbers() {
        let mut body = valid_body();
        body["customerId"] = json!("7");
        body["quantities"] = json!(["2", "1"]);
        body["total"] = json!("42.50");
        let req = ApiOrderRequest::from_json(&body).unwrap();
        assert_eq!(req.customer_id, UserId::new(7));
        assert_eq!(req.lines[0].quantity, 2);
    }

    #[test]
    fn test_api_order_rejects_unknown_payment_method() {
        let mut body = valid_body();
        body["paymentMethod"] = json!("Seashells");
        assert!(matches!(
            ApiOrderRequest::from_json(&body),
            Err(CheckoutError::InvalidPaymentMethod(_))
        ));
    }

    #[test]
    fn test_pricing_request() {
        let (lines, shipping) = parse_pricing_request(&json!({
            "itemIds": ["WF-AR-001"],
            "quantities": [3],
            "shippingMethod": "FedEx"
        }))
        .unwrap();
        assert_eq!(lines, vec![("WF-AR-001".to_owned(), 3)]);
        assert_eq!(shipping, ShippingMethod::FedEx);
    }

    #[test]
    fn test_pricing_request_mismatch() {
        let err = parse_pricing_request(&json!({
            "itemIds": ["WF-AR-001", "WF-AR-002"],
            "quantities": [3]
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid items or quantities");
    }

    #[test]
    fn test_pricing_request_rejects_zero_quantity() {
        assert!(
            parse_pricing_request(&json!({"itemIds": ["A"], "quantities": [0]})).is_err()
        );
    }

    #[test]
    fn test_client_error_classification() {
        assert!(CheckoutError::EmptyCart.is_client_error());
        assert!(CheckoutError::UnknownSku("X".to_owned()).is_client_error());
        assert!(
            !CheckoutError::Repository(RepositoryError::NotFound).is_client_error()
        );
    }

    fn caller(id: i32, role: whimsical_frog_core::UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            username: whimsical_frog_core::Username::parse("toad").unwrap(),
            email: whimsical_frog_core::Email::parse("toad@example.com").unwrap(),
            role,
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn test_authorize_owner_or_admin() {
        use whimsical_frog_core::UserRole;

        let req = ApiOrderRequest::from_json(&valid_body()).unwrap();
        assert!(req.authorize(&caller(7, UserRole::Customer)).is_ok());
        assert!(req.authorize(&caller(1, UserRole::Admin)).is_ok());
        assert!(matches!(
            req.authorize(&caller(8, UserRole::Customer)),
            Err(CheckoutError::Forbidden)
        ));
    }
}
