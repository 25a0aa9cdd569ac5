//! Order management.
//!
//! Line edits go through `POST /api/orders/{id}/items` with an `action`
//! discriminator; every edit re-quotes the order with the current pricing
//! settings and returns the new total.

use askama::Template;
use axum::{
    Form, Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::{Redirect, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use whimsical_frog_core::{OrderStatus, PaymentMethod, PaymentStatus, ShippingMethod};

use super::{Flash, Layout, render, with_message};
use crate::config::EmailConfig;
use crate::db::{CustomerRepository, OrderRepository};
use crate::error::{ApiError, ApiResult, AppError};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{
    Address, OrderDetail, OrderFilter, OrderFilterQuery, OrderSummary, OrderUpdate,
    OrderUpdateForm,
};
use crate::services::email::{SMTP_PASSWORD_KEY, SMTP_USERNAME_KEY};
use crate::services::{EmailError, EmailService, SecretsService, SmtpLogin};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderSummary>,
    pub query: OrderFilterQuery,
    pub flash: Flash,
}

fn selected(value: Option<&String>, option: &str) -> bool {
    value.is_some_and(|v| v == option)
}

impl OrdersTemplate {
    fn status_selected(&self, option: &str) -> bool {
        selected(self.query.status.as_ref(), option)
    }

    fn payment_status_selected(&self, option: &str) -> bool {
        selected(self.query.payment_status.as_ref(), option)
    }

    fn payment_method_selected(&self, option: &str) -> bool {
        selected(self.query.payment_method.as_ref(), option)
    }

    fn shipping_method_selected(&self, option: &str) -> bool {
        selected(self.query.shipping_method.as_ref(), option)
    }
}

#[derive(Template)]
#[template(path = "orders/show.html")]
pub struct OrderTemplate {
    pub layout: Layout,
    pub order: OrderDetail,
    pub flash: Flash,
}

impl OrderTemplate {
    fn status_is(&self, option: &str) -> bool {
        self.order.summary.order_status.as_str() == option
    }

    fn payment_status_is(&self, option: &str) -> bool {
        self.order.summary.payment_status.as_str() == option
    }

    fn payment_method_is(&self, option: &str) -> bool {
        self.order.summary.payment_method.as_str() == option
    }

    fn shipping_method_is(&self, option: &str) -> bool {
        self.order.summary.shipping_method.as_str() == option
    }
}

/// Label lists for the filter and edit selects.
mod labels {
    use super::{OrderStatus, PaymentMethod, PaymentStatus, ShippingMethod};

    pub fn order_statuses() -> impl Iterator<Item = &'static str> {
        OrderStatus::ALL.iter().map(|s| s.as_str())
    }

    pub fn payment_statuses() -> impl Iterator<Item = &'static str> {
        PaymentStatus::ALL.iter().map(|s| s.as_str())
    }

    pub fn payment_methods() -> impl Iterator<Item = &'static str> {
        PaymentMethod::ALL.iter().map(|s| s.as_str())
    }

    pub fn shipping_methods() -> impl Iterator<Item = &'static str> {
        ShippingMethod::ALL.iter().map(|s| s.as_str())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LineAction {
    AddItem {
        sku: String,
        #[serde(default = "one")]
        quantity: i32,
        #[serde(default)]
        price: Option<Decimal>,
    },
    RemoveItem {
        item_id: String,
    },
    UpdateQuantity {
        item_id: String,
        quantity: i32,
    },
}

const fn one() -> i32 {
    1
}

#[derive(Debug, Default, Deserialize)]
pub struct AvailableQuery {
    #[serde(default)]
    pub search: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(index))
        .route("/orders/{id}", get(show).post(update))
        .route("/orders/{id}/delete", post(delete))
        .route("/api/orders/{id}/items", post(items))
        .route("/api/orders/{id}/address", post(update_address))
        .route("/api/orders/{id}/receipt", post(send_receipt))
        .route("/api/items/available", get(available_items))
}

#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<OrderFilterQuery>,
    Query(flash): Query<Flash>,
) -> Result<Response, AppError> {
    let filter = OrderFilter::from(&query);
    let orders = OrderRepository::new(state.pool()).list(&filter).await?;
    Ok(render(&OrdersTemplate {
        layout: Layout::new(&state, &admin, "/orders"),
        orders,
        query,
        flash,
    }))
}

#[instrument(skip(admin, state))]
pub async fn show(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(flash): Query<Flash>,
) -> Result<Response, AppError> {
    let order = OrderRepository::new(state.pool())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {id}")))?;
    Ok(render(&OrderTemplate {
        layout: Layout::new(&state, &admin, "/orders"),
        order,
        flash,
    }))
}

#[instrument(skip(_admin, state, form))]
pub async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<OrderUpdateForm>,
) -> Result<Redirect, AppError> {
    let path = format!("/orders/{id}");
    let update = match OrderUpdate::try_from(form) {
        Ok(update) => update,
        Err(e) => return Ok(Redirect::to(&with_message(&path, "error", &e.to_string()))),
    };
    let settings = state.pricing().get(state.pool()).await?;
    OrderRepository::new(state.pool())
        .update(&id, &update, &settings)
        .await?;
    tracing::info!(order_id = %id, status = %update.order_status, "Order updated");
    Ok(Redirect::to(&with_message(&path, "success", "Order updated")))
}

#[instrument(skip(_admin, state))]
pub async fn delete(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    OrderRepository::new(state.pool()).delete(&id).await?;
    tracing::info!(order_id = %id, "Order deleted");
    Ok(Redirect::to(&with_message(
        "/orders",
        "success",
        &format!("Order {id} deleted"),
    )))
}

#[instrument(skip(_admin, state, payload))]
pub async fn items(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<LineAction>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(action) = payload?;
    let settings = state.pricing().get(state.pool()).await?;
    let repo = OrderRepository::new(state.pool());

    let (message, total) = match action {
        LineAction::AddItem {
            sku,
            quantity,
            price,
        } => {
            if sku.trim().is_empty() {
                return Err(ApiError::bad_request("SKU required"));
            }
            if quantity <= 0 {
                return Err(ApiError::bad_request("Quantity must be greater than 0"));
            }
            if price.is_some_and(|p| p.is_sign_negative()) {
                return Err(ApiError::bad_request("Price cannot be negative"));
            }
            let (change, total) = repo
                .add_item(&id, sku.trim(), quantity, price, &settings)
                .await?;
            (change.message(), total)
        }
        LineAction::RemoveItem { item_id } => {
            let total = repo.remove_item(&id, &item_id, &settings).await?;
            ("Item removed from order", total)
        }
        LineAction::UpdateQuantity { item_id, quantity } => {
            if quantity <= 0 {
                return Err(ApiError::bad_request("Quantity must be greater than 0"));
            }
            let total = repo
                .update_quantity(&id, &item_id, quantity, &settings)
                .await?;
            ("Item quantity updated", total)
        }
    };

    tracing::info!(order_id = %id, %total, message, "Order lines changed");
    Ok(Json(json!({ "success": true, "message": message, "new_total": total })))
}

#[instrument(skip(_admin, state, payload))]
pub async fn update_address(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Address>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(address) = payload?;
    let customer = OrderRepository::new(state.pool()).customer_of(&id).await?;
    CustomerRepository::new(state.pool())
        .update_address(customer, &address.normalized())
        .await?;
    Ok(Json(json!({ "success": true, "message": "Address updated" })))
}

#[instrument(skip(_admin, state))]
pub async fn available_items(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<AvailableQuery>,
) -> ApiResult<Json<Value>> {
    let items = OrderRepository::new(state.pool())
        .available_items(query.search.as_deref())
        .await?;
    Ok(Json(json!({ "success": true, "items": items })))
}

/// Build a mailer from env settings plus stored SMTP credentials.
async fn mailer(state: &AppState, config: &EmailConfig) -> Result<EmailService, AppError> {
    let secrets = SecretsService::new(state.pool(), state.cipher());
    let username = secrets.get(SMTP_USERNAME_KEY).await?;
    let password = secrets.get(SMTP_PASSWORD_KEY).await?;
    let login = SmtpLogin::resolve(username, password, config);
    Ok(EmailService::new(config, login)?)
}

#[instrument(skip(_admin, state))]
pub async fn send_receipt(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let config = state
        .config()
        .email
        .as_ref()
        .ok_or(EmailError::NotConfigured)?;
    let order = OrderRepository::new(state.pool())
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    mailer(&state, config)
        .await?
        .send_receipt(&order.customer_email, &state.config().store_name, &order)
        .await?;

    tracing::info!(order_id = %id, "Receipt sent");
    Ok(Json(json!({
        "success": true,
        "message": format!("Receipt sent to {}", order.customer_email),
    })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_add_item_defaults_quantity() {
        let action: LineAction =
            serde_json::from_str(r#"{"action":"add_item","sku":"WF-MU-001"}"#).unwrap();
        assert!(matches!(
            action,
            LineAction::AddItem { quantity: 1, price: None, .. }
        ));
    }

    #[test]
    fn test_add_item_with_price() {
        let action: LineAction = serde_json::from_str(
            r#"{"action":"add_item","sku":"WF-MU-001","quantity":2,"price":"12.50"}"#,
        )
        .unwrap();
        assert!(matches!(
            action,
            LineAction::AddItem { quantity: 2, price: Some(p), .. } if p == Decimal::new(1250, 2)
        ));
    }

    #[test]
    fn test_update_quantity_requires_fields() {
        assert!(
            serde_json::from_str::<LineAction>(r#"{"action":"update_quantity","item_id":"OI1"}"#)
                .is_err()
        );
    }

    #[test]
    fn test_labels_cover_every_status() {
        assert_eq!(labels::order_statuses().count(), OrderStatus::ALL.len());
        assert!(labels::shipping_methods().any(|m| m == "USPS"));
    }

    #[test]
    fn test_selected() {
        let value = Some("Shipped".to_owned());
        assert!(selected(value.as_ref(), "Shipped"));
        assert!(!selected(value.as_ref(), "Pending"));
        assert!(!selected(None, "Shipped"));
    }
}
