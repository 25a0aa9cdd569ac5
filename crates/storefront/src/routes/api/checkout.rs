//! Pricing and order placement JSON endpoints.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::{ApiError, AppError};
use crate::middleware::RequireAuth;
use crate::routes::checkout::spawn_order_emails;
use crate::services::{AuthError, AuthService};
use crate::services::checkout::{
    ApiOrderRequest, CheckoutService, PricingResponse, parse_pricing_request,
};
use crate::state::AppState;

/// `{itemIds, quantities, shippingMethod}` to a price breakdown.
#[instrument(skip_all)]
pub async fn pricing(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let (lines, shipping) = parse_pricing_request(&body)?;
    let quote = CheckoutService::new(state.pool())
        .price(&lines, shipping)
        .await?;
    Ok(Json(json!({
        "success": true,
        "pricing": PricingResponse::from(quote),
    })))
}

/// Place an order for `customerId`. Callers may order for themselves;
/// admins may order for anyone.
#[instrument(skip_all, fields(caller = %caller.id))]
pub async fn create_order(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let request = ApiOrderRequest::from_json(&body)?;
    request.authorize(&caller)?;

    let customer = match AuthService::new(state.pool())
        .get_user(request.customer_id)
        .await
    {
        Ok(customer) => customer,
        Err(AuthError::InvalidCredentials) => {
            return Err(AppError::NotFound("Customer not found".to_owned()).into());
        }
        Err(e) => return Err(e.into()),
    };
    let address = Some(customer.address.clone()).filter(|a| !a.is_empty());

    let placed = CheckoutService::new(state.pool())
        .place_api_order(&caller, request, address)
        .await?;
    state.catalog().invalidate_all().await;
    spawn_order_emails(&state, placed.id.clone(), customer);

    Ok(Json(json!({
        "success": true,
        "orderId": placed.id,
        "pricing": PricingResponse::from(placed.quote),
    })))
}
