//! Cart route handlers.
//!
//! The cart lives in the session; prices are looked up on every render.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use whimsical_frog_core::ShippingMethod;

use super::{PageContext, load_cart, save_cart};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::user::non_blank;
use crate::services::checkout::{CartSummary, CheckoutService};
use crate::state::AppState;

/// Identifies one cart line.
#[derive(Debug, Deserialize)]
pub struct LineForm {
    pub sku: String,
    pub color: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub sku: String,
    pub quantity: Option<i32>,
    pub color: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub sku: String,
    pub quantity: i32,
    pub color: Option<String>,
    pub size: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "cart.html")]
pub struct CartTemplate {
    pub ctx: PageContext,
    pub summary: CartSummary,
}

async fn store(session: &Session, cart: &crate::models::Cart) -> Result<()> {
    save_cart(session, cart)
        .await
        .map_err(|e| AppError::Internal(format!("failed to save cart: {e}")))
}

#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse> {
    let cart = load_cart(&session).await;
    let summary = CheckoutService::new(state.pool())
        .summarize(&cart, ShippingMethod::CustomerPickup)
        .await?;
    Ok(CartTemplate {
        ctx: PageContext::load(&state, &session, user).await,
        summary,
    })
}

#[instrument(skip(session))]
pub async fn add(session: Session, Form(form): Form<AddToCartForm>) -> Result<Response> {
    let mut cart = load_cart(&session).await;
    let color = non_blank(form.color);
    let size = non_blank(form.size);
    cart.add(
        &form.sku,
        form.quantity.unwrap_or(1),
        color.as_deref(),
        size.as_deref(),
    );
    store(&session, &cart).await?;
    Ok(Redirect::to("/cart").into_response())
}

#[instrument(skip(session))]
pub async fn update(session: Session, Form(form): Form<UpdateCartForm>) -> Result<Response> {
    let mut cart = load_cart(&session).await;
    let color = non_blank(form.color);
    let size = non_blank(form.size);
    cart.set_quantity(&form.sku, color.as_deref(), size.as_deref(), form.quantity);
    store(&session, &cart).await?;
    Ok(Redirect::to("/cart").into_response())
}

#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<LineForm>) -> Result<Response> {
    let mut cart = load_cart(&session).await;
    let color = non_blank(form.color);
    let size = non_blank(form.size);
    cart.remove(&form.sku, color.as_deref(), size.as_deref());
    store(&session, &cart).await?;
    Ok(Redirect::to("/cart").into_response())
}

pub async fn clear(session: Session) -> Result<Response> {
    let mut cart = load_cart(&session).await;
    cart.clear();
    store(&session, &cart).await?;
    Ok(Redirect::to("/cart").into_response())
}

/// `{"success": true, "count": n}` for the header badge.
pub async fn count(session: Session) -> impl IntoResponse {
    let cart = load_cart(&session).await;
    Json(json!({ "success": true, "count": cart.item_count() }))
}
