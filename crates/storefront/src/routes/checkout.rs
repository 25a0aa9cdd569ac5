//! Checkout and order receipt pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use whimsical_frog_core::{PaymentMethod, ShippingMethod};

use super::{PageContext, load_cart, save_cart, with_message};
use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::user::non_blank;
use crate::models::{Address, Cart, Order, User};
use crate::services::AuthService;
use crate::services::checkout::{CartSummary, CheckoutService};
use crate::services::email::Recipient;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutQuery {
    pub shipping_method: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub payment_method: String,
    pub shipping_method: String,
    pub check_number: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub ctx: PageContext,
    pub summary: CartSummary,
    pub address: Address,
    pub payment_methods: &'static [PaymentMethod],
    pub shipping_methods: &'static [ShippingMethod],
    pub selected_shipping: ShippingMethod,
    pub error: Option<String>,
}

impl CheckoutTemplate {
    fn is_selected(&self, method: &ShippingMethod) -> bool {
        *method == self.selected_shipping
    }

    /// SKUs for the live pricing script.
    fn skus_csv(&self) -> String {
        self.summary
            .lines
            .iter()
            .map(|l| l.item.sku.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn quantities_csv(&self) -> String {
        self.summary
            .lines
            .iter()
            .map(|l| l.line.quantity.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "order.html")]
pub struct OrderTemplate {
    pub ctx: PageContext,
    pub order: Order,
}

#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<CheckoutQuery>,
) -> Result<Response> {
    let cart = load_cart(&session).await;
    if cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    let selected_shipping = query
        .shipping_method
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default();
    let summary = CheckoutService::new(state.pool())
        .summarize(&cart, selected_shipping)
        .await?;
    let profile = AuthService::new(state.pool()).get_user(user.id).await?;

    Ok(CheckoutTemplate {
        ctx: PageContext::load(&state, &session, Some(user)).await,
        summary,
        address: profile.address,
        payment_methods: PaymentMethod::ALL,
        shipping_methods: ShippingMethod::ALL,
        selected_shipping,
        error: query.error,
    }
    .into_response())
}

/// Place the order, clear the cart and show the receipt.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let (Ok(payment_method), Ok(shipping_method)) = (
        form.payment_method.parse::<PaymentMethod>(),
        form.shipping_method.parse::<ShippingMethod>(),
    ) else {
        return Ok(Redirect::to(&with_message(
            "/checkout",
            "error",
            "Please choose a payment and shipping method",
        ))
        .into_response());
    };

    let cart = load_cart(&session).await;
    let profile = AuthService::new(state.pool()).get_user(user.id).await?;

    let placed = match CheckoutService::new(state.pool())
        .place_cart(
            &user,
            &cart,
            payment_method,
            shipping_method,
            non_blank(form.check_number),
            Some(profile.address.clone()),
        )
        .await
    {
        Ok(placed) => placed,
        Err(e) if e.is_client_error() => {
            tracing::warn!("Checkout rejected: {e}");
            return Ok(Redirect::to(&with_message("/checkout", "error", &e.to_string())).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = save_cart(&session, &Cart::default()).await {
        tracing::error!("Failed to clear cart after order {}: {e}", placed.id);
    }
    state.catalog().invalidate_all().await;
    spawn_order_emails(&state, placed.id.clone(), profile);

    Ok(Redirect::to(&format!("/orders/{}", placed.id)).into_response())
}

/// Receipt for one of the current user's orders.
#[instrument(skip(state, session, user))]
pub async fn order(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let order = OrderRepository::new(state.pool())
        .get_for_user(&id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {id}")))?;
    Ok(OrderTemplate {
        ctx: PageContext::load(&state, &session, Some(user)).await,
        order,
    })
}
/// Email the confirmation for a committed order in the background.
///
/// The order is already stored; a failure here is only logged.
pub(crate) fn spawn_order_emails(state: &AppState, order_id: String, customer: User) {
    let Some(mailer) = state.mailer().cloned() else {
        tracing::debug!(%order_id, "Order emails not configured");
        return;
    };
    let pool = state.pool().clone();

    tokio::spawn(async move {
        let order = match OrderRepository::new(&pool)
            .get_for_user(&order_id, customer.id)
            .await
        {
            Ok(Some(order)) => order,
            Ok(None) => {
                tracing::warn!(%order_id, "Placed order not found for email");
                return;
            }
            Err(e) => {
                tracing::warn!(%order_id, "Could not load order for email: {e}");
                return;
            }
        };
        let name = customer
            .first_name
            .as_deref()
            .unwrap_or_else(|| customer.username.as_str());
        mailer
            .send_order_emails(
                &order,
                Recipient {
                    name,
                    email: customer.email.as_str(),
                },
            )
            .await;
    });
}

