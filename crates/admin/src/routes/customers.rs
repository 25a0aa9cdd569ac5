//! Customer accounts.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use whimsical_frog_core::{UserId, UserRole};

use super::{Flash, Layout, render, with_message};
use crate::db::{CustomerRepository, RepositoryError};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Customer;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "customers.html")]
pub struct CustomersTemplate {
    pub layout: Layout,
    pub customers: Vec<Customer>,
    pub search: String,
    pub current_admin: UserId,
    pub flash: Flash,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customers", get(index))
        .route("/customers/{id}/role", post(set_role))
        .route("/customers/{id}/delete", post(delete))
}

#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    Query(flash): Query<Flash>,
) -> Result<Response, AppError> {
    let customers = CustomerRepository::new(state.pool())
        .list(query.search.as_deref())
        .await?;
    Ok(render(&CustomersTemplate {
        layout: Layout::new(&state, &admin, "/customers"),
        customers,
        search: query.search.unwrap_or_default(),
        current_admin: admin.id,
        flash,
    }))
}

#[instrument(skip(admin, state, form))]
pub async fn set_role(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<RoleForm>,
) -> Result<Redirect, AppError> {
    let id = UserId::new(id);
    let Ok(role) = form.role.parse::<UserRole>() else {
        return Ok(Redirect::to(&with_message("/customers", "error", "Invalid role")));
    };
    if id == admin.id && !role.is_admin() {
        return Ok(Redirect::to(&with_message(
            "/customers",
            "error",
            "You cannot remove your own admin role",
        )));
    }

    CustomerRepository::new(state.pool()).set_role(id, role).await?;
    tracing::info!(user_id = %id, %role, by = %admin.id, "Role changed");
    Ok(Redirect::to(&with_message("/customers", "success", "Role updated")))
}

#[instrument(skip(admin, state))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    let id = UserId::new(id);
    match CustomerRepository::new(state.pool()).delete(id, admin.id).await {
        Ok(()) => {
            tracing::info!(user_id = %id, by = %admin.id, "Customer deleted");
            Ok(Redirect::to(&with_message("/customers", "success", "Customer deleted")))
        }
        Err(RepositoryError::Conflict(message)) => {
            Ok(Redirect::to(&with_message("/customers", "error", &message)))
        }
        Err(e) => Err(e.into()),
    }
}
