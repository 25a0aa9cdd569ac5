//! `POST /api/account`.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::ApiError;
use crate::middleware::RequireAuth;
use crate::routes::account::{AccountForm, apply_update};
use crate::state::AppState;

/// Update the profile from a JSON body with the same fields as the form.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    payload: Result<Json<AccountForm>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(form) = payload?;
    apply_update(&state, &session, &user, &form).await?;
    Ok(Json(json!({ "success": true, "message": "Account updated" })))
}
