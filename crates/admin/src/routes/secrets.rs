//! Encrypted secrets store.
//!
//! Values are write-only from the page; only `GET /api/secrets/export`
//! returns plaintext.

use askama::Template;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    response::Response,
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use super::{Layout, render};
use crate::db::secrets::SecretMeta;
use crate::error::{ApiResult, AppError};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::services::SecretsService;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "secrets.html")]
pub struct SecretsTemplate {
    pub layout: Layout,
    pub secrets: Vec<SecretMeta>,
}

#[derive(Debug, Deserialize)]
pub struct StoreInput {
    #[serde(default)]
    pub payload: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/secrets", get(index))
        .route("/api/secrets", post(store))
        .route("/api/secrets/rotate", post(rotate))
        .route("/api/secrets/export", get(export))
        .route("/api/secrets/{key}", delete(remove))
}

#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let secrets = SecretsService::new(state.pool(), state.cipher())
        .list()
        .await?;
    Ok(render(&SecretsTemplate {
        layout: Layout::new(&state, &admin, "/secrets"),
        secrets,
    }))
}

#[instrument(skip(admin, state, payload), fields(admin = %admin.username))]
pub async fn store(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    payload: Result<Json<StoreInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(input) = payload?;
    let keys = SecretsService::new(state.pool(), state.cipher())
        .store(&input.payload)
        .await?;
    tracing::info!(count = keys.len(), "Secrets stored");
    Ok(Json(json!({
        "success": true,
        "message": format!("Stored {} secret(s)", keys.len()),
        "keys": keys,
    })))
}

#[instrument(skip(admin, state), fields(admin = %admin.username))]
pub async fn remove(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Value>> {
    SecretsService::new(state.pool(), state.cipher())
        .delete(&key)
        .await?;
    tracing::info!(%key, "Secret deleted");
    Ok(Json(json!({ "success": true, "message": "Secret deleted" })))
}

#[instrument(skip(admin, state), fields(admin = %admin.username))]
pub async fn rotate(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let count = SecretsService::new(state.pool(), state.cipher())
        .rotate()
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Re-encrypted {count} secret(s)"),
        "rotated": count,
    })))
}

#[instrument(skip(admin, state), fields(admin = %admin.username))]
pub async fn export(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let secrets = SecretsService::new(state.pool(), state.cipher())
        .export()
        .await?;
    tracing::warn!(count = secrets.len(), "Secrets exported");
    Ok(Json(json!({ "success": true, "secrets": secrets })))
}
