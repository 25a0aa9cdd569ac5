//! Category management and SKU prefix rules.
//!
//! `POST /api/categories` takes an `action` discriminator:
//!
//! ```json
//! {"action": "add", "name": "Tumblers"}
//! {"action": "rename", "old_name": "Tumblers", "new_name": "Drinkware"}
//! {"action": "delete", "name": "Drinkware", "reassign_to": "Mugs"}
//! {"action": "reorder", "names": ["Mugs", "T-Shirts"]}
//! ```

use askama::Template;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    response::Response,
    routing::{delete, get},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use whimsical_frog_core::SkuRuleId;

use super::{Layout, render};
use crate::db::{CategoryRepository, SkuRuleRepository};
use crate::error::{ApiError, ApiResult, AppError};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{CategorySummary, SkuRule};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "categories.html")]
pub struct CategoriesTemplate {
    pub layout: Layout,
    pub categories: Vec<CategorySummary>,
    pub rules: Vec<SkuRule>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CategoryAction {
    Add {
        #[serde(default)]
        name: String,
    },
    Rename {
        #[serde(default)]
        old_name: String,
        #[serde(default)]
        new_name: String,
    },
    Delete {
        #[serde(default)]
        name: String,
        #[serde(default)]
        reassign_to: Option<String>,
    },
    Reorder {
        #[serde(default)]
        names: Vec<String>,
    },
}

#[derive(Debug, Deserialize)]
pub struct SkuRuleInput {
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub sku_code: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(page))
        .route("/api/categories", get(list).post(act))
        .route("/api/sku-rules", get(list_rules).post(upsert_rule))
        .route("/api/sku-rules/{id}", delete(delete_rule))
}

fn required<'a>(value: &'a str, message: &str) -> Result<&'a str, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ApiError::bad_request(message))
    } else {
        Ok(value)
    }
}

#[instrument(skip(admin, state))]
pub async fn page(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    let rules = SkuRuleRepository::new(state.pool()).list().await?;
    Ok(render(&CategoriesTemplate {
        layout: Layout::new(&state, &admin, "/categories"),
        categories,
        rules,
    }))
}

#[instrument(skip(_admin, state))]
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(Json(json!({ "success": true, "categories": categories })))
}

#[instrument(skip(_admin, state, payload))]
pub async fn act(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    payload: Result<Json<CategoryAction>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(action) = payload?;
    let repo = CategoryRepository::new(state.pool());

    match action {
        CategoryAction::Add { name } => {
            let name = required(&name, "Name required")?;
            let id = repo.add(name).await?;
            tracing::info!(%name, "Category added");
            Ok(Json(json!({ "success": true, "message": "Category added", "id": id })))
        }
        CategoryAction::Rename { old_name, new_name } => {
            let old_name = required(&old_name, "old_name and new_name required")?;
            let new_name = required(&new_name, "old_name and new_name required")?;
            repo.rename(old_name, new_name).await?;
            tracing::info!(%old_name, %new_name, "Category renamed");
            Ok(Json(json!({ "success": true, "message": "Category renamed" })))
        }
        CategoryAction::Delete { name, reassign_to } => {
            let name = required(&name, "Name required")?;
            let deleted = repo.delete(name, reassign_to.as_deref()).await?;
            tracing::info!(%name, reassigned = deleted.reassigned, "Category deleted");
            Ok(Json(json!({
                "success": true,
                "message": "Category deleted",
                "reassigned": deleted.reassigned,
            })))
        }
        CategoryAction::Reorder { names } => {
            if names.is_empty() {
                return Err(ApiError::bad_request("names required"));
            }
            let updated = repo.reorder(&names).await?;
            Ok(Json(json!({
                "success": true,
                "message": "Categories reordered",
                "updated": updated,
            })))
        }
    }
}

#[instrument(skip(_admin, state))]
pub async fn list_rules(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let rules = SkuRuleRepository::new(state.pool()).list().await?;
    Ok(Json(json!({ "success": true, "rules": rules })))
}

#[instrument(skip(_admin, state, payload))]
pub async fn upsert_rule(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    payload: Result<Json<SkuRuleInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(input) = payload?;
    let category_name = required(&input.category_name, "category_name required")?;
    let rule = SkuRuleRepository::new(state.pool())
        .upsert(category_name, &input.sku_code)
        .await?;
    Ok(Json(json!({ "success": true, "message": "SKU rule saved", "rule": rule })))
}

#[instrument(skip(_admin, state))]
pub async fn delete_rule(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    SkuRuleRepository::new(state.pool())
        .delete(SkuRuleId::new(id))
        .await?;
    Ok(Json(json!({ "success": true, "message": "SKU rule deleted" })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_actions() {
        let action: CategoryAction =
            serde_json::from_str(r#"{"action":"delete","name":"Mugs","reassign_to":"Cups"}"#)
                .unwrap();
        assert!(matches!(
            action,
            CategoryAction::Delete { ref name, reassign_to: Some(ref target) }
                if name == "Mugs" && target == "Cups"
        ));

        let action: CategoryAction =
            serde_json::from_str(r#"{"action":"reorder","names":["A","b"]}"#).unwrap();
        assert!(matches!(action, CategoryAction::Reorder { names } if names.len() == 2));
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!(serde_json::from_str::<CategoryAction>(r#"{"action":"explode"}"#).is_err());
    }

    #[test]
    fn test_required_trims() {
        assert_eq!(required("  Mugs ", "Name required").unwrap(), "Mugs");
        assert!(required("   ", "Name required").is_err());
    }
}
