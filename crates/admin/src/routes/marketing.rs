//! Marketing copy editor.
//!
//! `POST /api/marketing/{sku}` actions:
//!
//! ```json
//! {"action": "update_field", "field": "suggested_title", "value": "Froggy Mug"}
//! {"action": "bulk_update", "fields": {"keywords": ["mug"], "brand_voice": "playful"}}
//! {"action": "add_list_item", "field": "keywords", "item": "gift"}
//! {"action": "remove_list_item", "field": "keywords", "item": "gift"}
//! ```

use askama::Template;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    response::Response,
    routing::get,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::instrument;

use whimsical_frog_core::marketing::{FieldKind, MarketingField, normalize_list};

use super::{Layout, render};
use crate::db::MarketingRepository;
use crate::db::marketing::BulkUpdate;
use crate::error::{ApiError, ApiResult, AppError};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::marketing::field_label;
use crate::models::{MarketingItem, MarketingSuggestion};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "marketing/index.html")]
pub struct MarketingIndexTemplate {
    pub layout: Layout,
    pub items: Vec<MarketingItem>,
}

#[derive(Template)]
#[template(path = "marketing/editor.html")]
pub struct MarketingEditorTemplate {
    pub layout: Layout,
    pub item_name: String,
    pub suggestion: MarketingSuggestion,
}

impl MarketingEditorTemplate {
    fn label(&self, name: &str) -> String {
        field_label(name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MarketingAction {
    UpdateField {
        field: String,
        #[serde(default)]
        value: Value,
    },
    BulkUpdate {
        #[serde(default)]
        fields: Map<String, Value>,
    },
    AddListItem {
        field: String,
        #[serde(default)]
        item: String,
    },
    RemoveListItem {
        field: String,
        #[serde(default)]
        item: String,
    },
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/marketing", get(index))
        .route("/marketing/{sku}", get(editor))
        .route("/api/marketing/{sku}", get(fetch).post(act))
}

#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let items = MarketingRepository::new(state.pool()).list_items().await?;
    Ok(render(&MarketingIndexTemplate {
        layout: Layout::new(&state, &admin, "/marketing"),
        items,
    }))
}

#[instrument(skip(admin, state))]
pub async fn editor(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> Result<Response, AppError> {
    let item = crate::db::InventoryRepository::new(state.pool())
        .get(&sku)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item {sku}")))?;
    let suggestion = MarketingRepository::new(state.pool())
        .get(&sku)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item {sku}")))?;
    Ok(render(&MarketingEditorTemplate {
        layout: Layout::new(&state, &admin, "/marketing"),
        item_name: item.name,
        suggestion,
    }))
}

#[instrument(skip(_admin, state))]
pub async fn fetch(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> ApiResult<Json<Value>> {
    let suggestion = MarketingRepository::new(state.pool())
        .get(&sku)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;
    Ok(Json(json!({
        "success": true,
        "exists": suggestion.saved,
        "data": suggestion.to_json(),
    })))
}

fn required_item(item: &str) -> Result<&str, ApiError> {
    let item = item.trim();
    if item.is_empty() {
        Err(ApiError::bad_request("Item required"))
    } else {
        Ok(item)
    }
}

#[instrument(skip(_admin, state, payload))]
pub async fn act(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(sku): Path<String>,
    payload: Result<Json<MarketingAction>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(action) = payload?;
    let repo = MarketingRepository::new(state.pool());

    match action {
        MarketingAction::UpdateField { field, value } => {
            let field = MarketingField::parse(&field)?;
            match field.kind() {
                FieldKind::Text => {
                    let text = match &value {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        _ => String::new(),
                    };
                    let text = field.normalize_text(&text)?;
                    repo.update_text(&sku, field, text.as_deref()).await?;
                }
                FieldKind::List => {
                    let update = BulkUpdate {
                        lists: vec![(field, normalize_list(&value))],
                        ..BulkUpdate::default()
                    };
                    repo.bulk_update(&sku, &update).await?;
                }
            }
            Ok(Json(json!({ "success": true, "message": "Field updated successfully" })))
        }
        MarketingAction::BulkUpdate { fields } => {
            let update = BulkUpdate::from_fields(&fields)?;
            if update.is_empty() {
                return Err(ApiError::bad_request("No fields to update"));
            }
            repo.bulk_update(&sku, &update).await?;
            Ok(Json(json!({
                "success": true,
                "message": "Marketing data updated successfully",
                "updated": update.text.len() + update.lists.len(),
            })))
        }
        MarketingAction::AddListItem { field, item } => {
            let field = MarketingField::parse_list(&field)?;
            let list = repo
                .add_list_item(&sku, field, required_item(&item)?)
                .await?;
            Ok(Json(json!({ "success": true, "message": "Item added", "items": list })))
        }
        MarketingAction::RemoveListItem { field, item } => {
            let field = MarketingField::parse_list(&field)?;
            let list = repo
                .remove_list_item(&sku, field, required_item(&item)?)
                .await?;
            Ok(Json(json!({ "success": true, "message": "Item removed", "items": list })))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bulk_update() {
        let action: MarketingAction = serde_json::from_str(
            r#"{"action":"bulk_update","fields":{"keywords":["frog"],"brand_voice":"playful"}}"#,
        )
        .unwrap();
        assert!(matches!(action, MarketingAction::BulkUpdate { fields } if fields.len() == 2));
    }

    #[test]
    fn test_update_field_value_defaults_to_null() {
        let action: MarketingAction =
            serde_json::from_str(r#"{"action":"update_field","field":"brand_voice"}"#).unwrap();
        assert!(matches!(
            action,
            MarketingAction::UpdateField { value: Value::Null, .. }
        ));
    }

    #[test]
    fn test_required_item() {
        assert_eq!(required_item(" gift ").unwrap(), "gift");
        assert!(required_item("  ").is_err());
    }
}
