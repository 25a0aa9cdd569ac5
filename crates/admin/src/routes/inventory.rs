//! Inventory pages and the stock API.

use askama::Template;
use axum::{
    Form, Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::{Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use whimsical_frog_core::CategoryId;

use super::{Flash, Layout, render, with_message};
use crate::db::{CategoryRepository, InventoryRepository, RepositoryError};
use crate::error::{ApiError, ApiResult, AppError};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{CategorySummary, InventoryItem, InventoryQuery, ItemInput};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "inventory/index.html")]
pub struct InventoryTemplate {
    pub layout: Layout,
    pub items: Vec<InventoryItem>,
    pub categories: Vec<CategorySummary>,
    pub search: String,
    pub category_id: Option<CategoryId>,
    pub include_archived: bool,
    pub flash: Flash,
}

impl InventoryTemplate {
    fn is_category(&self, category: &CategorySummary) -> bool {
        self.category_id == Some(category.id)
    }
}

/// Values shown in the item form.
#[derive(Debug, Clone, Default)]
pub struct ItemFormView {
    pub sku: String,
    pub name: String,
    pub category_id: Option<CategoryId>,
    pub stock_level: i32,
    pub reorder_point: i32,
    pub cost_price: String,
    pub retail_price: String,
    pub description: String,
    pub image_url: String,
    pub is_active: bool,
}

impl From<&InventoryItem> for ItemFormView {
    fn from(item: &InventoryItem) -> Self {
        Self {
            sku: item.sku.clone(),
            name: item.name.clone(),
            category_id: item.category_id,
            stock_level: item.stock_level,
            reorder_point: item.reorder_point,
            cost_price: item.cost_price.to_string(),
            retail_price: item.retail_price.to_string(),
            description: item.description.clone(),
            image_url: item.image_url.clone().unwrap_or_default(),
            is_active: item.is_active,
        }
    }
}

#[derive(Template)]
#[template(path = "inventory/form.html")]
pub struct ItemFormTemplate {
    pub layout: Layout,
    pub item: ItemFormView,
    pub categories: Vec<CategorySummary>,
    /// `None` when creating.
    pub editing: Option<String>,
    pub is_archived: bool,
    pub flash: Flash,
}

impl ItemFormTemplate {
    fn is_category(&self, category: &CategorySummary) -> bool {
        self.item.category_id == Some(category.id)
    }

    fn action(&self) -> String {
        self.editing
            .as_ref()
            .map_or_else(|| "/inventory".to_owned(), |sku| format!("/inventory/{sku}"))
    }
}

#[derive(Debug, Deserialize)]
pub struct StockInput {
    pub stock_level: i32,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(index).post(create))
        .route("/inventory/new", get(new_form))
        .route("/inventory/{sku}", post(update))
        .route("/inventory/{sku}/edit", get(edit_form))
        .route("/inventory/{sku}/archive", post(archive))
        .route("/inventory/{sku}/restore", post(restore))
        .route("/api/inventory/{sku}/stock", post(set_stock))
}

#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<InventoryQuery>,
    Query(flash): Query<Flash>,
) -> Result<Response, AppError> {
    let items = InventoryRepository::new(state.pool()).list(&query).await?;
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(render(&InventoryTemplate {
        layout: Layout::new(&state, &admin, "/inventory"),
        items,
        categories,
        search: query.search().unwrap_or_default().to_owned(),
        category_id: query.category_id(),
        include_archived: query.include_archived(),
        flash,
    }))
}

#[instrument(skip(admin, state))]
pub async fn new_form(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(flash): Query<Flash>,
) -> Result<Response, AppError> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(render(&ItemFormTemplate {
        layout: Layout::new(&state, &admin, "/inventory"),
        item: ItemFormView {
            is_active: true,
            cost_price: "0.00".to_owned(),
            retail_price: "0.00".to_owned(),
            ..ItemFormView::default()
        },
        categories,
        editing: None,
        is_archived: false,
        flash,
    }))
}

#[instrument(skip(_admin, state, input), fields(name = %input.name))]
pub async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Form(input): Form<ItemInput>,
) -> Result<Redirect, AppError> {
    let input = match input.validate() {
        Ok(input) => input,
        Err(e) => {
            return Ok(Redirect::to(&with_message("/inventory/new", "error", &e.to_string())));
        }
    };

    let code = match CategoryRepository::new(state.pool())
        .sku_code_for(input.category_id.map(CategoryId::new))
        .await
    {
        Ok(code) => code,
        Err(RepositoryError::NotFound) => {
            return Ok(Redirect::to(&with_message("/inventory/new", "error", "Category not found")));
        }
        Err(e) => return Err(e.into()),
    };

    match InventoryRepository::new(state.pool()).create(&input, &code).await {
        Ok(sku) => {
            tracing::info!(%sku, "Item created");
            Ok(Redirect::to(&with_message(
                &format!("/inventory/{sku}/edit"),
                "success",
                &format!("Item {sku} created"),
            )))
        }
        Err(RepositoryError::Conflict(message)) => Ok(Redirect::to(&with_message(
            "/inventory/new",
            "error",
            &message,
        ))),
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(admin, state))]
pub async fn edit_form(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Query(flash): Query<Flash>,
) -> Result<Response, AppError> {
    let item = InventoryRepository::new(state.pool())
        .get(&sku)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item {sku}")))?;
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(render(&ItemFormTemplate {
        layout: Layout::new(&state, &admin, "/inventory"),
        item: ItemFormView::from(&item),
        categories,
        editing: Some(item.sku.clone()),
        is_archived: item.is_archived,
        flash,
    }))
}

#[instrument(skip(_admin, state, input))]
pub async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Form(input): Form<ItemInput>,
) -> Result<Redirect, AppError> {
    let edit_path = format!("/inventory/{sku}/edit");
    let input = match input.validate() {
        Ok(input) => input,
        Err(e) => return Ok(Redirect::to(&with_message(&edit_path, "error", &e.to_string()))),
    };

    match InventoryRepository::new(state.pool()).update(&sku, &input).await {
        Ok(()) => Ok(Redirect::to(&with_message(&edit_path, "success", "Item saved"))),
        Err(RepositoryError::Conflict(message)) => {
            Ok(Redirect::to(&with_message(&edit_path, "error", &message)))
        }
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(_admin, state))]
pub async fn archive(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> Result<Redirect, AppError> {
    InventoryRepository::new(state.pool())
        .set_archived(&sku, true)
        .await?;
    tracing::info!(%sku, "Item archived");
    Ok(Redirect::to(&with_message("/inventory", "success", &format!("Item {sku} archived"))))
}

#[instrument(skip(_admin, state))]
pub async fn restore(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> Result<Redirect, AppError> {
    InventoryRepository::new(state.pool())
        .set_archived(&sku, false)
        .await?;
    Ok(Redirect::to(&with_message(
        &format!("/inventory/{sku}/edit"),
        "success",
        "Item restored",
    )))
}

/// `POST /api/inventory/{sku}/stock` with `{"stock_level": n}`.
#[instrument(skip(_admin, state, payload))]
pub async fn set_stock(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(sku): Path<String>,
    payload: Result<Json<StockInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(input) = payload?;
    if input.stock_level < 0 {
        return Err(ApiError::bad_request("Stock level cannot be negative"));
    }
    let item = InventoryRepository::new(state.pool())
        .set_stock(&sku, input.stock_level)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Stock updated",
        "sku": item.sku,
        "stock_level": item.stock_level,
        "is_low_stock": item.is_low_stock(),
    })))
}
