//! Shop listing and item detail pages.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use tower_sessions::Session;
use tracing::instrument;

use super::PageContext;
use crate::db::CatalogRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{CategorySection, Item};
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "shop.html")]
pub struct ShopTemplate {
    pub ctx: PageContext,
    pub sections: Arc<Vec<CategorySection>>,
}

#[derive(Template, WebTemplate)]
#[template(path = "item.html")]
pub struct ItemTemplate {
    pub ctx: PageContext,
    pub item: Item,
}

/// Every visible item, grouped by category in category order.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse> {
    let sections = state.catalog().shop(state.pool()).await?;
    Ok(ShopTemplate {
        ctx: PageContext::load(&state, &session, user).await,
        sections,
    })
}

#[instrument(skip(state, session, user))]
pub async fn item(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(sku): Path<String>,
) -> Result<impl IntoResponse> {
    let item = CatalogRepository::new(state.pool())
        .get_item(&sku)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item {sku}")))?;
    Ok(ItemTemplate {
        ctx: PageContext::load(&state, &session, user).await,
        item,
    })
}
