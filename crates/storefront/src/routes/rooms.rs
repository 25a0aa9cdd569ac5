//! Room pages.

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
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::RoomPage;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "room.html")]
pub struct RoomTemplate {
    pub ctx: PageContext,
    pub title: String,
    pub page: Arc<RoomPage>,
}

/// A room shows its primary category's items; unknown rooms are 404.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(room_number): Path<i32>,
) -> Result<impl IntoResponse> {
    let page = state
        .catalog()
        .room(state.pool(), room_number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Room {room_number}")))?;
    Ok(RoomTemplate {
        ctx: PageContext::load(&state, &session, user).await,
        title: page.title(),
        page,
    })
}
