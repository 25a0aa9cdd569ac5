//! Room settings and room/category assignments.

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

use whimsical_frog_core::{CategoryId, RoomAssignmentId};

use super::{Layout, render};
use crate::db::{CategoryRepository, RoomRepository};
use crate::error::{ApiError, ApiResult, AppError};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{CategorySummary, Room, RoomAssignment, RoomInput};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "rooms.html")]
pub struct RoomsTemplate {
    pub layout: Layout,
    pub rooms: Vec<Room>,
    pub assignments: Vec<RoomAssignment>,
    pub categories: Vec<CategorySummary>,
}

#[derive(Debug, Deserialize)]
pub struct AssignmentInput {
    pub room_number: i32,
    pub category_id: CategoryId,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub display_order: i32,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(page))
        .route("/api/rooms", post(upsert))
        .route("/api/rooms/{room_number}", delete(remove))
        .route("/api/room-assignments", get(assignments).post(assign))
        .route("/api/room-assignments/{id}", delete(unassign))
}

#[instrument(skip(admin, state))]
pub async fn page(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let repo = RoomRepository::new(state.pool());
    let rooms = repo.list().await?;
    let assignments = repo.assignments().await?;
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(render(&RoomsTemplate {
        layout: Layout::new(&state, &admin, "/rooms"),
        rooms,
        assignments,
        categories,
    }))
}

#[instrument(skip(_admin, state, payload))]
pub async fn upsert(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    payload: Result<Json<RoomInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(input) = payload?;
    let input = input.validate().map_err(ApiError::bad_request)?;
    let room = RoomRepository::new(state.pool()).upsert(&input).await?;
    tracing::info!(room_number = room.room_number, "Room saved");
    Ok(Json(json!({ "success": true, "message": "Room saved", "room": room })))
}

/// Active rooms are deactivated; inactive rooms are deleted.
#[instrument(skip(_admin, state))]
pub async fn remove(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(room_number): Path<i32>,
) -> ApiResult<Json<Value>> {
    let removal = RoomRepository::new(state.pool()).remove(room_number).await?;
    tracing::info!(room_number, action = removal.action(), "Room removed");
    Ok(Json(json!({
        "success": true,
        "message": removal.message(),
        "action": removal.action(),
    })))
}

#[instrument(skip(_admin, state))]
pub async fn assignments(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> ApiResult<Json<Value>> {
    let assignments = RoomRepository::new(state.pool()).assignments().await?;
    Ok(Json(json!({ "success": true, "assignments": assignments })))
}

#[instrument(skip(_admin, state, payload))]
pub async fn assign(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    payload: Result<Json<AssignmentInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(input) = payload?;
    let id = RoomRepository::new(state.pool())
        .assign(
            input.room_number,
            input.category_id,
            input.is_primary,
            input.display_order,
        )
        .await?;
    Ok(Json(json!({ "success": true, "message": "Category assigned", "id": id })))
}

#[instrument(skip(_admin, state))]
pub async fn unassign(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    RoomRepository::new(state.pool())
        .unassign(RoomAssignmentId::new(id))
        .await?;
    Ok(Json(json!({ "success": true, "message": "Assignment removed" })))
}
