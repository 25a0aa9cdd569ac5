//! Dashboard.

use askama::Template;
use axum::{Router, extract::State, response::Response, routing::get};
use tracing::instrument;

use super::{Layout, render};
use crate::db::ReportRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::DashboardStats;
use crate::state::AppState;

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub stats: DashboardStats,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index))
}

#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let stats = ReportRepository::new(state.pool()).dashboard().await?;
    Ok(render(&DashboardTemplate {
        layout: Layout::new(&state, &admin, "/"),
        stats,
    }))
}
