//! Sales report.

use askama::Template;
use axum::{
    Router,
    extract::{Query, State},
    response::Response,
    routing::get,
};
use tracing::instrument;

use super::{Layout, render};
use crate::db::ReportRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{DateRange, DateRangeQuery, Report};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "reports.html")]
pub struct ReportsTemplate {
    pub layout: Layout,
    pub report: Report,
}

impl ReportsTemplate {
    /// Value for the start date input; blank for the open default.
    fn start_value(&self) -> String {
        if self.report.range.start == DateRange::DEFAULT_START {
            String::new()
        } else {
            self.report.range.start.to_string()
        }
    }

    fn end_value(&self) -> String {
        if self.report.range.end == DateRange::DEFAULT_END {
            String::new()
        } else {
            self.report.range.end.to_string()
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/reports", get(index))
}

#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Response, AppError> {
    let range = DateRange::from_query(&query);
    let report = ReportRepository::new(state.pool()).report(range).await?;
    Ok(render(&ReportsTemplate {
        layout: Layout::new(&state, &admin, "/reports"),
        report,
    }))
}
