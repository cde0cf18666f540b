//! Year summary report handler.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::db::HelpdeskStore;
use crate::error::Result;
use crate::middleware::CurrentActor;
use crate::services::YearSummary;
use crate::state::AppState;

/// Build the reports router.
pub fn router<S: HelpdeskStore>() -> Router<AppState<S>> {
    Router::new().route("/reports/summary/{year}", get(year_summary::<S>))
}

/// Month-by-category counts for `year`, consumed by the report renderer.
async fn year_summary<S: HelpdeskStore>(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState<S>>,
    Path(year): Path<i32>,
) -> Result<Json<YearSummary>> {
    Ok(Json(state.helpdesk().year_summary(&actor, year).await?))
}
