//! Dashboard route handler.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use super::tickets::ListParams;
use crate::db::HelpdeskStore;
use crate::error::Result;
use crate::middleware::CurrentActor;
use crate::services::Dashboard;
use crate::state::AppState;

/// Build the dashboard router.
pub fn router<S: HelpdeskStore>() -> Router<AppState<S>> {
    Router::new().route("/dashboard", get(dashboard::<S>))
}

async fn dashboard<S: HelpdeskStore>(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState<S>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Dashboard>> {
    Ok(Json(
        state.helpdesk().dashboard(&actor, &params.filter()).await?,
    ))
}
