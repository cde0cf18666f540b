//! Catalog route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::Deserialize;

use helpdesk_core::{Category, CategoryId, IssueType, IssueTypeId};

use crate::db::HelpdeskStore;
use crate::error::{JsonBody, Result};
use crate::middleware::CurrentActor;
use crate::state::AppState;

/// Build the catalog router.
pub fn router<S: HelpdeskStore>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/catalog/categories",
            get(list_categories::<S>).post(create_category::<S>),
        )
        .route("/catalog/categories/{id}", delete(delete_category::<S>))
        .route(
            "/catalog/issue-types",
            get(list_issue_types::<S>).post(create_issue_type::<S>),
        )
        .route("/catalog/issue-types/{id}", delete(delete_issue_type::<S>))
        .route("/catalog/issue-types/{id}/active", post(set_active::<S>))
}

#[derive(Debug, Default, Deserialize)]
pub struct IssueTypeParams {
    /// Include retired issue types.
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateIssueTypeRequest {
    pub name: String,
    pub category: CategoryId,
    #[serde(default = "active_default")]
    pub active: bool,
}

const fn active_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

async fn list_categories<S: HelpdeskStore>(
    CurrentActor(_actor): CurrentActor,
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.helpdesk().list_categories().await?))
}

async fn create_category<S: HelpdeskStore>(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState<S>>,
    body: JsonBody<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    let Json(body) = body?;
    let category = state
        .helpdesk()
        .create_category(&actor, &body.name, &body.description)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn delete_category<S: HelpdeskStore>(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState<S>>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    state.helpdesk().delete_category(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_issue_types<S: HelpdeskStore>(
    CurrentActor(_actor): CurrentActor,
    State(state): State<AppState<S>>,
    Query(params): Query<IssueTypeParams>,
) -> Result<Json<Vec<IssueType>>> {
    Ok(Json(state.helpdesk().list_issue_types(!params.all).await?))
}

async fn create_issue_type<S: HelpdeskStore>(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState<S>>,
    body: JsonBody<CreateIssueTypeRequest>,
) -> Result<(StatusCode, Json<IssueType>)> {
    let Json(body) = body?;
    let issue_type = state
        .helpdesk()
        .create_issue_type(&actor, &body.name, body.category, body.active)
        .await?;
    Ok((StatusCode::CREATED, Json(issue_type)))
}

async fn set_active<S: HelpdeskStore>(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState<S>>,
    Path(id): Path<IssueTypeId>,
    body: JsonBody<SetActiveRequest>,
) -> Result<Json<IssueType>> {
    let Json(body) = body?;
    Ok(Json(
        state
            .helpdesk()
            .set_issue_type_active(&actor, id, body.active)
            .await?,
    ))
}

async fn delete_issue_type<S: HelpdeskStore>(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState<S>>,
    Path(id): Path<IssueTypeId>,
) -> Result<StatusCode> {
    state.helpdesk().delete_issue_type(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
