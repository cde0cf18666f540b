//! Ticket route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;

use helpdesk_core::{Comment, IssueTypeId, Ticket, TicketChanges, TicketId};

use crate::db::HelpdeskStore;
use crate::error::{JsonBody, Result};
use crate::middleware::CurrentActor;
use crate::services::{TicketDetail, TicketFilter};
use crate::state::AppState;

/// Build the tickets router.
pub fn router<S: HelpdeskStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/tickets", get(list::<S>).post(create::<S>))
        .route("/tickets/{id}", get(detail::<S>).post(update::<S>))
        .route("/tickets/{id}/claim", post(claim::<S>))
        .route("/tickets/{id}/accept", post(accept::<S>))
        .route("/tickets/{id}/close", post(close::<S>))
        .route(
            "/tickets/{id}/comments",
            get(comments::<S>).post(add_comment::<S>),
        )
}

/// Raw listing filter from the query string.
///
/// Values are kept as strings so that blank or malformed entries are dropped
/// instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub status: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl ListParams {
    /// Parse into a ticket filter.
    #[must_use]
    pub fn filter(&self) -> TicketFilter {
        TicketFilter::from_raw(
            self.q.as_deref(),
            self.status.as_deref(),
            self.date_from.as_deref(),
            self.date_to.as_deref(),
        )
    }
}

/// Request for opening a ticket.
#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub issue_type: IssueTypeId,
    #[serde(default)]
    pub description: String,
    /// Blank falls back to the contact remembered for the requester.
    #[serde(default)]
    pub contact: String,
}

/// Request for closing a ticket.
#[derive(Debug, Deserialize)]
pub struct CloseRequest {
    pub comment: Option<String>,
}

/// Request for adding a comment.
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub body: String,
    #[serde(default)]
    pub internal: bool,
}

async fn list<S: HelpdeskStore>(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState<S>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Ticket>>> {
    let tickets = state
        .helpdesk()
        .list_tickets(&actor, &params.filter())
        .await?;
    Ok(Json(tickets))
}

async fn create<S: HelpdeskStore>(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState<S>>,
    body: JsonBody<CreateTicketRequest>,
) -> Result<(StatusCode, Json<Ticket>)> {
    let Json(body) = body?;
    let ticket = state
        .helpdesk()
        .create_ticket(&actor, body.issue_type, &body.description, &body.contact)
        .await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

async fn detail<S: HelpdeskStore>(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState<S>>,
    Path(id): Path<TicketId>,
) -> Result<Json<TicketDetail>> {
    Ok(Json(state.helpdesk().ticket_detail(&actor, id).await?))
}

async fn update<S: HelpdeskStore>(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState<S>>,
    Path(id): Path<TicketId>,
    changes: JsonBody<TicketChanges>,
) -> Result<Json<Ticket>> {
    let Json(changes) = changes?;
    Ok(Json(state.helpdesk().update_ticket(&actor, id, changes).await?))
}

async fn claim<S: HelpdeskStore>(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState<S>>,
    Path(id): Path<TicketId>,
) -> Result<Json<Ticket>> {
    Ok(Json(state.helpdesk().claim_ticket(&actor, id).await?))
}

async fn accept<S: HelpdeskStore>(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState<S>>,
    Path(id): Path<TicketId>,
) -> Result<Json<Ticket>> {
    Ok(Json(state.helpdesk().accept_ticket(&actor, id).await?))
}

async fn close<S: HelpdeskStore>(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState<S>>,
    Path(id): Path<TicketId>,
    body: std::result::Result<Option<Json<CloseRequest>>, JsonRejection>,
) -> Result<Json<Ticket>> {
    let comment = body?.and_then(|Json(body)| body.comment);
    let ticket = state
        .helpdesk()
        .close_ticket(&actor, id, comment.as_deref())
        .await?;
    Ok(Json(ticket))
}

async fn comments<S: HelpdeskStore>(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState<S>>,
    Path(id): Path<TicketId>,
) -> Result<Json<Vec<Comment>>> {
    Ok(Json(state.helpdesk().list_comments(&actor, id).await?))
}

async fn add_comment<S: HelpdeskStore>(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState<S>>,
    Path(id): Path<TicketId>,
    body: JsonBody<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    let Json(body) = body?;
    let comment = state
        .helpdesk()
        .add_comment(&actor, id, &body.body, body.internal)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
