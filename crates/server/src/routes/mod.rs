//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness check
//! GET    /health/ready                    - Readiness check (store reachable)
//!
//! # Tickets
//! GET    /tickets                         - List (query: q, status, date_from, date_to)
//! POST   /tickets                         - Create
//! GET    /tickets/{id}                    - Detail: ticket, visible comments, allowed actions
//! POST   /tickets/{id}                    - Update (optional comment)
//! POST   /tickets/{id}/claim              - Claim
//! POST   /tickets/{id}/accept             - Accept
//! POST   /tickets/{id}/close              - Close (optional comment)
//! GET    /tickets/{id}/comments           - Visible comments
//! POST   /tickets/{id}/comments           - Add comment
//!
//! # Dashboard and reports
//! GET    /dashboard                       - KPIs (query: same as list)
//! GET    /reports/summary/{year}          - Year summary (IT staff)
//!
//! # Catalog
//! GET    /catalog/categories              - All categories
//! POST   /catalog/categories              - Create category (IT staff)
//! DELETE /catalog/categories/{id}         - Delete category (IT staff)
//! GET    /catalog/issue-types             - Active issue types (?all=true for every one)
//! POST   /catalog/issue-types             - Create issue type (IT staff)
//! POST   /catalog/issue-types/{id}/active - Activate or retire (IT staff)
//! DELETE /catalog/issue-types/{id}        - Delete issue type (IT staff)
//! ```
//!
//! Every route except the health checks requires the identity headers read by
//! [`CurrentActor`](crate::middleware::CurrentActor).

pub mod catalog;
pub mod dashboard;
pub mod reports;
pub mod tickets;

use axum::Router;

use crate::db::HelpdeskStore;
use crate::state::AppState;

/// Build the complete API router.
pub fn routes<S: HelpdeskStore>() -> Router<AppState<S>> {
    Router::new()
        .merge(tickets::router())
        .merge(dashboard::router())
        .merge(reports::router())
        .merge(catalog::router())
}
