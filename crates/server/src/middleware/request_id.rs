//! Request correlation for the helpdesk API.
//!
//! Every request gets an id: the proxy's `x-request-id` if it looks sane,
//! a fresh UUID v4 otherwise. Requests under `/tickets/{id}` are also tagged
//! with the ticket id so log lines and Sentry events for one ticket can be
//! found together.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

use helpdesk_core::TicketId;

/// Header carrying the request id, in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_UPSTREAM_ID_LEN: usize = 128;

/// The upstream id, if it is short printable ASCII without spaces.
fn upstream_id(raw: &str) -> Option<&str> {
    let ok = !raw.is_empty()
        && raw.len() <= MAX_UPSTREAM_ID_LEN
        && raw.bytes().all(|b| b.is_ascii_graphic());
    ok.then_some(raw)
}

/// Ticket addressed by `path`, for `/tickets/{id}` and its sub-resources.
fn ticket_in_path(path: &str) -> Option<TicketId> {
    let mut segments = path.trim_start_matches('/').split('/');
    if segments.next()? != "tickets" {
        return None;
    }
    segments.next()?.parse::<i32>().ok().map(TicketId::new)
}

/// Assign the request id, tag the ticket, echo the id back.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(upstream_id)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);
    let ticket = ticket_in_path(request.uri().path());

    let span = Span::current();
    span.record("request_id", &request_id);
    if let Some(ticket) = ticket {
        span.record("ticket", ticket.as_i32());
    }

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
        if let Some(ticket) = ticket {
            scope.set_tag("ticket", ticket);
        }
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
