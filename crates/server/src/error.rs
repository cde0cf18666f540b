//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures store failures to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::HelpdeskError;

/// Application-level error type for the JSON API.
#[derive(Debug, Error)]
pub enum AppError {
    /// A helpdesk operation failed.
    #[error(transparent)]
    Helpdesk(#[from] HelpdeskError),

    /// The identity headers are missing or malformed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The request body is not the JSON the route expects.
    #[error("Invalid request body: {message}")]
    InvalidBody { status: StatusCode, message: String },
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Helpdesk(err) => match err {
                HelpdeskError::AuthorizationDenied { .. } => StatusCode::FORBIDDEN,
                HelpdeskError::TerminalStateViolation
                | HelpdeskError::AlreadyClaimed
                | HelpdeskError::InvalidTransition { .. }
                | HelpdeskError::ConcurrentModification
                | HelpdeskError::CatalogInUse(_)
                | HelpdeskError::Duplicate(_) => StatusCode::CONFLICT,
                HelpdeskError::InvalidIssueType
                | HelpdeskError::InvalidAssignee
                | HelpdeskError::BlankName(_) => StatusCode::UNPROCESSABLE_ENTITY,
                HelpdeskError::EmptyComment | HelpdeskError::InvalidYear(_) => {
                    StatusCode::BAD_REQUEST
                }
                HelpdeskError::NotFound(_) => StatusCode::NOT_FOUND,
                HelpdeskError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidBody { status, .. } => *status,
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Helpdesk(err) => match err {
                HelpdeskError::AuthorizationDenied { .. } => "authorization_denied",
                HelpdeskError::TerminalStateViolation => "terminal_state_violation",
                HelpdeskError::AlreadyClaimed => "already_claimed",
                HelpdeskError::InvalidIssueType => "invalid_issue_type",
                HelpdeskError::InvalidAssignee => "invalid_assignee",
                HelpdeskError::EmptyComment => "empty_comment",
                HelpdeskError::NotFound(_) => "not_found",
                HelpdeskError::InvalidTransition { .. } => "invalid_transition",
                HelpdeskError::ConcurrentModification => "concurrent_modification",
                HelpdeskError::CatalogInUse(_) => "catalog_in_use",
                HelpdeskError::Duplicate(_) => "duplicate",
                HelpdeskError::BlankName(_) => "blank_name",
                HelpdeskError::InvalidYear(_) => "invalid_year",
                HelpdeskError::StoreUnavailable(_) => "store_unavailable",
            },
            Self::Unauthorized(_) => "unauthorized",
            Self::InvalidBody { .. } => "invalid_body",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let store_failure = matches!(&self, Self::Helpdesk(err) if err.is_store_failure());

        // Capture server errors to Sentry
        if store_failure {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if store_failure {
            "Service temporarily unavailable".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": self.code(),
            "message": message,
        }));
        (self.status(), body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// JSON body extractor whose rejection is turned into an [`AppError`] by the
/// handler with `?`.
pub type JsonBody<T> = std::result::Result<Json<T>, JsonRejection>;

/// Set the Sentry user context from the acting user's id.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}
