//! Helpdesk service error types.

use thiserror::Error;

use helpdesk_core::{CommentBodyError, Denial, TicketStatus};

use crate::db::RepositoryError;

/// Errors returned by helpdesk operations.
#[derive(Debug, Error)]
pub enum HelpdeskError {
    /// The actor may not perform the operation.
    #[error("not allowed to {operation}")]
    AuthorizationDenied { operation: &'static str },

    /// The ticket is closed.
    #[error("ticket is closed")]
    TerminalStateViolation,

    /// Another staff member owns the ticket, or won a concurrent claim.
    #[error("ticket is already claimed")]
    AlreadyClaimed,

    /// The issue type is inactive.
    #[error("issue type is not active")]
    InvalidIssueType,

    /// The assignee is unknown, inactive or not IT staff.
    #[error("assignee must be an active IT staff member")]
    InvalidAssignee,

    /// Comment text was empty after trimming.
    #[error("comment cannot be empty")]
    EmptyComment,

    /// The named entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The requested status change is not allowed.
    #[error("cannot move ticket from {from} to {to}")]
    InvalidTransition { from: TicketStatus, to: TicketStatus },

    /// The ticket changed since it was read.
    #[error("ticket was modified concurrently, reload and retry")]
    ConcurrentModification,

    /// A catalog entry is still referenced by tickets.
    #[error("still in use: {0}")]
    CatalogInUse(String),

    /// A catalog name is already taken.
    #[error("already exists: {0}")]
    Duplicate(String),

    /// A catalog entry was given a blank name.
    #[error("{0} name cannot be blank")]
    BlankName(&'static str),

    /// The summary year is out of range.
    #[error("invalid year {0}")]
    InvalidYear(i32),

    /// The store failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl HelpdeskError {
    /// Translate a policy denial for `operation` into an error.
    #[must_use]
    pub const fn denied(operation: &'static str, denial: Denial) -> Self {
        match denial {
            Denial::NotVisible | Denial::NotStaff | Denial::NotAssignee => {
                Self::AuthorizationDenied { operation }
            }
            Denial::Closed => Self::TerminalStateViolation,
            Denial::ClaimedBy(_) => Self::AlreadyClaimed,
        }
    }

    /// Whether the error comes from the store rather than the caller.
    #[must_use]
    pub const fn is_store_failure(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<RepositoryError> for HelpdeskError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                Self::StoreUnavailable(err.to_string())
            }
            RepositoryError::NotFound => Self::NotFound("record"),
            RepositoryError::VersionConflict => Self::ConcurrentModification,
            RepositoryError::InUse(what) => Self::CatalogInUse(what),
            RepositoryError::Conflict(what) => Self::Duplicate(what),
        }
    }
}

impl From<CommentBodyError> for HelpdeskError {
    fn from(err: CommentBodyError) -> Self {
        match err {
            CommentBodyError::Empty => Self::EmptyComment,
        }
    }
}
