//! Ticket comments.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{CommentId, TicketId, UserId};

/// Errors that can occur when parsing a [`CommentBody`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CommentBodyError {
    /// The input is empty or only whitespace.
    #[error("comment cannot be empty")]
    Empty,
}

/// The text of a comment.
///
/// Surrounding whitespace is trimmed and the remainder must not be empty.
///
/// ## Examples
///
/// ```
/// use helpdesk_core::CommentBody;
///
/// assert_eq!(CommentBody::parse("  fixed  ").unwrap().as_str(), "fixed");
/// assert!(CommentBody::parse("").is_err());
/// assert!(CommentBody::parse(" \n\t ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct CommentBody(String);

impl CommentBody {
    /// Parse a `CommentBody` from user input.
    ///
    /// # Errors
    ///
    /// Returns [`CommentBodyError::Empty`] if nothing remains after trimming.
    pub fn parse(s: &str) -> Result<Self, CommentBodyError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CommentBodyError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Get the comment text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the body, returning the text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CommentBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CommentBody {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An immutable annotation on a ticket.
///
/// Comments are append-only and ordered by `created_at`, then `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub ticket: TicketId,
    pub author: UserId,
    pub body: CommentBody,
    /// Visible to IT staff only.
    pub internal: bool,
    pub created_at: DateTime<Utc>,
}

/// A comment about to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub author: UserId,
    pub body: CommentBody,
    pub internal: bool,
}

impl NewComment {
    /// A comment the requester can read.
    #[must_use]
    pub const fn public(author: UserId, body: CommentBody) -> Self {
        Self {
            author,
            body,
            internal: false,
        }
    }
}
