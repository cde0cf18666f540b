//! Ticket store: persistence for tickets, comments, the catalog and the user directory.
//!
//! # Backends
//!
//! - [`PgStore`] - `PostgreSQL`, used by the server and CLI
//! - [`MemoryStore`] - in-process maps, used by tests and local experiments
//!
//! Both implement the same traits, and the services are generic over them.
//!
//! # Tables (`helpdesk` schema)
//!
//! - `categories` - Reporting categories
//! - `issue_types` - Selectable issue types, one category each
//! - `users` - Directory mirror of the identity provider
//! - `tickets` - Tickets with a `version` column for conditional writes
//! - `comments` - Append-only ticket comments
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p helpdesk-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use helpdesk_core::{
    Category, CategoryId, Comment, DirectoryEntry, IssueType, IssueTypeId, NewComment, NewTicket,
    Ticket, TicketId, TicketRevision, TicketStatus, UserId,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// The ticket changed since the caller read it.
    #[error("version conflict")]
    VersionConflict,

    /// The row is still referenced by tickets.
    #[error("still referenced: {0}")]
    InUse(String),

    /// Constraint violation (e.g., duplicate category name).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Which tickets a listing may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every ticket (IT staff).
    All,
    /// Tickets the user requested or is assigned to.
    Involving(UserId),
}

/// Store-level ticket query.
///
/// Results are ordered with non-closed tickets first, then by `updated_at`,
/// `created_at` and id, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketQuery {
    pub scope: Scope,
    /// Case-insensitive substring of title or description.
    pub text: Option<String>,
    pub status: Option<TicketStatus>,
    /// Inclusive lower bound on `updated_at`.
    pub updated_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `updated_at`.
    pub updated_before: Option<DateTime<Utc>>,
}

impl TicketQuery {
    /// A query for everything in `scope`.
    #[must_use]
    pub const fn scoped(scope: Scope) -> Self {
        Self {
            scope,
            text: None,
            status: None,
            updated_from: None,
            updated_before: None,
        }
    }

    /// Whether `ticket` satisfies the query.
    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        let in_scope = match self.scope {
            Scope::All => true,
            Scope::Involving(user) => ticket.requester == user || ticket.assignee == Some(user),
        };
        let text_ok = self.text.as_deref().is_none_or(|needle| {
            let needle = needle.to_lowercase();
            ticket.title.to_lowercase().contains(&needle)
                || ticket.description.to_lowercase().contains(&needle)
        });
        in_scope
            && text_ok
            && self.status.is_none_or(|s| ticket.status == s)
            && self.updated_from.is_none_or(|from| ticket.updated_at >= from)
            && self.updated_before.is_none_or(|before| ticket.updated_at < before)
    }
}

/// Sort tickets the way listings present them: open work first, newest first.
pub fn sort_open_first(tickets: &mut [Ticket]) {
    tickets.sort_by(|a, b| {
        a.is_closed()
            .cmp(&b.is_closed())
            .then_with(|| b.updated_at.cmp(&a.updated_at))
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Ticket and comment persistence.
pub trait TicketStore: Send + Sync + 'static {
    /// Fetch a ticket by id.
    fn get_ticket(
        &self,
        id: TicketId,
    ) -> impl Future<Output = Result<Option<Ticket>, RepositoryError>> + Send;

    /// List tickets matching `query`, ordered open-first.
    fn list_tickets(
        &self,
        query: &TicketQuery,
    ) -> impl Future<Output = Result<Vec<Ticket>, RepositoryError>> + Send;

    /// Tickets with `start <= created_at < end`, in one consistent read.
    fn tickets_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Ticket>, RepositoryError>> + Send;

    /// Insert a ticket in status `open` with version 1.
    fn insert_ticket(
        &self,
        ticket: NewTicket,
    ) -> impl Future<Output = Result<Ticket, RepositoryError>> + Send;

    /// Write `revision` if the stored version still equals `expected_version`.
    ///
    /// `comment`, when given, is appended in the same transaction before the
    /// ticket row changes. Either both are persisted or neither is.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::VersionConflict`] if the ticket changed,
    /// [`RepositoryError::NotFound`] if it no longer exists.
    fn update_ticket(
        &self,
        id: TicketId,
        expected_version: i32,
        revision: TicketRevision,
        comment: Option<NewComment>,
    ) -> impl Future<Output = Result<Ticket, RepositoryError>> + Send;

    /// Append a comment.
    fn insert_comment(
        &self,
        ticket: TicketId,
        comment: NewComment,
    ) -> impl Future<Output = Result<Comment, RepositoryError>> + Send;

    /// All comments of a ticket, oldest first.
    fn list_comments(
        &self,
        ticket: TicketId,
    ) -> impl Future<Output = Result<Vec<Comment>, RepositoryError>> + Send;
}

/// Categories and issue types.
pub trait CatalogStore: Send + Sync + 'static {
    /// All categories ordered by name.
    fn list_categories(&self)
    -> impl Future<Output = Result<Vec<Category>, RepositoryError>> + Send;

    /// Issue types ordered by name, optionally only active ones.
    fn list_issue_types(
        &self,
        active_only: bool,
    ) -> impl Future<Output = Result<Vec<IssueType>, RepositoryError>> + Send;

    fn get_issue_type(
        &self,
        id: IssueTypeId,
    ) -> impl Future<Output = Result<Option<IssueType>, RepositoryError>> + Send;

    /// # Errors
    ///
    /// [`RepositoryError::Conflict`] if the name is taken.
    fn insert_category(
        &self,
        name: &str,
        description: &str,
    ) -> impl Future<Output = Result<Category, RepositoryError>> + Send;

    /// # Errors
    ///
    /// [`RepositoryError::Conflict`] if the name is taken within the category,
    /// [`RepositoryError::NotFound`] if the category does not exist.
    fn insert_issue_type(
        &self,
        name: &str,
        category: CategoryId,
        active: bool,
    ) -> impl Future<Output = Result<IssueType, RepositoryError>> + Send;

    fn set_issue_type_active(
        &self,
        id: IssueTypeId,
        active: bool,
    ) -> impl Future<Output = Result<IssueType, RepositoryError>> + Send;

    /// # Errors
    ///
    /// [`RepositoryError::InUse`] if any ticket references the issue type.
    fn delete_issue_type(
        &self,
        id: IssueTypeId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a category together with its issue types.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::InUse`] if any ticket references the category or
    /// one of its issue types.
    fn delete_category(
        &self,
        id: CategoryId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Users mirrored from the identity provider.
pub trait Directory: Send + Sync + 'static {
    fn find_user(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<DirectoryEntry>, RepositoryError>> + Send;

    /// Insert or refresh a directory entry.
    fn upsert_user(
        &self,
        entry: DirectoryEntry,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Remember the contact string a user last typed. Unknown users are ignored.
    fn remember_contact(
        &self,
        id: UserId,
        contact: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Everything the helpdesk services need from a backend.
pub trait HelpdeskStore: TicketStore + CatalogStore + Directory {}

impl<T: TicketStore + CatalogStore + Directory> HelpdeskStore for T {}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ticket(id: i32, status: TicketStatus, updated_day: u32) -> Ticket {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        Ticket {
            id: TicketId::new(id),
            issue_type: None,
            title: "Printer Jam".to_string(),
            category: None,
            description: "Tray two is STUCK".to_string(),
            status,
            contact: String::new(),
            requester: UserId::new(1),
            assignee: Some(UserId::new(2)),
            created_at: created,
            updated_at: Utc.with_ymd_and_hms(2024, 1, updated_day, 8, 0, 0).unwrap(),
            version: 1,
        }
    }

    #[test]
    fn test_text_match_is_case_insensitive_on_both_fields() {
        let t = ticket(1, TicketStatus::Open, 2);
        let mut query = TicketQuery::scoped(Scope::All);
        query.text = Some("printer".to_string());
        assert!(query.matches(&t));
        query.text = Some("stuck".to_string());
        assert!(query.matches(&t));
        query.text = Some("network".to_string());
        assert!(!query.matches(&t));
    }

    #[test]
    fn test_scope_involving_requester_or_assignee() {
        let t = ticket(1, TicketStatus::Open, 2);
        assert!(TicketQuery::scoped(Scope::Involving(UserId::new(1))).matches(&t));
        assert!(TicketQuery::scoped(Scope::Involving(UserId::new(2))).matches(&t));
        assert!(!TicketQuery::scoped(Scope::Involving(UserId::new(3))).matches(&t));
    }

    #[test]
    fn test_updated_range_bounds() {
        let t = ticket(1, TicketStatus::Open, 5);
        let mut query = TicketQuery::scoped(Scope::All);
        query.updated_from = Some(t.updated_at);
        query.updated_before = Some(t.updated_at);
        assert!(!query.matches(&t));
        query.updated_before = Some(t.updated_at + chrono::Duration::seconds(1));
        assert!(query.matches(&t));
    }

    #[test]
    fn test_sort_open_first_then_newest() {
        let mut tickets = vec![
            ticket(1, TicketStatus::Closed, 9),
            ticket(2, TicketStatus::Open, 3),
            ticket(3, TicketStatus::OnHold, 7),
            ticket(4, TicketStatus::Open, 3),
        ];
        sort_open_first(&mut tickets);
        let ids: Vec<i32> = tickets.iter().map(|t| t.id.as_i32()).collect();
        assert_eq!(ids, vec![3, 4, 2, 1]);
    }
}
