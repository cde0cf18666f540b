//! `PostgreSQL` ticket store.
//!
//! Queries are built at runtime with `sqlx::query_as` so the crate compiles
//! without a live database. Rows are read into private row structs and
//! converted into domain types.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use helpdesk_core::{
    Category, CategoryId, Comment, CommentBody, CommentId, DirectoryEntry, IssueType,
    IssueTypeId, NewComment, NewTicket, Ticket, TicketId, TicketRevision, TicketStatus, UserId,
};

use super::{CatalogStore, Directory, RepositoryError, Scope, TicketQuery, TicketStore};

// =============================================================================
// Internal Row Types
// =============================================================================

const TICKET_COLUMNS: &str = "id, issue_type_id, title, category_id, description, status, \
                              contact, requester_id, assignee_id, created_at, updated_at, version";

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: i32,
    issue_type_id: Option<i32>,
    title: String,
    category_id: Option<i32>,
    description: String,
    status: TicketStatus,
    contact: String,
    requester_id: i32,
    assignee_id: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i32,
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Self {
            id: TicketId::new(row.id),
            issue_type: row.issue_type_id.map(IssueTypeId::new),
            title: row.title,
            category: row.category_id.map(CategoryId::new),
            description: row.description,
            status: row.status,
            contact: row.contact,
            requester: UserId::new(row.requester_id),
            assignee: row.assignee_id.map(UserId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    id: i32,
    ticket_id: i32,
    author_id: i32,
    body: String,
    internal: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<CommentRow> for Comment {
    type Error = RepositoryError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        let body = CommentBody::parse(&row.body).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid comment {} in database: {e}", row.id))
        })?;

        Ok(Self {
            id: CommentId::new(row.id),
            ticket: TicketId::new(row.ticket_id),
            author: UserId::new(row.author_id),
            body,
            internal: row.internal,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i32,
    name: String,
    description: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            description: row.description,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct IssueTypeRow {
    id: i32,
    name: String,
    category_id: i32,
    active: bool,
}

impl From<IssueTypeRow> for IssueType {
    fn from(row: IssueTypeRow) -> Self {
        Self {
            id: IssueTypeId::new(row.id),
            name: row.name,
            category: CategoryId::new(row.category_id),
            active: row.active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    display_name: String,
    is_superuser: bool,
    has_staff_permission: bool,
    is_active: bool,
    contact: String,
}

impl From<UserRow> for DirectoryEntry {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::new(row.id),
            display_name: row.display_name,
            is_superuser: row.is_superuser,
            has_staff_permission: row.has_staff_permission,
            is_active: row.is_active,
            contact: row.contact,
        }
    }
}

/// Map unique violations to [`RepositoryError::Conflict`].
fn conflict_on_unique(message: String) -> impl FnOnce(sqlx::Error) -> RepositoryError {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(message);
        }
        RepositoryError::Database(e)
    }
}

/// Escape `LIKE` wildcards and wrap the needle for a substring match.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// =============================================================================
// Store
// =============================================================================

/// Ticket store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl TicketStore for PgStore {
    async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>, RepositoryError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM helpdesk.tickets WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, RepositoryError> {
        let involving = match query.scope {
            Scope::All => None,
            Scope::Involving(user) => Some(user.as_i32()),
        };
        let pattern = query.text.as_deref().map(like_pattern);

        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            r"
            SELECT {TICKET_COLUMNS}
            FROM helpdesk.tickets
            WHERE ($1::int IS NULL OR requester_id = $1 OR assignee_id = $1)
              AND ($2::text IS NULL OR title ILIKE $2 OR description ILIKE $2)
              AND ($3::helpdesk.ticket_status IS NULL OR status = $3)
              AND ($4::timestamptz IS NULL OR updated_at >= $4)
              AND ($5::timestamptz IS NULL OR updated_at < $5)
            ORDER BY (status = 'closed'), updated_at DESC, created_at DESC, id DESC
            "
        ))
        .bind(involving)
        .bind(pattern)
        .bind(query.status)
        .bind(query.updated_from)
        .bind(query.updated_before)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn tickets_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Ticket>, RepositoryError> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            r"
            SELECT {TICKET_COLUMNS}
            FROM helpdesk.tickets
            WHERE created_at >= $1 AND created_at < $2
            ORDER BY created_at, id
            "
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket, RepositoryError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r"
            INSERT INTO helpdesk.tickets
                (issue_type_id, title, category_id, description, contact, requester_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TICKET_COLUMNS}
            "
        ))
        .bind(ticket.issue_type().as_i32())
        .bind(ticket.title())
        .bind(ticket.category().as_i32())
        .bind(ticket.description())
        .bind(ticket.contact())
        .bind(ticket.requester().as_i32())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update_ticket(
        &self,
        id: TicketId,
        expected_version: i32,
        revision: TicketRevision,
        comment: Option<NewComment>,
    ) -> Result<Ticket, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<i32> =
            sqlx::query_scalar("SELECT version FROM helpdesk.tickets WHERE id = $1 FOR UPDATE")
                .bind(id.as_i32())
                .fetch_optional(&mut *tx)
                .await?;
        match current {
            None => return Err(RepositoryError::NotFound),
            Some(version) if version != expected_version => {
                return Err(RepositoryError::VersionConflict);
            }
            Some(_) => {}
        }

        if let Some(comment) = comment {
            sqlx::query(
                r"
                INSERT INTO helpdesk.comments (ticket_id, author_id, body, internal)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(id.as_i32())
            .bind(comment.author.as_i32())
            .bind(comment.body.as_str())
            .bind(comment.internal)
            .execute(&mut *tx)
            .await?;
        }

        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r"
            UPDATE helpdesk.tickets
            SET issue_type_id = $3,
                title = $4,
                category_id = $5,
                description = $6,
                status = $7,
                contact = $8,
                assignee_id = $9,
                updated_at = now(),
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {TICKET_COLUMNS}
            "
        ))
        .bind(id.as_i32())
        .bind(expected_version)
        .bind(revision.issue_type().map(|it| it.as_i32()))
        .bind(revision.title())
        .bind(revision.category().map(|c| c.as_i32()))
        .bind(&revision.description)
        .bind(revision.status)
        .bind(&revision.contact)
        .bind(revision.assignee.map(|u| u.as_i32()))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::VersionConflict)?;

        tx.commit().await?;

        Ok(row.into())
    }

    async fn insert_comment(
        &self,
        ticket: TicketId,
        comment: NewComment,
    ) -> Result<Comment, RepositoryError> {
        let row = sqlx::query_as::<_, CommentRow>(
            r"
            INSERT INTO helpdesk.comments (ticket_id, author_id, body, internal)
            VALUES ($1, $2, $3, $4)
            RETURNING id, ticket_id, author_id, body, internal, created_at
            ",
        )
        .bind(ticket.as_i32())
        .bind(comment.author.as_i32())
        .bind(comment.body.as_str())
        .bind(comment.internal)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        row.try_into()
    }

    async fn list_comments(&self, ticket: TicketId) -> Result<Vec<Comment>, RepositoryError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r"
            SELECT id, ticket_id, author_id, body, internal, created_at
            FROM helpdesk.comments
            WHERE ticket_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(ticket.as_i32())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

impl CatalogStore for PgStore {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, description FROM helpdesk.categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_issue_types(&self, active_only: bool) -> Result<Vec<IssueType>, RepositoryError> {
        let rows = sqlx::query_as::<_, IssueTypeRow>(
            r"
            SELECT id, name, category_id, active
            FROM helpdesk.issue_types
            WHERE active OR NOT $1
            ORDER BY name, id
            ",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_issue_type(&self, id: IssueTypeId) -> Result<Option<IssueType>, RepositoryError> {
        let row = sqlx::query_as::<_, IssueTypeRow>(
            "SELECT id, name, category_id, active FROM helpdesk.issue_types WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn insert_category(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO helpdesk.categories (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description
            ",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on_unique(format!("category {name:?} already exists")))?;

        Ok(row.into())
    }

    async fn insert_issue_type(
        &self,
        name: &str,
        category: CategoryId,
        active: bool,
    ) -> Result<IssueType, RepositoryError> {
        let row = sqlx::query_as::<_, IssueTypeRow>(
            r"
            INSERT INTO helpdesk.issue_types (name, category_id, active)
            VALUES ($1, $2, $3)
            RETURNING id, name, category_id, active
            ",
        )
        .bind(name)
        .bind(category.as_i32())
        .bind(active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return RepositoryError::Conflict(format!(
                        "issue type {name:?} already exists in category {category}"
                    ));
                }
                if db_err.is_foreign_key_violation() {
                    return RepositoryError::NotFound;
                }
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }

    async fn set_issue_type_active(
        &self,
        id: IssueTypeId,
        active: bool,
    ) -> Result<IssueType, RepositoryError> {
        let row = sqlx::query_as::<_, IssueTypeRow>(
            r"
            UPDATE helpdesk.issue_types SET active = $2
            WHERE id = $1
            RETURNING id, name, category_id, active
            ",
        )
        .bind(id.as_i32())
        .bind(active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn delete_issue_type(&self, id: IssueTypeId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> =
            sqlx::query_scalar("SELECT id FROM helpdesk.issue_types WHERE id = $1 FOR UPDATE")
                .bind(id.as_i32())
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let referenced: i64 =
            sqlx::query_scalar("SELECT count(*) FROM helpdesk.tickets WHERE issue_type_id = $1")
                .bind(id.as_i32())
                .fetch_one(&mut *tx)
                .await?;
        if referenced > 0 {
            return Err(RepositoryError::InUse(format!(
                "issue type {id} is used by {referenced} ticket(s)"
            )));
        }

        sqlx::query("DELETE FROM helpdesk.issue_types WHERE id = $1")
            .bind(id.as_i32())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> =
            sqlx::query_scalar("SELECT id FROM helpdesk.categories WHERE id = $1 FOR UPDATE")
                .bind(id.as_i32())
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let referenced: i64 = sqlx::query_scalar(
            r"
            SELECT count(*) FROM helpdesk.tickets
            WHERE category_id = $1
               OR issue_type_id IN (SELECT id FROM helpdesk.issue_types WHERE category_id = $1)
            ",
        )
        .bind(id.as_i32())
        .fetch_one(&mut *tx)
        .await?;
        if referenced > 0 {
            return Err(RepositoryError::InUse(format!(
                "category {id} is used by {referenced} ticket(s)"
            )));
        }

        // Issue types go with the category through ON DELETE CASCADE.
        sqlx::query("DELETE FROM helpdesk.categories WHERE id = $1")
            .bind(id.as_i32())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

impl Directory for PgStore {
    async fn find_user(&self, id: UserId) -> Result<Option<DirectoryEntry>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, display_name, is_superuser, has_staff_permission, is_active, contact
            FROM helpdesk.users
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn upsert_user(&self, entry: DirectoryEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO helpdesk.users
                (id, display_name, is_superuser, has_staff_permission, is_active, contact)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                is_superuser = EXCLUDED.is_superuser,
                has_staff_permission = EXCLUDED.has_staff_permission,
                is_active = EXCLUDED.is_active,
                contact = EXCLUDED.contact
            ",
        )
        .bind(entry.id.as_i32())
        .bind(&entry.display_name)
        .bind(entry.is_superuser)
        .bind(entry.has_staff_permission)
        .bind(entry.is_active)
        .bind(&entry.contact)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remember_contact(&self, id: UserId, contact: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE helpdesk.users SET contact = $2 WHERE id = $1")
            .bind(id.as_i32())
            .bind(contact)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
