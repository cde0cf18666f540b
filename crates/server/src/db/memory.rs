//! In-memory ticket store.
//!
//! Holds every table behind one async mutex, so each trait call observes and
//! writes a consistent snapshot. Conditional writes behave exactly like the
//! `PostgreSQL` backend: a stale `expected_version` yields
//! [`RepositoryError::VersionConflict`].

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use helpdesk_core::{
    Category, CategoryId, Comment, CommentId, DirectoryEntry, IssueType, IssueTypeId, NewComment,
    NewTicket, Ticket, TicketId, TicketRevision, TicketStatus, UserId,
};

use super::{
    CatalogStore, Directory, RepositoryError, TicketQuery, TicketStore, sort_open_first,
};

#[derive(Debug, Default)]
struct Tables {
    last_id: i32,
    tickets: BTreeMap<TicketId, Ticket>,
    comments: Vec<Comment>,
    categories: BTreeMap<CategoryId, Category>,
    issue_types: BTreeMap<IssueTypeId, IssueType>,
    users: HashMap<UserId, DirectoryEntry>,
    tickets_unavailable: bool,
}

impl Tables {
    const fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn push_comment(&mut self, ticket: TicketId, comment: NewComment, at: DateTime<Utc>) -> Comment {
        let comment = Comment {
            id: CommentId::new(self.next_id()),
            ticket,
            author: comment.author,
            body: comment.body,
            internal: comment.internal,
            created_at: at,
        };
        self.comments.push(comment.clone());
        comment
    }
}

/// Ticket store kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a ticket's timestamps, for loading historic tickets.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the ticket does not exist.
    pub async fn backdate_ticket(
        &self,
        id: TicketId,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        let ticket = tables
            .tickets
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        ticket.created_at = created_at;
        ticket.updated_at = updated_at;
        Ok(())
    }

    /// Make ticket inserts fail as if the database were down.
    pub async fn set_tickets_unavailable(&self, unavailable: bool) {
        self.tables.lock().await.tickets_unavailable = unavailable;
    }
}

impl TicketStore for MemoryStore {
    async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>, RepositoryError> {
        Ok(self.tables.lock().await.tickets.get(&id).cloned())
    }

    async fn list_tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, RepositoryError> {
        let mut tickets: Vec<Ticket> = self
            .tables
            .lock()
            .await
            .tickets
            .values()
            .filter(|t| query.matches(t))
            .cloned()
            .collect();
        sort_open_first(&mut tickets);
        Ok(tickets)
    }

    async fn tickets_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Ticket>, RepositoryError> {
        Ok(self
            .tables
            .lock()
            .await
            .tickets
            .values()
            .filter(|t| t.created_at >= start && t.created_at < end)
            .cloned()
            .collect())
    }

    async fn insert_ticket(&self, ticket: NewTicket) -> Result<Ticket, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.tickets_unavailable {
            return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
        }
        let now = Utc::now();
        let stored = Ticket {
            id: TicketId::new(tables.next_id()),
            issue_type: Some(ticket.issue_type()),
            title: ticket.title().to_owned(),
            category: Some(ticket.category()),
            description: ticket.description().to_owned(),
            status: TicketStatus::Open,
            contact: ticket.contact().to_owned(),
            requester: ticket.requester(),
            assignee: None,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        tables.tickets.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_ticket(
        &self,
        id: TicketId,
        expected_version: i32,
        revision: TicketRevision,
        comment: Option<NewComment>,
    ) -> Result<Ticket, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let current = tables
            .tickets
            .get(&id)
            .map(|t| t.version)
            .ok_or(RepositoryError::NotFound)?;
        if current != expected_version {
            return Err(RepositoryError::VersionConflict);
        }

        let now = Utc::now();
        if let Some(comment) = comment {
            tables.push_comment(id, comment, now);
        }
        let ticket = tables
            .tickets
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        revision.apply_to(ticket);
        ticket.updated_at = now;
        ticket.version += 1;
        Ok(ticket.clone())
    }

    async fn insert_comment(
        &self,
        ticket: TicketId,
        comment: NewComment,
    ) -> Result<Comment, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.tickets.contains_key(&ticket) {
            return Err(RepositoryError::NotFound);
        }
        Ok(tables.push_comment(ticket, comment, Utc::now()))
    }

    async fn list_comments(&self, ticket: TicketId) -> Result<Vec<Comment>, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.ticket == ticket)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }
}

impl CatalogStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let mut categories: Vec<Category> =
            self.tables.lock().await.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn list_issue_types(&self, active_only: bool) -> Result<Vec<IssueType>, RepositoryError> {
        let mut issue_types: Vec<IssueType> = self
            .tables
            .lock()
            .await
            .issue_types
            .values()
            .filter(|it| it.active || !active_only)
            .cloned()
            .collect();
        issue_types.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(issue_types)
    }

    async fn get_issue_type(&self, id: IssueTypeId) -> Result<Option<IssueType>, RepositoryError> {
        Ok(self.tables.lock().await.issue_types.get(&id).cloned())
    }

    async fn insert_category(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Category, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.categories.values().any(|c| c.name == name) {
            return Err(RepositoryError::Conflict(format!(
                "category {name:?} already exists"
            )));
        }
        let category = Category {
            id: CategoryId::new(tables.next_id()),
            name: name.to_owned(),
            description: description.to_owned(),
        };
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn insert_issue_type(
        &self,
        name: &str,
        category: CategoryId,
        active: bool,
    ) -> Result<IssueType, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.categories.contains_key(&category) {
            return Err(RepositoryError::NotFound);
        }
        if tables
            .issue_types
            .values()
            .any(|it| it.category == category && it.name == name)
        {
            return Err(RepositoryError::Conflict(format!(
                "issue type {name:?} already exists in category {category}"
            )));
        }
        let issue_type = IssueType {
            id: IssueTypeId::new(tables.next_id()),
            name: name.to_owned(),
            category,
            active,
        };
        tables.issue_types.insert(issue_type.id, issue_type.clone());
        Ok(issue_type)
    }

    async fn set_issue_type_active(
        &self,
        id: IssueTypeId,
        active: bool,
    ) -> Result<IssueType, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let issue_type = tables
            .issue_types
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        issue_type.active = active;
        Ok(issue_type.clone())
    }

    async fn delete_issue_type(&self, id: IssueTypeId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.issue_types.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        let referenced = tables
            .tickets
            .values()
            .filter(|t| t.issue_type == Some(id))
            .count();
        if referenced > 0 {
            return Err(RepositoryError::InUse(format!(
                "issue type {id} is used by {referenced} ticket(s)"
            )));
        }
        tables.issue_types.remove(&id);
        Ok(())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.categories.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        let owned: Vec<IssueTypeId> = tables
            .issue_types
            .values()
            .filter(|it| it.category == id)
            .map(|it| it.id)
            .collect();
        let referenced = tables
            .tickets
            .values()
            .filter(|t| {
                t.category == Some(id) || t.issue_type.is_some_and(|it| owned.contains(&it))
            })
            .count();
        if referenced > 0 {
            return Err(RepositoryError::InUse(format!(
                "category {id} is used by {referenced} ticket(s)"
            )));
        }
        for issue_type in owned {
            tables.issue_types.remove(&issue_type);
        }
        tables.categories.remove(&id);
        Ok(())
    }
}

impl Directory for MemoryStore {
    async fn find_user(&self, id: UserId) -> Result<Option<DirectoryEntry>, RepositoryError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn upsert_user(&self, entry: DirectoryEntry) -> Result<(), RepositoryError> {
        self.tables.lock().await.users.insert(entry.id, entry);
        Ok(())
    }

    async fn remember_contact(&self, id: UserId, contact: &str) -> Result<(), RepositoryError> {
        if let Some(entry) = self.tables.lock().await.users.get_mut(&id) {
            contact.clone_into(&mut entry.contact);
        }
        Ok(())
    }
}
