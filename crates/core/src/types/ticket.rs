//! Tickets and the write models that keep their labels consistent.
//!
//! A ticket's `title` and `category` are copies of its issue type's name and
//! category. They are never set directly: [`NewTicket`] and [`TicketRevision`]
//! derive them from an [`IssueType`] so every write re-asserts the copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::catalog::IssueType;
use super::id::{CategoryId, IssueTypeId, TicketId, UserId};
use super::status::TicketStatus;

/// A ticket as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    /// Nulled if the issue type is removed out from under the ticket.
    pub issue_type: Option<IssueTypeId>,
    /// Name of the issue type at the last save.
    pub title: String,
    /// Category of the issue type at the last save.
    pub category: Option<CategoryId>,
    pub description: String,
    pub status: TicketStatus,
    /// Phone number or chat handle for reaching the requester.
    pub contact: String,
    pub requester: UserId,
    pub assignee: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped by every write; conditional writes compare against it.
    pub version: i32,
}

impl Ticket {
    /// Whether the ticket is frozen.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether `title` and `category` match `issue_type`.
    #[must_use]
    pub fn mirrors(&self, issue_type: &IssueType) -> bool {
        self.issue_type == Some(issue_type.id)
            && self.title == issue_type.name
            && self.category == Some(issue_type.category)
    }
}

/// A ticket about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    requester: UserId,
    issue_type: IssueTypeId,
    title: String,
    category: CategoryId,
    description: String,
    contact: String,
}

impl NewTicket {
    /// Describe a new ticket, copying its labels from `issue_type`.
    #[must_use]
    pub fn new(
        requester: UserId,
        issue_type: &IssueType,
        description: impl Into<String>,
        contact: impl Into<String>,
    ) -> Self {
        Self {
            requester,
            issue_type: issue_type.id,
            title: issue_type.name.clone(),
            category: issue_type.category,
            description: description.into(),
            contact: contact.into(),
        }
    }

    #[must_use]
    pub const fn requester(&self) -> UserId {
        self.requester
    }

    #[must_use]
    pub const fn issue_type(&self) -> IssueTypeId {
        self.issue_type
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub const fn category(&self) -> CategoryId {
        self.category
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn contact(&self) -> &str {
        &self.contact
    }
}

/// The mutable state of a ticket, as written by a conditional update.
///
/// Starts as a copy of a stored ticket. Labels only change together with the
/// issue type through [`TicketRevision::set_issue_type`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRevision {
    issue_type: Option<IssueTypeId>,
    title: String,
    category: Option<CategoryId>,
    pub description: String,
    pub status: TicketStatus,
    pub contact: String,
    pub assignee: Option<UserId>,
}

impl TicketRevision {
    /// Start a revision from the ticket's current state.
    #[must_use]
    pub fn of(ticket: &Ticket) -> Self {
        Self {
            issue_type: ticket.issue_type,
            title: ticket.title.clone(),
            category: ticket.category,
            description: ticket.description.clone(),
            status: ticket.status,
            contact: ticket.contact.clone(),
            assignee: ticket.assignee,
        }
    }

    /// Point the ticket at `issue_type` and re-derive its labels.
    pub fn set_issue_type(&mut self, issue_type: &IssueType) {
        self.issue_type = Some(issue_type.id);
        self.title.clone_from(&issue_type.name);
        self.category = Some(issue_type.category);
    }

    #[must_use]
    pub const fn issue_type(&self) -> Option<IssueTypeId> {
        self.issue_type
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub const fn category(&self) -> Option<CategoryId> {
        self.category
    }

    /// Copy the revised fields onto `ticket`.
    ///
    /// Identity, requester, timestamps and version are left to the store.
    pub fn apply_to(&self, ticket: &mut Ticket) {
        ticket.issue_type = self.issue_type;
        ticket.title.clone_from(&self.title);
        ticket.category = self.category;
        ticket.description.clone_from(&self.description);
        ticket.status = self.status;
        ticket.contact.clone_from(&self.contact);
        ticket.assignee = self.assignee;
    }
}

/// Field changes requested by IT staff.
///
/// Absent fields are left untouched. `assignee: null` unassigns the ticket,
/// while omitting `assignee` keeps the current one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TicketChanges {
    #[serde(default)]
    pub issue_type: Option<IssueTypeId>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TicketStatus>,
    #[serde(default, deserialize_with = "present")]
    pub assignee: Option<Option<UserId>>,
    /// Appended as a public comment in the same write when non-blank.
    #[serde(default)]
    pub comment: Option<String>,
}

/// Distinguish an explicit `null` from a missing field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printer_jam() -> IssueType {
        IssueType {
            id: IssueTypeId::new(1),
            name: "Printer Jam".to_string(),
            category: CategoryId::new(10),
            active: true,
        }
    }

    fn ticket() -> Ticket {
        let now = Utc::now();
        Ticket {
            id: TicketId::new(5),
            issue_type: Some(IssueTypeId::new(1)),
            title: "Printer Jam".to_string(),
            category: Some(CategoryId::new(10)),
            description: "tray 2".to_string(),
            status: TicketStatus::Open,
            contact: "line: @u1".to_string(),
            requester: UserId::new(1),
            assignee: None,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    #[test]
    fn test_new_ticket_copies_labels() {
        let new = NewTicket::new(UserId::new(1), &printer_jam(), "jammed", "");
        assert_eq!(new.title(), "Printer Jam");
        assert_eq!(new.category(), CategoryId::new(10));
        assert_eq!(new.issue_type(), IssueTypeId::new(1));
    }

    #[test]
    fn test_revision_rederives_labels() {
        let mut ticket = ticket();
        let wifi = IssueType {
            id: IssueTypeId::new(2),
            name: "Wi-Fi Down".to_string(),
            category: CategoryId::new(11),
            active: true,
        };
        let mut revision = TicketRevision::of(&ticket);
        revision.set_issue_type(&wifi);
        revision.apply_to(&mut ticket);
        assert!(ticket.mirrors(&wifi));
        assert!(!ticket.mirrors(&printer_jam()));
    }

    #[test]
    fn test_revision_leaves_identity_alone() {
        let mut ticket = ticket();
        let mut revision = TicketRevision::of(&ticket);
        revision.assignee = Some(UserId::new(3));
        revision.status = TicketStatus::InProgress;
        revision.apply_to(&mut ticket);
        assert_eq!(ticket.requester, UserId::new(1));
        assert_eq!(ticket.version, 1);
        assert_eq!(ticket.assignee, Some(UserId::new(3)));
    }

    #[test]
    fn test_changes_distinguish_null_assignee() {
        let unassign: TicketChanges = serde_json::from_str(r#"{"assignee": null}"#).unwrap();
        assert_eq!(unassign.assignee, Some(None));

        let keep: TicketChanges = serde_json::from_str(r#"{"description": "x"}"#).unwrap();
        assert_eq!(keep.assignee, None);

        let assign: TicketChanges = serde_json::from_str(r#"{"assignee": 4}"#).unwrap();
        assert_eq!(assign.assignee, Some(Some(UserId::new(4))));
    }
}
