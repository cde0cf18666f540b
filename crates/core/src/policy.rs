//! Visibility and action authorization for tickets.
//!
//! Every role check in the helpdesk goes through this module. The functions
//! are pure: they look only at the actor's flags and the ticket's requester,
//! assignee and status.
//!
//! | action    | who                                          | when          |
//! |-----------|----------------------------------------------|---------------|
//! | `view`    | IT staff, requester, assignee                | always        |
//! | `comment` | anyone who can view                          | always        |
//! | `claim`   | IT staff, if unassigned/own or a superuser   | not closed    |
//! | `edit`    | IT staff who are the assignee, or superusers | not closed    |
//! | `close`   | IT staff who are the assignee, or superusers | not closed    |

use serde::{Deserialize, Serialize, Serializer};

use crate::types::{Actor, Comment, Ticket, UserId};

/// Something an actor may do to a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Comment,
    Claim,
    Edit,
    Close,
}

impl Action {
    /// Every action, in display order.
    pub const ALL: [Self; 5] = [
        Self::View,
        Self::Comment,
        Self::Claim,
        Self::Edit,
        Self::Close,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Comment => "comment",
            Self::Claim => "claim",
            Self::Edit => "edit",
            Self::Close => "close",
        }
    }

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of [`Action`]s. Serializes as a list of action names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionSet(u8);

impl ActionSet {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn contains(self, action: Action) -> bool {
        self.0 & action.bit() != 0
    }

    pub const fn insert(&mut self, action: Action) {
        self.0 |= action.bit();
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the contained actions in display order.
    pub fn iter(self) -> impl Iterator<Item = Action> {
        Action::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

impl FromIterator<Action> for ActionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut set = Self::empty();
        for action in iter {
            set.insert(action);
        }
        set
    }
}

impl Serialize for ActionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Why an action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The actor is neither IT staff, the requester, nor the assignee.
    NotVisible,
    /// The action needs IT staff.
    NotStaff,
    /// The ticket is closed.
    Closed,
    /// Another staff member owns the ticket.
    ClaimedBy(UserId),
    /// Only the assignee or a superuser may do this.
    NotAssignee,
}

/// Whether `actor` may see `ticket` at all.
///
/// `false` must be reported as an authorization failure, never as a missing
/// ticket.
#[must_use]
pub fn can_view(actor: &Actor, ticket: &Ticket) -> bool {
    actor.is_it_staff() || ticket.requester == actor.id || ticket.assignee == Some(actor.id)
}

/// Check a single action, returning the first reason it is refused.
///
/// Reasons are checked in a fixed order: visibility or staff role, then the
/// closed state, then ownership.
///
/// # Errors
///
/// Returns the [`Denial`] that blocks the action.
pub fn authorize(actor: &Actor, ticket: &Ticket, action: Action) -> Result<(), Denial> {
    match action {
        Action::View | Action::Comment => {
            if can_view(actor, ticket) {
                Ok(())
            } else {
                Err(Denial::NotVisible)
            }
        }
        Action::Claim => {
            require_open_staff(actor, ticket)?;
            match ticket.assignee {
                Some(owner) if owner != actor.id && !actor.is_superuser => {
                    Err(Denial::ClaimedBy(owner))
                }
                _ => Ok(()),
            }
        }
        Action::Edit | Action::Close => {
            require_open_staff(actor, ticket)?;
            if actor.is_superuser || ticket.assignee == Some(actor.id) {
                Ok(())
            } else {
                Err(Denial::NotAssignee)
            }
        }
    }
}

const fn require_open_staff(actor: &Actor, ticket: &Ticket) -> Result<(), Denial> {
    if !actor.is_it_staff() {
        return Err(Denial::NotStaff);
    }
    if ticket.status.is_terminal() {
        return Err(Denial::Closed);
    }
    Ok(())
}

/// Every action `actor` may perform on `ticket`.
#[must_use]
pub fn allowed_actions(actor: &Actor, ticket: &Ticket) -> ActionSet {
    Action::ALL
        .into_iter()
        .filter(|action| authorize(actor, ticket, *action).is_ok())
        .collect()
}

/// Whether `actor` may read `comment`. Internal comments are for IT staff only.
#[must_use]
pub const fn can_see_comment(actor: &Actor, comment: &Comment) -> bool {
    !comment.internal || actor.is_it_staff()
}
