//! Helpdesk services.
//!
//! [`Helpdesk`] is the action surface: every operation takes the acting
//! [`Actor`], checks it against the visibility policy and then reads or
//! conditionally writes through the store.
//!
//! Operations that write a ticket come in two forms. The `*_ticket` methods
//! take an id and load the current ticket. The snapshot methods
//! ([`Helpdesk::claim`], [`Helpdesk::update`], [`Helpdesk::close`], ...)
//! take the ticket the caller already read and write conditionally on its
//! version.

mod catalog;
mod comments;
mod dashboard;
mod error;
mod lifecycle;
mod listing;
mod summary;

pub use dashboard::{Dashboard, StatusCount};
pub use error::HelpdeskError;
pub use listing::{TicketDetail, TicketFilter};
pub use summary::{CategoryRow, MONTH_LABELS, YearSummary, aggregate, build_year_summary};

use chrono::FixedOffset;
use tracing::warn;

use helpdesk_core::policy::{self, Action};
use helpdesk_core::{Actor, Ticket, TicketId, TicketRevision};

use crate::db::HelpdeskStore;

/// Result type for helpdesk operations.
pub type Result<T> = std::result::Result<T, HelpdeskError>;

/// Ticket lifecycle and visibility engine over a store.
#[derive(Debug)]
pub struct Helpdesk<S> {
    store: S,
    offset: FixedOffset,
}

impl<S: HelpdeskStore> Helpdesk<S> {
    /// Create a helpdesk over `store`, reporting in the time zone `offset`.
    #[must_use]
    pub const fn new(store: S, offset: FixedOffset) -> Self {
        Self { store, offset }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Reporting time zone.
    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    async fn load(&self, id: TicketId) -> Result<Ticket> {
        self.store
            .get_ticket(id)
            .await?
            .ok_or(HelpdeskError::NotFound("ticket"))
    }

    /// Load a ticket and check `action` on it.
    async fn load_for(
        &self,
        actor: &Actor,
        id: TicketId,
        action: Action,
        operation: &'static str,
    ) -> Result<Ticket> {
        let ticket = self.load(id).await?;
        authorize(actor, &ticket, action, operation)?;
        Ok(ticket)
    }

    /// Copy the current name and category of the ticket's issue type.
    ///
    /// A ticket whose issue type is gone keeps its last labels.
    async fn refresh_labels(&self, revision: &mut TicketRevision) -> Result<()> {
        if let Some(id) = revision.issue_type()
            && let Some(issue_type) = self.store.get_issue_type(id).await?
        {
            revision.set_issue_type(&issue_type);
        }
        Ok(())
    }
}

/// Check `action` and log the refusal.
fn authorize(actor: &Actor, ticket: &Ticket, action: Action, operation: &'static str) -> Result<()> {
    policy::authorize(actor, ticket, action).map_err(|denial| {
        warn!(
            actor = %actor.id,
            ticket = %ticket.id,
            action = %action,
            ?denial,
            "Action denied"
        );
        HelpdeskError::denied(operation, denial)
    })
}

/// Require IT staff for ticket-independent operations.
fn require_staff(actor: &Actor, operation: &'static str) -> Result<()> {
    if actor.is_it_staff() {
        Ok(())
    } else {
        warn!(actor = %actor.id, operation, "Staff-only operation denied");
        Err(HelpdeskError::AuthorizationDenied { operation })
    }
}
