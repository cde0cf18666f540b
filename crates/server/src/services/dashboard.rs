//! Per-actor dashboard counters.

use serde::Serialize;
use tracing::instrument;

use helpdesk_core::{Actor, TicketStatus};

use super::{Helpdesk, Result, TicketFilter};
use crate::db::{HelpdeskStore, TicketQuery};

/// Tickets in one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: TicketStatus,
    pub label: &'static str,
    pub count: usize,
}

/// Counters shown on an actor's landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    /// Non-closed tickets the actor requested.
    pub my_open: usize,
    /// Non-closed tickets assigned to the actor.
    pub assigned_to_me: usize,
    /// Filtered tickets per status, in lifecycle order, zero entries omitted.
    pub by_status: Vec<StatusCount>,
}

impl<S: HelpdeskStore> Helpdesk<S> {
    /// Dashboard for `actor`. Only `by_status` honours `filter`.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the store fails.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn dashboard(&self, actor: &Actor, filter: &TicketFilter) -> Result<Dashboard> {
        let scope = Self::scope_for(actor);
        let visible = self.store.list_tickets(&TicketQuery::scoped(scope)).await?;

        let my_open = visible
            .iter()
            .filter(|t| t.requester == actor.id && !t.is_closed())
            .count();
        let assigned_to_me = visible
            .iter()
            .filter(|t| t.assignee == Some(actor.id) && !t.is_closed())
            .count();

        let filtered = self
            .store
            .list_tickets(&filter.to_query(scope, self.offset))
            .await?;
        let by_status = TicketStatus::ALL
            .into_iter()
            .map(|status| StatusCount {
                status,
                label: status.label(),
                count: filtered.iter().filter(|t| t.status == status).count(),
            })
            .filter(|entry| entry.count > 0)
            .collect();

        Ok(Dashboard {
            my_open,
            assigned_to_me,
            by_status,
        })
    }
}
