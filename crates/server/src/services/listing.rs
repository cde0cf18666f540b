//! Ticket reads: filtered listings and the detail view.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tracing::instrument;

use helpdesk_core::policy::{self, Action, ActionSet};
use helpdesk_core::{Actor, Comment, Ticket, TicketId, TicketStatus};

use super::{Helpdesk, Result};
use crate::db::{HelpdeskStore, Scope, TicketQuery};

/// Day format accepted by filters.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Listing filter as entered by a user.
///
/// Dates are whole days in the reporting time zone, both ends inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub text: Option<String>,
    pub status: Option<TicketStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl TicketFilter {
    /// Build a filter from raw form values.
    ///
    /// Blank or unparseable values are dropped rather than rejected.
    #[must_use]
    pub fn from_raw(
        text: Option<&str>,
        status: Option<&str>,
        date_from: Option<&str>,
        date_to: Option<&str>,
    ) -> Self {
        let text = text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned);
        let status = status.and_then(|s| s.trim().parse().ok());
        let date = |s: Option<&str>| {
            s.and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
        };
        Self {
            text,
            status,
            date_from: date(date_from),
            date_to: date(date_to),
        }
    }

    /// Store query for `scope`, with day bounds resolved in `offset`.
    #[must_use]
    pub fn to_query(&self, scope: Scope, offset: FixedOffset) -> TicketQuery {
        TicketQuery {
            scope,
            text: self.text.clone(),
            status: self.status,
            updated_from: self.date_from.and_then(|d| start_of_day(d, offset)),
            updated_before: self
                .date_to
                .and_then(|d| d.succ_opt())
                .and_then(|d| start_of_day(d, offset)),
        }
    }
}

/// Midnight of `date` in `offset`, as UTC.
pub(crate) fn start_of_day(date: NaiveDate, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    offset
        .from_local_datetime(&midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// A ticket with the comments and actions available to the viewer.
#[derive(Debug, Clone, Serialize)]
pub struct TicketDetail {
    pub ticket: Ticket,
    pub comments: Vec<Comment>,
    pub actions: ActionSet,
}

impl<S: HelpdeskStore> Helpdesk<S> {
    /// Which tickets `actor` may list.
    pub(super) const fn scope_for(actor: &Actor) -> Scope {
        if actor.is_it_staff() {
            Scope::All
        } else {
            Scope::Involving(actor.id)
        }
    }

    /// Tickets visible to `actor` that match `filter`, open work first.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the store fails.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn list_tickets(&self, actor: &Actor, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let query = filter.to_query(Self::scope_for(actor), self.offset);
        Ok(self.store.list_tickets(&query).await?)
    }

    /// A single ticket.
    ///
    /// # Errors
    ///
    /// `NotFound` if it does not exist, `AuthorizationDenied` if the actor
    /// may not see it.
    pub async fn get_ticket(&self, actor: &Actor, id: TicketId) -> Result<Ticket> {
        self.load_for(actor, id, Action::View, "view").await
    }

    /// A ticket with its visible comments and the actor's allowed actions.
    ///
    /// # Errors
    ///
    /// See [`Helpdesk::get_ticket`].
    pub async fn ticket_detail(&self, actor: &Actor, id: TicketId) -> Result<TicketDetail> {
        let ticket = self.get_ticket(actor, id).await?;
        let comments = self.visible_comments(actor, ticket.id).await?;
        let actions = policy::allowed_actions(actor, &ticket);
        Ok(TicketDetail {
            ticket,
            comments,
            actions,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use helpdesk_core::UserId;

    use super::*;
    use crate::services::HelpdeskError;
    use crate::services::fixtures::{BOSS, REQUESTER, STAFF_A, STAFF_B, fixture};

    fn bangkok() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    #[test]
    fn test_from_raw_is_lenient() {
        let filter = TicketFilter::from_raw(Some("  "), Some("bogus"), Some("2024-13-01"), None);
        assert_eq!(filter, TicketFilter::default());

        let filter = TicketFilter::from_raw(
            Some(" Printer "),
            Some("on_hold"),
            Some("2024-03-01"),
            Some("2024-03-31"),
        );
        assert_eq!(filter.text.as_deref(), Some("Printer"));
        assert_eq!(filter.status, Some(TicketStatus::OnHold));
        assert_eq!(filter.date_to, NaiveDate::from_ymd_opt(2024, 3, 31));
    }

    #[test]
    fn test_day_bounds_use_offset_and_include_last_day() {
        let filter = TicketFilter {
            date_from: NaiveDate::from_ymd_opt(2024, 3, 1),
            date_to: NaiveDate::from_ymd_opt(2024, 3, 1),
            ..TicketFilter::default()
        };
        let query = filter.to_query(Scope::All, bangkok());
        assert_eq!(
            query.updated_from,
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 17, 0, 0).unwrap())
        );
        assert_eq!(
            query.updated_before,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 17, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_requester_sees_only_own_tickets() {
        let f = fixture().await;
        let mine = f
            .helpdesk
            .create_ticket(&Actor::requester(REQUESTER), f.printer_jam.id, "", "")
            .await
            .unwrap();
        f.helpdesk
            .create_ticket(&Actor::requester(UserId::new(101)), f.wifi_down.id, "", "")
            .await
            .unwrap();

        let seen = f
            .helpdesk
            .list_tickets(&Actor::requester(REQUESTER), &TicketFilter::default())
            .await
            .unwrap();
        assert_eq!(seen.iter().map(|t| t.id).collect::<Vec<_>>(), vec![mine.id]);

        let all = f
            .helpdesk
            .list_tickets(&Actor::staff(STAFF_A), &TicketFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_closed_tickets_listed_last() {
        let f = fixture().await;
        let requester = Actor::requester(REQUESTER);
        let first = f
            .helpdesk
            .create_ticket(&requester, f.printer_jam.id, "", "")
            .await
            .unwrap();
        let second = f
            .helpdesk
            .create_ticket(&requester, f.wifi_down.id, "", "")
            .await
            .unwrap();
        f.helpdesk
            .close_ticket(&Actor::superuser(BOSS), second.id, None)
            .await
            .unwrap();

        let listed = f
            .helpdesk
            .list_tickets(&requester, &TicketFilter::default())
            .await
            .unwrap();
        assert_eq!(
            listed.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
    }

    #[tokio::test]
    async fn test_text_and_date_filters() {
        let f = fixture().await;
        let requester = Actor::requester(REQUESTER);
        let old = f
            .helpdesk
            .create_ticket(&requester, f.printer_jam.id, "Tray two", "")
            .await
            .unwrap();
        let new = f
            .helpdesk
            .create_ticket(&requester, f.wifi_down.id, "3rd floor", "")
            .await
            .unwrap();
        let day = |d| Utc.with_ymd_and_hms(2024, 5, d, 12, 0, 0).unwrap();
        f.helpdesk.store().backdate_ticket(old.id, day(1), day(2)).await.unwrap();
        f.helpdesk.store().backdate_ticket(new.id, day(1), day(9)).await.unwrap();

        let staff = Actor::staff(STAFF_B);
        let by_text = f
            .helpdesk
            .list_tickets(&staff, &TicketFilter::from_raw(Some("TRAY"), None, None, None))
            .await
            .unwrap();
        assert_eq!(by_text.len(), 1);
        assert_eq!(by_text[0].id, old.id);

        let by_date = f
            .helpdesk
            .list_tickets(
                &staff,
                &TicketFilter::from_raw(None, None, Some("2024-05-09"), Some("2024-05-09")),
            )
            .await
            .unwrap();
        assert_eq!(by_date.len(), 1);
        assert_eq!(by_date[0].id, new.id);
    }

    #[tokio::test]
    async fn test_detail_reports_allowed_actions() {
        let f = fixture().await;
        let requester = Actor::requester(REQUESTER);
        let ticket = f
            .helpdesk
            .create_ticket(&requester, f.printer_jam.id, "", "")
            .await
            .unwrap();

        let detail = f.helpdesk.ticket_detail(&requester, ticket.id).await.unwrap();
        assert_eq!(
            detail.actions.iter().collect::<Vec<_>>(),
            vec![Action::View, Action::Comment]
        );

        let err = f
            .helpdesk
            .ticket_detail(&Actor::requester(UserId::new(555)), ticket.id)
            .await
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::AuthorizationDenied { .. }));

        let err = f
            .helpdesk
            .get_ticket(&requester, TicketId::new(9999))
            .await
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::NotFound("ticket")));
    }
}
