//! Ticket creation and status transitions.

use tracing::{info, instrument, warn};

use helpdesk_core::policy::Action;
use helpdesk_core::{
    Actor, CommentBody, IssueTypeId, NewComment, NewTicket, Ticket, TicketChanges, TicketId,
    TicketRevision, TicketStatus, UserId,
};

use super::{Helpdesk, HelpdeskError, Result, authorize};
use crate::db::{HelpdeskStore, RepositoryError};

impl<S: HelpdeskStore> Helpdesk<S> {
    /// Open a ticket on behalf of `requester`.
    ///
    /// A blank `contact` falls back to the contact remembered in the
    /// requester's directory entry. A new non-blank contact is remembered.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown issue type, `InvalidIssueType` for an
    /// inactive one.
    #[instrument(skip(self, requester, description, contact), fields(actor = %requester.id))]
    pub async fn create_ticket(
        &self,
        requester: &Actor,
        issue_type: IssueTypeId,
        description: &str,
        contact: &str,
    ) -> Result<Ticket> {
        let issue_type = self
            .store
            .get_issue_type(issue_type)
            .await?
            .ok_or(HelpdeskError::NotFound("issue type"))?;
        if !issue_type.active {
            warn!(issue_type = %issue_type.id, "Inactive issue type selected");
            return Err(HelpdeskError::InvalidIssueType);
        }

        let profile = self.store.find_user(requester.id).await?;
        let given = contact.trim();
        let contact = if given.is_empty() {
            profile.as_ref().map(|p| p.contact.clone()).unwrap_or_default()
        } else {
            given.to_owned()
        };

        let ticket = self
            .store
            .insert_ticket(NewTicket::new(
                requester.id,
                &issue_type,
                description.trim(),
                contact,
            ))
            .await?;

        // Only remembered once the ticket exists.
        if !given.is_empty() && profile.as_ref().is_some_and(|p| p.contact != given) {
            let remembered = self.store.remember_contact(requester.id, given).await;
            if let Err(err) = remembered {
                warn!(ticket = %ticket.id, error = %err, "Failed to remember contact");
            }
        }

        info!(ticket = %ticket.id, title = %ticket.title, "Ticket created");
        Ok(ticket)
    }

    /// Claim ticket `id` for `actor`.
    ///
    /// # Errors
    ///
    /// See [`Helpdesk::claim`].
    pub async fn claim_ticket(&self, actor: &Actor, id: TicketId) -> Result<Ticket> {
        let ticket = self.load(id).await?;
        self.claim(actor, &ticket).await
    }

    /// Take ownership of `snapshot`: assign it to `actor` and move it to
    /// `in_progress`, conditional on the snapshot's version.
    ///
    /// # Errors
    ///
    /// `AuthorizationDenied` for non-staff, `TerminalStateViolation` once
    /// closed, `AlreadyClaimed` when another staff member owns it or won a
    /// concurrent write.
    pub async fn claim(&self, actor: &Actor, snapshot: &Ticket) -> Result<Ticket> {
        self.take_ownership(actor, snapshot, "claim").await
    }

    /// Accept ticket `id`. Same rules as [`Helpdesk::claim_ticket`].
    ///
    /// # Errors
    ///
    /// See [`Helpdesk::claim`].
    pub async fn accept_ticket(&self, actor: &Actor, id: TicketId) -> Result<Ticket> {
        let ticket = self.load(id).await?;
        self.accept(actor, &ticket).await
    }

    /// Accept `snapshot`. Same rules as [`Helpdesk::claim`].
    ///
    /// # Errors
    ///
    /// See [`Helpdesk::claim`].
    pub async fn accept(&self, actor: &Actor, snapshot: &Ticket) -> Result<Ticket> {
        self.take_ownership(actor, snapshot, "accept").await
    }

    #[instrument(skip(self, actor, snapshot), fields(actor = %actor.id, ticket = %snapshot.id))]
    async fn take_ownership(
        &self,
        actor: &Actor,
        snapshot: &Ticket,
        operation: &'static str,
    ) -> Result<Ticket> {
        authorize(actor, snapshot, Action::Claim, operation)?;

        let mut revision = TicketRevision::of(snapshot);
        self.refresh_labels(&mut revision).await?;
        revision.assignee = Some(actor.id);
        revision.status = TicketStatus::InProgress;

        match self
            .store
            .update_ticket(snapshot.id, snapshot.version, revision, None)
            .await
        {
            Ok(ticket) => {
                info!(previous = ?snapshot.assignee, "Ticket claimed");
                Ok(ticket)
            }
            Err(RepositoryError::VersionConflict) => {
                let current = self.load(snapshot.id).await?;
                warn!(assignee = ?current.assignee, "Lost claim race");
                if current.is_closed() {
                    Err(HelpdeskError::TerminalStateViolation)
                } else {
                    Err(HelpdeskError::AlreadyClaimed)
                }
            }
            Err(RepositoryError::NotFound) => Err(HelpdeskError::NotFound("ticket")),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply staff `changes` to ticket `id`.
    ///
    /// # Errors
    ///
    /// See [`Helpdesk::update`].
    pub async fn update_ticket(
        &self,
        actor: &Actor,
        id: TicketId,
        changes: TicketChanges,
    ) -> Result<Ticket> {
        let ticket = self.load(id).await?;
        self.update(actor, &ticket, changes).await
    }

    /// Apply staff `changes` to `snapshot`, conditional on its version.
    ///
    /// Title and category are re-derived from the issue type. A non-blank
    /// `changes.comment` is stored as a public comment in the same write.
    ///
    /// # Errors
    ///
    /// - `AuthorizationDenied` unless the actor is the assignee or a superuser
    /// - `TerminalStateViolation` once closed
    /// - `NotFound` / `InvalidIssueType` for an unknown or inactive new issue type
    /// - `InvalidTransition` for a backward move or an attempt to close
    /// - `InvalidAssignee` unless the new assignee is active IT staff
    /// - `ConcurrentModification` if the ticket changed since `snapshot`
    #[instrument(skip(self, actor, snapshot, changes), fields(actor = %actor.id, ticket = %snapshot.id))]
    pub async fn update(
        &self,
        actor: &Actor,
        snapshot: &Ticket,
        changes: TicketChanges,
    ) -> Result<Ticket> {
        authorize(actor, snapshot, Action::Edit, "edit")?;

        let mut revision = TicketRevision::of(snapshot);
        match changes.issue_type {
            Some(id) if Some(id) != snapshot.issue_type => {
                let issue_type = self
                    .store
                    .get_issue_type(id)
                    .await?
                    .ok_or(HelpdeskError::NotFound("issue type"))?;
                if !issue_type.active {
                    return Err(HelpdeskError::InvalidIssueType);
                }
                revision.set_issue_type(&issue_type);
            }
            _ => self.refresh_labels(&mut revision).await?,
        }

        if let Some(contact) = changes.contact {
            revision.contact = contact.trim().to_owned();
        }
        if let Some(description) = changes.description {
            revision.description = description;
        }
        if let Some(status) = changes.status {
            check_transition(snapshot.status, status)?;
            revision.status = status;
        }
        if let Some(assignee) = changes.assignee {
            if let Some(user) = assignee
                && Some(user) != snapshot.assignee
            {
                self.check_assignable(user).await?;
            }
            revision.assignee = assignee;
        }

        let comment = changes
            .comment
            .as_deref()
            .and_then(|text| CommentBody::parse(text).ok())
            .map(|body| NewComment::public(actor.id, body));
        let with_comment = comment.is_some();

        let ticket = self.write(actor, snapshot, revision, comment).await?;
        info!(status = %ticket.status, with_comment, "Ticket updated");
        Ok(ticket)
    }

    /// Close ticket `id`, optionally with a final public comment.
    ///
    /// # Errors
    ///
    /// See [`Helpdesk::close`].
    pub async fn close_ticket(
        &self,
        actor: &Actor,
        id: TicketId,
        comment: Option<&str>,
    ) -> Result<Ticket> {
        let ticket = self.load(id).await?;
        self.close(actor, &ticket, comment).await
    }

    /// Close `snapshot`. A non-blank `comment` is appended before the status
    /// flips, in the same write.
    ///
    /// # Errors
    ///
    /// `AuthorizationDenied` unless the actor is the assignee or a superuser,
    /// `TerminalStateViolation` if already closed, `ConcurrentModification` if
    /// the ticket changed since `snapshot`.
    #[instrument(skip(self, actor, snapshot, comment), fields(actor = %actor.id, ticket = %snapshot.id))]
    pub async fn close(
        &self,
        actor: &Actor,
        snapshot: &Ticket,
        comment: Option<&str>,
    ) -> Result<Ticket> {
        authorize(actor, snapshot, Action::Close, "close")?;

        let mut revision = TicketRevision::of(snapshot);
        self.refresh_labels(&mut revision).await?;
        revision.status = TicketStatus::Closed;

        let comment = comment
            .and_then(|text| CommentBody::parse(text).ok())
            .map(|body| NewComment::public(actor.id, body));

        let ticket = self.write(actor, snapshot, revision, comment).await?;
        info!("Ticket closed");
        Ok(ticket)
    }

    /// Conditional write shared by update and close.
    async fn write(
        &self,
        actor: &Actor,
        snapshot: &Ticket,
        revision: TicketRevision,
        comment: Option<NewComment>,
    ) -> Result<Ticket> {
        match self
            .store
            .update_ticket(snapshot.id, snapshot.version, revision, comment)
            .await
        {
            Ok(ticket) => Ok(ticket),
            Err(RepositoryError::VersionConflict) => {
                let current = self.load(snapshot.id).await?;
                warn!(
                    actor = %actor.id,
                    expected = snapshot.version,
                    found = current.version,
                    "Concurrent modification"
                );
                if current.is_closed() {
                    Err(HelpdeskError::TerminalStateViolation)
                } else {
                    Err(HelpdeskError::ConcurrentModification)
                }
            }
            Err(RepositoryError::NotFound) => Err(HelpdeskError::NotFound("ticket")),
            Err(e) => Err(e.into()),
        }
    }

    async fn check_assignable(&self, user: UserId) -> Result<()> {
        match self.store.find_user(user).await? {
            Some(entry) if entry.is_assignable() => Ok(()),
            _ => {
                warn!(assignee = %user, "Rejected assignee");
                Err(HelpdeskError::InvalidAssignee)
            }
        }
    }
}

/// Statuses reachable through `update`. Closing goes through `close` only.
fn check_transition(from: TicketStatus, to: TicketStatus) -> Result<()> {
    if to.is_terminal() || !from.can_transition_to(to) {
        return Err(HelpdeskError::InvalidTransition { from, to });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{CatalogStore, Directory, TicketStore};
    use crate::services::fixtures::{BOSS, REQUESTER, STAFF_A, STAFF_B, fixture};

    fn changes() -> TicketChanges {
        TicketChanges::default()
    }

    #[tokio::test]
    async fn test_create_copies_labels_and_defaults_contact() {
        let f = fixture().await;
        let ticket = f
            .helpdesk
            .create_ticket(&Actor::requester(REQUESTER), f.printer_jam.id, " stuck ", "")
            .await
            .unwrap();

        assert_eq!(ticket.status, TicketStatus::Open);
        assert!(ticket.mirrors(&f.printer_jam));
        assert_eq!(ticket.contact, "ext. 1234");
        assert_eq!(ticket.description, "stuck");
        assert_eq!(ticket.assignee, None);
    }

    #[tokio::test]
    async fn test_create_remembers_new_contact() {
        let f = fixture().await;
        f.helpdesk
            .create_ticket(&Actor::requester(REQUESTER), f.printer_jam.id, "", "line: @somchai")
            .await
            .unwrap();
        let profile = f.helpdesk.store().find_user(REQUESTER).await.unwrap().unwrap();
        assert_eq!(profile.contact, "line: @somchai");
    }

    #[tokio::test]
    async fn test_failed_create_keeps_remembered_contact() {
        let f = fixture().await;
        f.helpdesk.store().set_tickets_unavailable(true).await;

        let err = f
            .helpdesk
            .create_ticket(&Actor::requester(REQUESTER), f.printer_jam.id, "", "line: @somchai")
            .await
            .unwrap_err();
        assert!(err.is_store_failure());

        let profile = f.helpdesk.store().find_user(REQUESTER).await.unwrap().unwrap();
        assert_eq!(profile.contact, "ext. 1234");
    }

    #[tokio::test]
    async fn test_create_rejects_inactive_and_unknown_issue_types() {
        let f = fixture().await;
        let requester = Actor::requester(REQUESTER);
        let err = f
            .helpdesk
            .create_ticket(&requester, f.retired.id, "", "")
            .await
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::InvalidIssueType));

        let err = f
            .helpdesk
            .create_ticket(&requester, IssueTypeId::new(999), "", "")
            .await
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::NotFound("issue type")));
    }

    #[tokio::test]
    async fn test_claim_assigns_and_starts_work() {
        let f = fixture().await;
        let ticket = f
            .helpdesk
            .create_ticket(&Actor::requester(REQUESTER), f.printer_jam.id, "", "")
            .await
            .unwrap();

        let claimed = f
            .helpdesk
            .claim_ticket(&Actor::staff(STAFF_A), ticket.id)
            .await
            .unwrap();
        assert_eq!(claimed.assignee, Some(STAFF_A));
        assert_eq!(claimed.status, TicketStatus::InProgress);
        assert!(claimed.version > ticket.version);
        assert!(claimed.updated_at >= ticket.updated_at);
    }

    #[tokio::test]
    async fn test_non_staff_claim_denied() {
        let f = fixture().await;
        let ticket = f
            .helpdesk
            .create_ticket(&Actor::requester(REQUESTER), f.printer_jam.id, "", "")
            .await
            .unwrap();
        let err = f
            .helpdesk
            .claim_ticket(&Actor::requester(REQUESTER), ticket.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HelpdeskError::AuthorizationDenied { operation: "claim" }
        ));
    }

    #[tokio::test]
    async fn test_stale_snapshot_claim_loses() {
        let f = fixture().await;
        let snapshot = f
            .helpdesk
            .create_ticket(&Actor::requester(REQUESTER), f.printer_jam.id, "", "")
            .await
            .unwrap();

        f.helpdesk.claim(&Actor::staff(STAFF_A), &snapshot).await.unwrap();
        let err = f
            .helpdesk
            .accept(&Actor::staff(STAFF_B), &snapshot)
            .await
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::AlreadyClaimed));

        let stored = f.helpdesk.store().get_ticket(snapshot.id).await.unwrap().unwrap();
        assert_eq!(stored.assignee, Some(STAFF_A));
    }

    #[tokio::test]
    async fn test_superuser_reassigns_claimed_ticket() {
        let f = fixture().await;
        let ticket = f
            .helpdesk
            .create_ticket(&Actor::requester(REQUESTER), f.printer_jam.id, "", "")
            .await
            .unwrap();
        f.helpdesk
            .claim_ticket(&Actor::staff(STAFF_A), ticket.id)
            .await
            .unwrap();
        let taken = f
            .helpdesk
            .claim_ticket(&Actor::superuser(BOSS), ticket.id)
            .await
            .unwrap();
        assert_eq!(taken.assignee, Some(BOSS));
    }

    #[tokio::test]
    async fn test_update_changes_issue_type_and_rederives_labels() {
        let f = fixture().await;
        let ticket = f
            .helpdesk
            .create_ticket(&Actor::requester(REQUESTER), f.printer_jam.id, "", "")
            .await
            .unwrap();
        let staff = Actor::staff(STAFF_A);
        f.helpdesk.claim_ticket(&staff, ticket.id).await.unwrap();

        let updated = f
            .helpdesk
            .update_ticket(
                &staff,
                ticket.id,
                TicketChanges {
                    issue_type: Some(f.wifi_down.id),
                    status: Some(TicketStatus::OnHold),
                    comment: Some("  waiting on vendor ".to_string()),
                    ..changes()
                },
            )
            .await
            .unwrap();

        assert!(updated.mirrors(&f.wifi_down));
        assert_eq!(updated.status, TicketStatus::OnHold);
        let comments = f.helpdesk.store().list_comments(ticket.id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body.as_str(), "waiting on vendor");
        assert!(!comments[0].internal);
    }

    #[tokio::test]
    async fn test_ticket_keeps_deactivated_issue_type() {
        let f = fixture().await;
        let ticket = f
            .helpdesk
            .create_ticket(&Actor::requester(REQUESTER), f.printer_jam.id, "", "")
            .await
            .unwrap();
        f.helpdesk
            .store()
            .set_issue_type_active(f.printer_jam.id, false)
            .await
            .unwrap();

        let updated = f
            .helpdesk
            .update_ticket(
                &Actor::superuser(BOSS),
                ticket.id,
                TicketChanges {
                    issue_type: Some(f.printer_jam.id),
                    description: Some("still jammed".to_string()),
                    ..changes()
                },
            )
            .await
            .unwrap();
        assert!(updated.mirrors(&f.printer_jam));
        assert_eq!(updated.description, "still jammed");

        let err = f
            .helpdesk
            .update_ticket(
                &Actor::superuser(BOSS),
                ticket.id,
                TicketChanges {
                    issue_type: Some(f.retired.id),
                    ..changes()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::InvalidIssueType));
    }

    #[tokio::test]
    async fn test_update_rejects_backward_and_closing_moves() {
        let f = fixture().await;
        let ticket = f
            .helpdesk
            .create_ticket(&Actor::requester(REQUESTER), f.printer_jam.id, "", "")
            .await
            .unwrap();
        let staff = Actor::staff(STAFF_A);
        f.helpdesk.claim_ticket(&staff, ticket.id).await.unwrap();

        for to in [TicketStatus::Open, TicketStatus::Closed] {
            let err = f
                .helpdesk
                .update_ticket(
                    &staff,
                    ticket.id,
                    TicketChanges {
                        status: Some(to),
                        ..changes()
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                HelpdeskError::InvalidTransition {
                    from: TicketStatus::InProgress,
                    ..
                }
            ));
        }
    }

    #[tokio::test]
    async fn test_update_validates_assignee() {
        let f = fixture().await;
        let ticket = f
            .helpdesk
            .create_ticket(&Actor::requester(REQUESTER), f.printer_jam.id, "", "")
            .await
            .unwrap();
        let boss = Actor::superuser(BOSS);

        for bad in [REQUESTER, UserId::new(999)] {
            let err = f
                .helpdesk
                .update_ticket(
                    &boss,
                    ticket.id,
                    TicketChanges {
                        assignee: Some(Some(bad)),
                        ..changes()
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, HelpdeskError::InvalidAssignee));
        }

        let updated = f
            .helpdesk
            .update_ticket(
                &boss,
                ticket.id,
                TicketChanges {
                    assignee: Some(Some(STAFF_B)),
                    ..changes()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.assignee, Some(STAFF_B));
    }

    #[tokio::test]
    async fn test_update_by_non_assignee_denied() {
        let f = fixture().await;
        let ticket = f
            .helpdesk
            .create_ticket(&Actor::requester(REQUESTER), f.printer_jam.id, "", "")
            .await
            .unwrap();
        f.helpdesk
            .claim_ticket(&Actor::staff(STAFF_A), ticket.id)
            .await
            .unwrap();
        let err = f
            .helpdesk
            .update_ticket(&Actor::staff(STAFF_B), ticket.id, changes())
            .await
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::AuthorizationDenied { .. }));
    }

    #[tokio::test]
    async fn test_stale_update_is_concurrent_modification() {
        let f = fixture().await;
        let ticket = f
            .helpdesk
            .create_ticket(&Actor::requester(REQUESTER), f.printer_jam.id, "", "")
            .await
            .unwrap();
        let staff = Actor::staff(STAFF_A);
        let snapshot = f.helpdesk.claim_ticket(&staff, ticket.id).await.unwrap();

        f.helpdesk
            .update(
                &staff,
                &snapshot,
                TicketChanges {
                    description: Some("first".to_string()),
                    ..changes()
                },
            )
            .await
            .unwrap();
        let err = f
            .helpdesk
            .update(
                &staff,
                &snapshot,
                TicketChanges {
                    description: Some("second".to_string()),
                    comment: Some("lost".to_string()),
                    ..changes()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, HelpdeskError::ConcurrentModification));
        assert!(
            f.helpdesk
                .store()
                .list_comments(ticket.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_close_with_comment_then_frozen() {
        let f = fixture().await;
        let ticket = f
            .helpdesk
            .create_ticket(&Actor::requester(REQUESTER), f.printer_jam.id, "", "")
            .await
            .unwrap();
        let staff = Actor::staff(STAFF_A);
        f.helpdesk.claim_ticket(&staff, ticket.id).await.unwrap();

        let closed = f
            .helpdesk
            .close_ticket(&staff, ticket.id, Some(" fixed "))
            .await
            .unwrap();
        assert!(closed.is_closed());
        let comments = f.helpdesk.store().list_comments(ticket.id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body.as_str(), "fixed");

        let boss = Actor::superuser(BOSS);
        assert!(matches!(
            f.helpdesk.close_ticket(&boss, ticket.id, None).await,
            Err(HelpdeskError::TerminalStateViolation)
        ));
        assert!(matches!(
            f.helpdesk.update_ticket(&boss, ticket.id, changes()).await,
            Err(HelpdeskError::TerminalStateViolation)
        ));
        assert!(matches!(
            f.helpdesk.claim_ticket(&boss, ticket.id).await,
            Err(HelpdeskError::TerminalStateViolation)
        ));
    }

    #[tokio::test]
    async fn test_close_with_blank_comment_adds_nothing() {
        let f = fixture().await;
        let ticket = f
            .helpdesk
            .create_ticket(&Actor::requester(REQUESTER), f.printer_jam.id, "", "")
            .await
            .unwrap();
        f.helpdesk
            .close_ticket(&Actor::superuser(BOSS), ticket.id, Some("   "))
            .await
            .unwrap();
        assert!(
            f.helpdesk
                .store()
                .list_comments(ticket.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_check_transition() {
        assert!(check_transition(TicketStatus::Open, TicketStatus::OnHold).is_ok());
        assert!(check_transition(TicketStatus::OnHold, TicketStatus::InProgress).is_ok());
        assert!(check_transition(TicketStatus::Open, TicketStatus::Open).is_ok());
        assert!(check_transition(TicketStatus::OnHold, TicketStatus::Open).is_err());
        assert!(check_transition(TicketStatus::Open, TicketStatus::Closed).is_err());
    }
}
