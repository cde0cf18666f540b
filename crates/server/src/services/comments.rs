//! Append-only ticket comments.

use tracing::{info, instrument, warn};

use helpdesk_core::policy::{self, Action};
use helpdesk_core::{Actor, Comment, CommentBody, NewComment, TicketId};

use super::{Helpdesk, HelpdeskError, Result};
use crate::db::HelpdeskStore;

impl<S: HelpdeskStore> Helpdesk<S> {
    /// Append a comment to ticket `id`.
    ///
    /// Anyone who can view the ticket may comment, closed or not. Only IT
    /// staff may write `internal` comments.
    ///
    /// # Errors
    ///
    /// `AuthorizationDenied` if the actor cannot view the ticket or tries to
    /// write an internal comment without being IT staff, `EmptyComment` for
    /// blank text.
    #[instrument(skip(self, actor, body), fields(actor = %actor.id))]
    pub async fn add_comment(
        &self,
        actor: &Actor,
        id: TicketId,
        body: &str,
        internal: bool,
    ) -> Result<Comment> {
        let ticket = self.load_for(actor, id, Action::Comment, "comment").await?;
        if internal && !actor.is_it_staff() {
            warn!("Internal comment by non-staff denied");
            return Err(HelpdeskError::AuthorizationDenied {
                operation: "write internal comments",
            });
        }
        let body = CommentBody::parse(body)?;

        let comment = self
            .store
            .insert_comment(
                ticket.id,
                NewComment {
                    author: actor.id,
                    body,
                    internal,
                },
            )
            .await?;

        info!(comment = %comment.id, internal, "Comment added");
        Ok(comment)
    }

    /// Comments on ticket `id` the actor may read, oldest first.
    ///
    /// # Errors
    ///
    /// `AuthorizationDenied` if the actor cannot view the ticket.
    pub async fn list_comments(&self, actor: &Actor, id: TicketId) -> Result<Vec<Comment>> {
        let ticket = self.load_for(actor, id, Action::View, "view").await?;
        self.visible_comments(actor, ticket.id).await
    }

    pub(super) async fn visible_comments(
        &self,
        actor: &Actor,
        id: TicketId,
    ) -> Result<Vec<Comment>> {
        let mut comments = self.store.list_comments(id).await?;
        comments.retain(|c| policy::can_see_comment(actor, c));
        Ok(comments)
    }
}
