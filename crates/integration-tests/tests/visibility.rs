//! Who can see which tickets and comments.

#![allow(clippy::unwrap_used)]

use helpdesk_core::{Action, Actor};
use helpdesk_integration_tests::{OUTSIDER, REQUESTER, ROOT, STAFF_A, STAFF_B, TestContext};
use helpdesk_server::services::{HelpdeskError, TicketFilter};

#[tokio::test]
async fn test_requester_never_receives_internal_comments() {
    let ctx = TestContext::new().await;
    let requester = Actor::requester(REQUESTER);
    let anna = Actor::staff(STAFF_A);
    let ticket = ctx
        .helpdesk
        .create_ticket(&requester, ctx.catalog.printer_jam.id, "", "")
        .await
        .unwrap();

    ctx.helpdesk
        .add_comment(&anna, ticket.id, "vendor case 88-1", true)
        .await
        .unwrap();
    ctx.helpdesk
        .add_comment(&anna, ticket.id, "on my way", false)
        .await
        .unwrap();

    let detail = ctx.helpdesk.ticket_detail(&requester, ticket.id).await.unwrap();
    assert!(detail.comments.iter().all(|c| !c.internal));
    assert_eq!(detail.comments.len(), 1);

    let listed = ctx.helpdesk.list_comments(&requester, ticket.id).await.unwrap();
    assert!(listed.iter().all(|c| !c.internal));

    let staff_view = ctx
        .helpdesk
        .ticket_detail(&Actor::staff(STAFF_B), ticket.id)
        .await
        .unwrap();
    assert_eq!(staff_view.comments.len(), 2);
}

#[tokio::test]
async fn test_assignee_sees_ticket_in_listing() {
    let ctx = TestContext::new().await;
    let ticket = ctx
        .helpdesk
        .create_ticket(&Actor::requester(REQUESTER), ctx.catalog.wifi_down.id, "", "")
        .await
        .unwrap();
    ctx.helpdesk
        .claim_ticket(&Actor::staff(STAFF_A), ticket.id)
        .await
        .unwrap();

    let outsider = Actor::requester(OUTSIDER);
    let listed = ctx
        .helpdesk
        .list_tickets(&outsider, &TicketFilter::default())
        .await
        .unwrap();
    assert!(listed.is_empty());
    assert!(matches!(
        ctx.helpdesk.get_ticket(&outsider, ticket.id).await,
        Err(HelpdeskError::AuthorizationDenied { .. })
    ));

    let root = Actor::superuser(ROOT);
    let detail = ctx.helpdesk.ticket_detail(&root, ticket.id).await.unwrap();
    assert!(detail.actions.contains(Action::Edit));
    assert!(detail.actions.contains(Action::Close));
}
