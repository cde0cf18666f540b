//! Ticket lifecycle flows through the helpdesk services.

#![allow(clippy::unwrap_used)]

use helpdesk_core::{Actor, TicketChanges, TicketStatus};
use helpdesk_integration_tests::{REQUESTER, ROOT, STAFF_A, STAFF_B, TestContext};
use helpdesk_server::services::HelpdeskError;

#[tokio::test]
async fn test_printer_jam_scenario() {
    let ctx = TestContext::new().await;
    let requester = Actor::requester(REQUESTER);
    let anna = Actor::staff(STAFF_A);
    let ben = Actor::staff(STAFF_B);

    let ticket = ctx
        .helpdesk
        .create_ticket(&requester, ctx.catalog.printer_jam.id, "Tray 2 keeps jamming", "")
        .await
        .unwrap();
    assert_eq!(ticket.title, "Printer Jam");
    assert_eq!(ticket.category, Some(ctx.catalog.hardware.id));
    assert_eq!(ticket.status, TicketStatus::Open);

    let claimed = ctx.helpdesk.claim_ticket(&anna, ticket.id).await.unwrap();
    assert_eq!(claimed.assignee, Some(STAFF_A));
    assert_eq!(claimed.status, TicketStatus::InProgress);

    assert!(matches!(
        ctx.helpdesk.claim_ticket(&ben, ticket.id).await,
        Err(HelpdeskError::AlreadyClaimed)
    ));

    let closed = ctx
        .helpdesk
        .close_ticket(&anna, ticket.id, Some("fixed"))
        .await
        .unwrap();
    assert_eq!(closed.status, TicketStatus::Closed);

    assert!(matches!(
        ctx.helpdesk.claim_ticket(&ben, ticket.id).await,
        Err(HelpdeskError::TerminalStateViolation)
    ));

    let comments = ctx.helpdesk.list_comments(&requester, ticket.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].body.as_str(), "fixed");
    assert_eq!(comments[0].author, STAFF_A);
}

#[tokio::test]
async fn test_closed_ticket_is_frozen() {
    let ctx = TestContext::new().await;
    let root = Actor::superuser(ROOT);
    let ticket = ctx
        .helpdesk
        .create_ticket(&Actor::requester(REQUESTER), ctx.catalog.printer_jam.id, "", "")
        .await
        .unwrap();
    ctx.helpdesk.close_ticket(&root, ticket.id, None).await.unwrap();

    let changes = TicketChanges {
        description: Some("reopen please".to_string()),
        ..TicketChanges::default()
    };
    assert!(matches!(
        ctx.helpdesk.update_ticket(&root, ticket.id, changes).await,
        Err(HelpdeskError::TerminalStateViolation)
    ));
    assert!(matches!(
        ctx.helpdesk.claim_ticket(&root, ticket.id).await,
        Err(HelpdeskError::TerminalStateViolation)
    ));
    assert!(matches!(
        ctx.helpdesk.close_ticket(&root, ticket.id, None).await,
        Err(HelpdeskError::TerminalStateViolation)
    ));
}

#[tokio::test]
async fn test_non_staff_claim_denied() {
    let ctx = TestContext::new().await;
    let requester = Actor::requester(REQUESTER);
    let ticket = ctx
        .helpdesk
        .create_ticket(&requester, ctx.catalog.wifi_down.id, "", "")
        .await
        .unwrap();

    assert!(matches!(
        ctx.helpdesk.claim_ticket(&requester, ticket.id).await,
        Err(HelpdeskError::AuthorizationDenied { .. })
    ));
    let unchanged = ctx.helpdesk.get_ticket(&requester, ticket.id).await.unwrap();
    assert_eq!(unchanged.assignee, None);
    assert_eq!(unchanged.version, ticket.version);
}

#[tokio::test]
async fn test_concurrent_claims_have_one_winner() {
    let ctx = TestContext::new().await;
    let ticket = ctx
        .helpdesk
        .create_ticket(&Actor::requester(REQUESTER), ctx.catalog.printer_jam.id, "", "")
        .await
        .unwrap();

    let handles: Vec<_> = [STAFF_A, STAFF_B]
        .into_iter()
        .map(|id| {
            let helpdesk = ctx.helpdesk.clone();
            let snapshot = ticket.clone();
            tokio::spawn(async move { helpdesk.claim(&Actor::staff(id), &snapshot).await })
        })
        .collect();

    let mut winners = Vec::new();
    let mut losers = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(claimed) => winners.push(claimed.assignee),
            Err(HelpdeskError::AlreadyClaimed) => losers += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(losers, 1);

    let stored = ctx
        .helpdesk
        .get_ticket(&Actor::superuser(ROOT), ticket.id)
        .await
        .unwrap();
    assert_eq!(stored.assignee, winners[0]);
    assert_eq!(stored.version, ticket.version + 1);
}

#[tokio::test]
async fn test_labels_follow_issue_type_on_update() {
    let ctx = TestContext::new().await;
    let anna = Actor::staff(STAFF_A);
    let ticket = ctx
        .helpdesk
        .create_ticket(&Actor::requester(REQUESTER), ctx.catalog.printer_jam.id, "", "")
        .await
        .unwrap();
    ctx.helpdesk.claim_ticket(&anna, ticket.id).await.unwrap();

    let changes = TicketChanges {
        issue_type: Some(ctx.catalog.wifi_down.id),
        status: Some(TicketStatus::OnHold),
        comment: Some("waiting on the ISP".to_string()),
        ..TicketChanges::default()
    };
    let updated = ctx
        .helpdesk
        .update_ticket(&anna, ticket.id, changes)
        .await
        .unwrap();
    assert!(updated.mirrors(&ctx.catalog.wifi_down));
    assert_eq!(updated.status, TicketStatus::OnHold);

    let comments = ctx.helpdesk.list_comments(&anna, ticket.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert!(!comments[0].internal);
}

#[tokio::test]
async fn test_stale_snapshot_is_rejected() {
    let ctx = TestContext::new().await;
    let anna = Actor::staff(STAFF_A);
    let ticket = ctx
        .helpdesk
        .create_ticket(&Actor::requester(REQUESTER), ctx.catalog.printer_jam.id, "", "")
        .await
        .unwrap();
    let claimed = ctx.helpdesk.claim(&anna, &ticket).await.unwrap();

    let first = TicketChanges {
        description: Some("first edit".to_string()),
        ..TicketChanges::default()
    };
    ctx.helpdesk.update(&anna, &claimed, first).await.unwrap();

    let second = TicketChanges {
        description: Some("second edit".to_string()),
        ..TicketChanges::default()
    };
    assert!(matches!(
        ctx.helpdesk.update(&anna, &claimed, second).await,
        Err(HelpdeskError::ConcurrentModification)
    ));
}
