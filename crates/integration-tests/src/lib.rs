//! Shared setup for the helpdesk end-to-end tests.
//!
//! Tests run against [`MemoryStore`], so no database is needed:
//!
//! ```bash
//! cargo test -p helpdesk-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `lifecycle` - claim, update and close flows including races
//! - `visibility` - who sees which tickets and comments
//! - `summary` - year summary totals
//! - `http_api` - the JSON API through the full router

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use chrono::FixedOffset;

use helpdesk_core::{Category, DirectoryEntry, IssueType, UserId};
use helpdesk_server::db::{CatalogStore, Directory, MemoryStore};
use helpdesk_server::services::Helpdesk;
use helpdesk_server::state::AppState;

/// A requester without any role.
pub const REQUESTER: UserId = UserId::new(100);
/// Another requester, unrelated to `REQUESTER`'s tickets.
pub const OUTSIDER: UserId = UserId::new(101);
/// IT staff member holding the ticket-management permission.
pub const STAFF_A: UserId = UserId::new(200);
/// Second IT staff member.
pub const STAFF_B: UserId = UserId::new(201);
/// A superuser.
pub const ROOT: UserId = UserId::new(300);

/// Seeded catalog entries.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub hardware: Category,
    pub network: Category,
    pub printer_jam: IssueType,
    pub wifi_down: IssueType,
}

/// A helpdesk over a freshly seeded memory store.
pub struct TestContext {
    pub helpdesk: Arc<Helpdesk<MemoryStore>>,
    pub catalog: Catalog,
}

impl TestContext {
    /// Seed the catalog and directory, reporting in UTC.
    pub async fn new() -> Self {
        Self::with_offset(FixedOffset::east_opt(0).unwrap()).await
    }

    /// Seed the catalog and directory, reporting in `offset`.
    pub async fn with_offset(offset: FixedOffset) -> Self {
        let (store, catalog) = seeded_store().await;
        Self {
            helpdesk: Arc::new(Helpdesk::new(store, offset)),
            catalog,
        }
    }
}

fn user(id: UserId, name: &str, superuser: bool, staff: bool) -> DirectoryEntry {
    DirectoryEntry {
        id,
        display_name: name.to_string(),
        is_superuser: superuser,
        has_staff_permission: staff,
        is_active: true,
        contact: String::new(),
    }
}

/// A memory store with the "Hardware" and "Network" categories and users
/// for every role.
pub async fn seeded_store() -> (MemoryStore, Catalog) {
    let store = MemoryStore::new();
    let hardware = store.insert_category("Hardware", "").await.unwrap();
    let network = store.insert_category("Network", "").await.unwrap();
    let printer_jam = store
        .insert_issue_type("Printer Jam", hardware.id, true)
        .await
        .unwrap();
    let wifi_down = store
        .insert_issue_type("Wi-Fi Down", network.id, true)
        .await
        .unwrap();

    for entry in [
        user(REQUESTER, "Somchai", false, false),
        user(OUTSIDER, "Malee", false, false),
        user(STAFF_A, "Anna", false, true),
        user(STAFF_B, "Ben", false, true),
        user(ROOT, "Root", true, false),
    ] {
        store.upsert_user(entry).await.unwrap();
    }

    let catalog = Catalog {
        hardware,
        network,
        printer_jam,
        wifi_down,
    };
    (store, catalog)
}

/// The full router over a seeded memory store.
pub async fn test_app() -> (Router, Catalog) {
    let (store, catalog) = seeded_store().await;
    let helpdesk = Helpdesk::new(store, FixedOffset::east_opt(0).unwrap());
    (helpdesk_server::app(AppState::new(helpdesk)), catalog)
}
