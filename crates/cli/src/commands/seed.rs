//! Seed the catalog and the user directory from a YAML file.
//!
//! ```yaml
//! categories:
//!   - name: Hardware
//!     description: Desktops, laptops and peripherals
//!     issue_types:
//!       - name: Printer Jam
//!       - name: Fax Machine
//!         active: false
//! users:
//!   - id: 200
//!     display_name: Somchai
//!     staff: true
//!     contact: ext. 2200
//! ```
//!
//! Seeding is idempotent: categories and issue types that already exist by
//! name are reused, users are upserted.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use helpdesk_core::{DirectoryEntry, UserId};
use helpdesk_server::db::postgres::PgStore;
use helpdesk_server::db::{HelpdeskStore, RepositoryError};

/// Top-level seed document.
#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub issue_types: Vec<SeedIssueType>,
}

#[derive(Debug, Deserialize)]
pub struct SeedIssueType {
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub id: i32,
    pub display_name: String,
    #[serde(default)]
    pub superuser: bool,
    #[serde(default)]
    pub staff: bool,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub contact: String,
}

const fn default_true() -> bool {
    true
}

impl SeedUser {
    fn entry(&self) -> DirectoryEntry {
        DirectoryEntry {
            id: UserId::new(self.id),
            display_name: self.display_name.trim().to_owned(),
            is_superuser: self.superuser,
            has_staff_permission: self.staff,
            is_active: self.active,
            contact: self.contact.trim().to_owned(),
        }
    }
}

/// What a seeding run changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories_created: usize,
    pub issue_types_created: usize,
    pub users_upserted: usize,
}

/// Check a seed document before touching the database.
///
/// Returns one message per problem: blank names and names repeated within
/// the file.
#[must_use]
pub fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut categories = HashSet::new();

    for category in &seed.categories {
        let name = category.name.trim();
        if name.is_empty() {
            errors.push("category with a blank name".to_string());
            continue;
        }
        if !categories.insert(name) {
            errors.push(format!("category {name:?} listed twice"));
        }

        let mut issue_types = HashSet::new();
        for issue_type in &category.issue_types {
            let it = issue_type.name.trim();
            if it.is_empty() {
                errors.push(format!("issue type with a blank name in {name:?}"));
            } else if !issue_types.insert(it) {
                errors.push(format!("issue type {it:?} listed twice in {name:?}"));
            }
        }
    }

    let mut users = HashSet::new();
    for user in &seed.users {
        if user.display_name.trim().is_empty() {
            errors.push(format!("user {} has a blank display name", user.id));
        }
        if !users.insert(user.id) {
            errors.push(format!("user {} listed twice", user.id));
        }
    }

    errors
}

/// Write `seed` into `store`, reusing catalog entries that already exist.
///
/// # Errors
///
/// Returns the first store failure.
pub async fn apply<S: HelpdeskStore>(
    store: &S,
    seed: &SeedFile,
) -> Result<SeedReport, RepositoryError> {
    let mut report = SeedReport::default();
    let mut categories = store.list_categories().await?;
    let issue_types = store.list_issue_types(false).await?;

    for wanted in &seed.categories {
        let name = wanted.name.trim();
        let category = if let Some(existing) = categories.iter().find(|c| c.name == name) {
            existing.id
        } else {
            let created = store
                .insert_category(name, wanted.description.trim())
                .await?;
            info!(category = %created.id, name, "Category created");
            report.categories_created += 1;
            let id = created.id;
            categories.push(created);
            id
        };

        for issue_type in &wanted.issue_types {
            let it = issue_type.name.trim();
            let exists = issue_types
                .iter()
                .any(|existing| existing.category == category && existing.name == it);
            if exists {
                continue;
            }
            let created = store
                .insert_issue_type(it, category, issue_type.active)
                .await?;
            info!(issue_type = %created.id, name = it, "Issue type created");
            report.issue_types_created += 1;
        }
    }

    for user in &seed.users {
        store.upsert_user(user.entry()).await?;
        report.users_upserted += 1;
    }

    Ok(report)
}

/// Seed from the YAML file at `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or the database operations fail.
pub async fn run(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let (_config, pool) = super::connect().await?;
    let store = PgStore::new(pool);

    let report = apply(&store, &seed).await?;

    info!("Seeding complete!");
    info!("  Categories created: {}", report.categories_created);
    info!("  Issue types created: {}", report.issue_types_created);
    info!("  Users upserted: {}", report.users_upserted);

    Ok(())
}
