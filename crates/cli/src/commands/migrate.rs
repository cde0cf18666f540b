//! Database migration command.
//!
//! Applies the migrations in `crates/server/migrations/`, which are embedded
//! into the binary at compile time.
//!
//! ```text
//! migrations/
//! ├── 20261019000001_create_catalog.sql
//! ├── 20261019000002_create_users.sql
//! └── 20261019000003_create_tickets.sql
//! ```

use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] super::ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending helpdesk migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let (_config, pool) = super::connect().await?;

    tracing::info!("Running helpdesk migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Helpdesk migrations complete!");
    Ok(())
}
