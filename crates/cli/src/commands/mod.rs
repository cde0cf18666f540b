//! CLI subcommands.

pub mod migrate;
pub mod seed;
pub mod summary;

use helpdesk_server::config::{ConfigError, HelpdeskConfig};
use helpdesk_server::db;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur while connecting.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Load configuration and connect to the helpdesk database.
async fn connect() -> Result<(HelpdeskConfig, PgPool), ConnectError> {
    let config = HelpdeskConfig::from_env()?;
    tracing::info!("Connecting to helpdesk database...");
    let pool = db::create_pool(&config.database_url).await?;
    Ok((config, pool))
}
