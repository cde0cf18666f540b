//! Helpdesk CLI - database migrations, catalog seeding and reports.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! helpdesk migrate
//!
//! # Load categories, issue types and users from YAML
//! helpdesk seed catalog.yaml
//!
//! # Export the year summary as JSON
//! helpdesk summary 2026 --out summary-2026.json
//! ```
//!
//! All commands read `HELPDESK_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "helpdesk")]
#[command(author, version, about = "IT helpdesk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed categories, issue types and directory users from a YAML file
    Seed {
        /// Path to the YAML seed file
        file: String,
    },
    /// Export the month-by-category summary for a year as JSON
    Summary {
        /// Calendar year in the reporting time zone
        year: i32,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(&file).await?,
        Commands::Summary { year, out } => {
            commands::summary::run(year, out.as_deref()).await?;
        }
    }
    Ok(())
}
