//! Year summary export for the report renderer.

use helpdesk_server::db::postgres::PgStore;
use helpdesk_server::services::build_year_summary;

/// Build the summary for `year` and write it as pretty JSON to `out`, or to
/// stdout when no path is given.
///
/// # Errors
///
/// Returns an error for a year outside 1..=9999, a store failure or an
/// unwritable output file.
pub async fn run(year: i32, out: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let (config, pool) = super::connect().await?;
    let store = PgStore::new(pool);

    let summary = build_year_summary(&store, year, config.utc_offset).await?;
    tracing::info!(
        year,
        categories = summary.rows.len(),
        grand_total = summary.grand_total,
        "Year summary built"
    );

    let json = serde_json::to_string_pretty(&summary)?;
    match out {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            tracing::info!(path, "Summary written");
        }
        None => {
            #[allow(clippy::print_stdout)]
            {
                println!("{json}");
            }
        }
    }
    Ok(())
}
