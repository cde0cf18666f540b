//! Month-by-category ticket counts for a year.
//!
//! The summary is what the report renderer consumes. Months are taken from
//! `created_at` in the reporting time zone. Every category gets a row, zero
//! rows included; tickets without a category are counted in a trailing
//! uncategorized row that appears only when non-empty. This keeps
//! `grand_total` equal to the number of tickets created in the year.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use helpdesk_core::{Actor, Category, CategoryId, Ticket};

use super::listing::start_of_day;
use super::{Helpdesk, HelpdeskError, Result, require_staff};
use crate::db::{CatalogStore, HelpdeskStore, TicketStore};

/// Column headings for the twelve months.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Label of the row collecting tickets without a category.
const UNCATEGORIZED: &str = "Uncategorized";

/// One row of the summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRow {
    /// `None` for the uncategorized row.
    pub category: Option<CategoryId>,
    pub name: String,
    pub monthly: [u32; 12],
    pub row_total: u32,
}

impl CategoryRow {
    fn new(category: Option<CategoryId>, name: String) -> Self {
        Self {
            category,
            name,
            monthly: [0; 12],
            row_total: 0,
        }
    }

    fn count(&mut self, month0: usize) {
        if let Some(cell) = self.monthly.get_mut(month0) {
            *cell += 1;
            self.row_total += 1;
        }
    }
}

/// Tickets created in a year, by category and month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearSummary {
    pub year: i32,
    pub months: [&'static str; 12],
    pub rows: Vec<CategoryRow>,
    pub month_totals: [u32; 12],
    pub grand_total: u32,
}

/// Build the summary for `year` from already loaded rows.
///
/// Tickets whose local creation date falls outside `year` are ignored.
#[must_use]
pub fn aggregate(
    year: i32,
    offset: FixedOffset,
    categories: &[Category],
    tickets: &[Ticket],
) -> YearSummary {
    let mut sorted: Vec<&Category> = categories.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut rows: Vec<CategoryRow> = sorted
        .iter()
        .map(|c| CategoryRow::new(Some(c.id), c.name.clone()))
        .collect();
    let index: HashMap<CategoryId, usize> = sorted
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id, i))
        .collect();
    let mut uncategorized = CategoryRow::new(None, UNCATEGORIZED.to_owned());
    let mut month_totals = [0_u32; 12];
    let mut grand_total = 0_u32;

    for ticket in tickets {
        let local = ticket.created_at.with_timezone(&offset);
        if local.year() != year {
            continue;
        }
        let month0 = local.month0() as usize;
        let Some(month_total) = month_totals.get_mut(month0) else {
            continue;
        };
        *month_total += 1;
        grand_total += 1;

        let row = ticket
            .category
            .and_then(|c| index.get(&c))
            .and_then(|&i| rows.get_mut(i))
            .unwrap_or(&mut uncategorized);
        row.count(month0);
    }

    if uncategorized.row_total > 0 {
        rows.push(uncategorized);
    }

    YearSummary {
        year,
        months: MONTH_LABELS,
        rows,
        month_totals,
        grand_total,
    }
}

/// Load and aggregate the summary for `year` straight from a store.
///
/// No authorization is applied; callers decide who may see the result.
///
/// # Errors
///
/// `InvalidYear` outside 1..=9999, `StoreUnavailable` if the store fails.
pub async fn build_year_summary<S>(store: &S, year: i32, offset: FixedOffset) -> Result<YearSummary>
where
    S: TicketStore + CatalogStore,
{
    let (start, end) = year_bounds(year, offset).ok_or(HelpdeskError::InvalidYear(year))?;
    let categories = store.list_categories().await?;
    let tickets = store.tickets_created_between(start, end).await?;
    Ok(aggregate(year, offset, &categories, &tickets))
}

/// UTC bounds of the local `year`, end exclusive.
fn year_bounds(year: i32, offset: FixedOffset) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    if !(1..=9999).contains(&year) {
        return None;
    }
    let start = start_of_day(NaiveDate::from_ymd_opt(year, 1, 1)?, offset)?;
    let end = start_of_day(NaiveDate::from_ymd_opt(year + 1, 1, 1)?, offset)?;
    Some((start, end))
}

impl<S: HelpdeskStore> Helpdesk<S> {
    /// Year summary for IT staff.
    ///
    /// # Errors
    ///
    /// `AuthorizationDenied` for non-staff, otherwise see
    /// [`build_year_summary`].
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn year_summary(&self, actor: &Actor, year: i32) -> Result<YearSummary> {
        require_staff(actor, "view summaries")?;
        let summary = build_year_summary(&self.store, year, self.offset).await?;
        info!(grand_total = summary.grand_total, "Year summary built");
        Ok(summary)
    }
}
