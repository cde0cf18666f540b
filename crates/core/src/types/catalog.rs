//! Ticket categories and issue types.

use serde::{Deserialize, Serialize};

use super::id::{CategoryId, IssueTypeId};

/// A reporting category such as "Hardware" or "Network".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// Unique across categories.
    pub name: String,
    pub description: String,
}

/// A selectable kind of problem, belonging to exactly one category.
///
/// Only active issue types can be picked for new tickets. Deactivating one
/// leaves existing tickets pointing at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueType {
    pub id: IssueTypeId,
    /// Unique within its category.
    pub name: String,
    pub category: CategoryId,
    pub active: bool,
}
