use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Category, Money};

/// A single spending record.
///
/// Records are never mutated in place by the engine: an edit is a full
/// replacement inside the owning collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub amount: Money,
    pub category: Category,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
}

impl Expense {
    /// Builds a new record with a freshly generated identifier.
    ///
    /// Uniqueness relies on UUID v4; collisions are not checked.
    pub fn new(
        amount: Money,
        category: Category,
        description: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            amount,
            category,
            description: description.into().trim().to_string(),
            date,
        }
    }
}
