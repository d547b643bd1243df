//! Fixed set of expense categories.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Expense category.
///
/// The set is closed: any name outside of it folds into [`Category::Other`]
/// when read from storage, so aggregations always land in a known bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Category {
    Food,
    Transport,
    Shopping,
    Entertainment,
    Bills,
    Health,
    Education,
    Other,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 8] = [
        Category::Food,
        Category::Transport,
        Category::Shopping,
        Category::Entertainment,
        Category::Bills,
        Category::Health,
        Category::Education,
        Category::Other,
    ];

    /// Canonical lowercase key, as stored and matched by searches.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Transport => "transport",
            Self::Shopping => "shopping",
            Self::Entertainment => "entertainment",
            Self::Bills => "bills",
            Self::Health => "health",
            Self::Education => "education",
            Self::Other => "other",
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Food => "Food & Dining",
            Self::Transport => "Transportation",
            Self::Shopping => "Shopping",
            Self::Entertainment => "Entertainment",
            Self::Bills => "Bills & Utilities",
            Self::Health => "Health",
            Self::Education => "Education",
            Self::Other => "Other",
        }
    }

    fn lookup(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lenient conversion: unknown names become [`Category::Other`].
impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Self::lookup(value).unwrap_or(Self::Other)
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

/// Strict parsing, for user input where a typo should be reported.
impl FromStr for Category {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| EngineError::InvalidCategory(s.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_fold_into_other() {
        assert_eq!(Category::from("FOOD"), Category::Food);
        assert_eq!(Category::from("groceries"), Category::Other);
        assert!("groceries".parse::<Category>().is_err());
        assert_eq!(" bills ".parse::<Category>(), Ok(Category::Bills));
    }

    #[test]
    fn serde_roundtrips_lowercase_and_folds_unknown() {
        assert_eq!(
            serde_json::to_string(&Category::Entertainment).unwrap(),
            "\"entertainment\""
        );
        let parsed: Category = serde_json::from_str("\"pets\"").unwrap();
        assert_eq!(parsed, Category::Other);
    }
}
