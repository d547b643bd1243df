//! Declarative filter/sort specification and its evaluation.

use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{
    Category, EngineError, Expense,
    calendar::{month_start, start_of_day, week_start, year_start},
};

/// Enumerated date window, relative to a reference "now".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    #[default]
    All,
    /// The local calendar day of "now".
    Today,
    /// Since the most recent Sunday, 00:00 local.
    Week,
    /// Since day 1 of the month, 00:00 local.
    Month,
    /// Rolling 30 days ending at "now", inclusive.
    Last30,
    /// Since January 1st, 00:00 local.
    Year,
}

impl DateRange {
    pub const ALL: [DateRange; 6] = [
        DateRange::All,
        DateRange::Today,
        DateRange::Week,
        DateRange::Month,
        DateRange::Last30,
        DateRange::Year,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
            Self::Last30 => "last30",
            Self::Year => "year",
        }
    }

    /// Absolute bounds `[start, end)` of the window; `None` for [`DateRange::All`].
    ///
    /// Only `Today` has an upper bound. The other windows are open-ended, so
    /// records dated after "now" still match them.
    pub fn bounds<Tz: TimeZone>(
        self,
        now: &DateTime<Tz>,
    ) -> Option<(DateTime<Utc>, Option<DateTime<Utc>>)> {
        let tz = now.timezone();
        let today = now.date_naive();
        match self {
            Self::All => None,
            Self::Today => Some((
                start_of_day(today, &tz),
                today.succ_opt().map(|next| start_of_day(next, &tz)),
            )),
            Self::Week => Some((start_of_day(week_start(today), &tz), None)),
            Self::Month => Some((start_of_day(month_start(today), &tz), None)),
            Self::Year => Some((start_of_day(year_start(today), &tz), None)),
            Self::Last30 => Some((now.with_timezone(&Utc) - TimeDelta::days(30), None)),
        }
    }

    /// Whether `date` falls inside the window anchored at `now`.
    pub fn contains<Tz: TimeZone>(self, date: &DateTime<Utc>, now: &DateTime<Tz>) -> bool {
        within(date, self.bounds(now).as_ref())
    }
}

fn within(date: &DateTime<Utc>, bounds: Option<&(DateTime<Utc>, Option<DateTime<Utc>>)>) -> bool {
    match bounds {
        None => true,
        Some((start, end)) => date >= start && end.as_ref().is_none_or(|end| date < end),
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateRange {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|range| range.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| EngineError::InvalidDateRange(needle.to_string()))
    }
}

/// Category constraint: everything, or exactly one category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    #[must_use]
    pub fn matches(self, category: Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == category,
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(category) => write!(f, "{category}"),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        trimmed.parse().map(Self::Only)
    }
}

impl TryFrom<String> for CategoryFilter {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CategoryFilter> for String {
    fn from(value: CategoryFilter) -> Self {
        value.to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Date,
    Amount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort key plus direction, written `date-desc`, `amount-asc`, ...
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub const NEWEST_FIRST: SortSpec = SortSpec {
        key: SortKey::Date,
        direction: SortDirection::Desc,
    };

    fn compare(self, a: &Expense, b: &Expense) -> Ordering {
        let ordering = match self.key {
            SortKey::Date => a.date.cmp(&b.date),
            SortKey::Amount => a.amount.cmp(&b.amount),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self.key {
            SortKey::Date => "date",
            SortKey::Amount => "amount",
        };
        let direction = match self.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{key}-{direction}")
    }
}

impl FromStr for SortSpec {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidSort(s.trim().to_string());
        let (key, direction) = s.trim().split_once('-').ok_or_else(invalid)?;
        let key = match key.to_ascii_lowercase().as_str() {
            "date" => SortKey::Date,
            "amount" => SortKey::Amount,
            _ => return Err(invalid()),
        };
        let direction = match direction.to_ascii_lowercase().as_str() {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => return Err(invalid()),
        };
        Ok(Self { key, direction })
    }
}

/// What to show: every field left at its default means "no constraint".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    /// Case-insensitive substring matched against description and category.
    pub search_query: String,
    pub category: CategoryFilter,
    pub date_range: DateRange,
    /// `None` keeps the input order.
    pub sort: Option<SortSpec>,
}

/// Applies `spec` to `records`, relative to `now`.
///
/// Steps run in order: search, category, date range, then a stable sort, so
/// records comparing equal keep their input order.
pub fn apply_filter<'a, Tz: TimeZone>(
    records: &'a [Expense],
    spec: &FilterSpec,
    now: &DateTime<Tz>,
) -> Vec<&'a Expense> {
    let query = fold_text(spec.search_query.trim());
    let bounds = spec.date_range.bounds(now);

    let mut out: Vec<&Expense> = records
        .iter()
        .filter(|expense| query.is_empty() || matches_search(expense, &query))
        .filter(|expense| spec.category.matches(expense.category))
        .filter(|expense| within(&expense.date, bounds.as_ref()))
        .collect();

    if let Some(sort) = spec.sort {
        out.sort_by(|a, b| sort.compare(a, b));
    }
    out
}

fn matches_search(expense: &Expense, folded_query: &str) -> bool {
    fold_text(&expense.description).contains(folded_query)
        || expense.category.as_str().contains(folded_query)
}

/// Lowercases and strips diacritics, so `Caffè` matches `caffe`.
pub(crate) fn fold_text(input: &str) -> String {
    input
        .nfkd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_spec_parses_and_displays() {
        let spec: SortSpec = "amount-asc".parse().unwrap();
        assert_eq!(
            spec,
            SortSpec {
                key: SortKey::Amount,
                direction: SortDirection::Asc
            }
        );
        assert_eq!(spec.to_string(), "amount-asc");
        assert!("amount".parse::<SortSpec>().is_err());
        assert!("price-asc".parse::<SortSpec>().is_err());
        assert!("date-up".parse::<SortSpec>().is_err());
    }

    #[test]
    fn category_filter_parses_all_and_names() {
        assert_eq!("all".parse::<CategoryFilter>(), Ok(CategoryFilter::All));
        assert_eq!("".parse::<CategoryFilter>(), Ok(CategoryFilter::All));
        assert_eq!(
            "Health".parse::<CategoryFilter>(),
            Ok(CategoryFilter::Only(Category::Health))
        );
        assert!("pets".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn date_range_parses_case_insensitively() {
        assert_eq!("LAST30".parse::<DateRange>(), Ok(DateRange::Last30));
        assert!("fortnight".parse::<DateRange>().is_err());
    }

    #[test]
    fn fold_text_strips_case_and_accents() {
        assert_eq!(fold_text("Caffè Crème"), "caffe creme");
    }

    #[test]
    fn filter_spec_deserializes_with_defaults() {
        let spec: FilterSpec =
            serde_json::from_str(r#"{"category":"food","sort":{"key":"amount","direction":"desc"}}"#)
                .unwrap();
        assert_eq!(spec.category, CategoryFilter::Only(Category::Food));
        assert_eq!(spec.date_range, DateRange::All);
        assert_eq!(spec.search_query, "");
        assert_eq!(
            spec.sort,
            Some(SortSpec {
                key: SortKey::Amount,
                direction: SortDirection::Desc
            })
        );
    }
}
