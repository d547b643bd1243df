//! Per-category totals and calendar-aligned time series.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, TimeZone};
use serde::Serialize;

use crate::{
    Category, Expense, Money,
    calendar::{local_date, month_start, shift_month, week_start},
};

/// Sum per category; always holds every [`Category`].
pub type CategoryTotals = BTreeMap<Category, Money>;

/// One point of a spending series.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub label: String,
    /// First local day covered by the bucket.
    pub start: NaiveDate,
    pub total: Money,
}

impl Bucket {
    fn empty(start: NaiveDate, label_format: &str) -> Self {
        Self {
            label: start.format(label_format).to_string(),
            start,
            total: Money::ZERO,
        }
    }
}

/// Sums amounts per category.
///
/// Every known category is present in the result, zero when nothing was
/// spent on it. Records read with an unknown category were already folded
/// into [`Category::Other`].
pub fn aggregate_by_category<'a, I>(records: I) -> CategoryTotals
where
    I: IntoIterator<Item = &'a Expense>,
{
    let mut totals: CategoryTotals = Category::ALL
        .into_iter()
        .map(|category| (category, Money::ZERO))
        .collect();
    for expense in records {
        *totals.entry(expense.category).or_default() += expense.amount;
    }
    totals
}

/// Categories with a non-zero total, largest first.
///
/// Ties keep category order. At most `limit` entries are returned.
pub fn top_categories(totals: &CategoryTotals, limit: usize) -> Vec<(Category, Money)> {
    let mut out: Vec<(Category, Money)> = totals
        .iter()
        .filter(|(_, total)| !total.is_zero())
        .map(|(category, total)| (*category, *total))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1));
    out.truncate(limit);
    out
}

/// `month_count` calendar months ending with the month of `now`, oldest first.
///
/// Records are matched by local year and month, not by a rolling 30-day
/// window.
pub fn bucket_by_month<'a, I, Tz>(records: I, month_count: usize, now: &DateTime<Tz>) -> Vec<Bucket>
where
    I: IntoIterator<Item = &'a Expense>,
    Tz: TimeZone,
{
    let today = now.date_naive();
    let span = i32::try_from(month_count).unwrap_or(i32::MAX);
    let starts = (0..span)
        .rev()
        .filter_map(|back| {
            let (year, month) = shift_month(today.year(), today.month(), -back);
            NaiveDate::from_ymd_opt(year, month, 1)
        })
        .collect();

    fill(records, starts, "%b %Y", &now.timezone(), month_start)
}

/// `week_count` Sunday-aligned weeks ending with the current week, oldest first.
pub fn bucket_by_week<'a, I, Tz>(records: I, week_count: usize, now: &DateTime<Tz>) -> Vec<Bucket>
where
    I: IntoIterator<Item = &'a Expense>,
    Tz: TimeZone,
{
    let current = week_start(now.date_naive());
    let starts = (0..week_count as i64)
        .rev()
        .map(|back| current - TimeDelta::weeks(back))
        .collect();

    fill(records, starts, "%b %d", &now.timezone(), week_start)
}

/// `day_count` calendar days ending today, oldest first.
pub fn bucket_by_day<'a, I, Tz>(records: I, day_count: usize, now: &DateTime<Tz>) -> Vec<Bucket>
where
    I: IntoIterator<Item = &'a Expense>,
    Tz: TimeZone,
{
    let today = now.date_naive();
    let starts = (0..day_count as i64)
        .rev()
        .map(|back| today - TimeDelta::days(back))
        .collect();

    fill(records, starts, "%b %d", &now.timezone(), |day| day)
}

/// Sums each record into the bucket whose start equals `align(local day)`.
fn fill<'a, I, Tz>(
    records: I,
    starts: Vec<NaiveDate>,
    label_format: &str,
    tz: &Tz,
    align: fn(NaiveDate) -> NaiveDate,
) -> Vec<Bucket>
where
    I: IntoIterator<Item = &'a Expense>,
    Tz: TimeZone,
{
    let mut buckets: Vec<Bucket> = starts
        .into_iter()
        .map(|start| Bucket::empty(start, label_format))
        .collect();
    let index: HashMap<NaiveDate, usize> = buckets
        .iter()
        .enumerate()
        .map(|(position, bucket)| (bucket.start, position))
        .collect();

    for expense in records {
        let key = align(local_date(&expense.date, tz));
        if let Some(&position) = index.get(&key) {
            buckets[position].total += expense.amount;
        }
    }
    buckets
}
