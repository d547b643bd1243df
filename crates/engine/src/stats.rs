use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::{DateRange, Expense, Money};

/// Descriptive statistics over a list of amounts.
///
/// An empty input yields all zeros, including `avg`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub sum: Money,
    pub avg: Money,
    pub min: Money,
    pub max: Money,
    pub count: usize,
}

pub fn statistics<I>(amounts: I) -> Statistics
where
    I: IntoIterator<Item = Money>,
{
    let mut iter = amounts.into_iter();
    let Some(first) = iter.next() else {
        return Statistics::default();
    };

    let (sum, min, max, count) = iter.fold((first, first, first, 1usize), |acc, amount| {
        (acc.0 + amount, acc.1.min(amount), acc.2.max(amount), acc.3 + 1)
    });

    Statistics {
        sum,
        avg: sum.div_round(count),
        min,
        max,
        count,
    }
}

/// Headline figures for the dashboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub today: Money,
    pub this_week: Money,
    pub this_month: Money,
    pub overall: Statistics,
}

pub fn summarize<Tz: TimeZone>(records: &[Expense], now: &DateTime<Tz>) -> Summary {
    let total_in = |range: DateRange| -> Money {
        records
            .iter()
            .filter(|expense| range.contains(&expense.date, now))
            .map(|expense| expense.amount)
            .sum()
    };

    Summary {
        today: total_in(DateRange::Today),
        this_week: total_in(DateRange::Week),
        this_month: total_in(DateRange::Month),
        overall: statistics(records.iter().map(|expense| expense.amount)),
    }
}
