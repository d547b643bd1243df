//! Monthly spending limits per category.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::{Category, DateRange, Expense, Money};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub category: Category,
    /// Limit for one calendar month.
    pub limit: Money,
}

/// How a budget stands in the current month.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BudgetStatus {
    pub category: Category,
    pub limit: Money,
    pub spent: Money,
    /// Negative once the budget is exceeded.
    pub remaining: Money,
    /// `spent / limit`; 0 when the limit is 0.
    pub ratio: f64,
    pub exceeded: bool,
}

/// Evaluates every budget against what was spent since the 1st of the
/// current month (local to `now`). Output follows the order of `budgets`.
pub fn budget_status<'a, I, Tz>(records: I, budgets: &[Budget], now: &DateTime<Tz>) -> Vec<BudgetStatus>
where
    I: IntoIterator<Item = &'a Expense>,
    Tz: TimeZone,
{
    let this_month: Vec<&Expense> = records
        .into_iter()
        .filter(|expense| DateRange::Month.contains(&expense.date, now))
        .collect();

    budgets
        .iter()
        .map(|budget| {
            let spent: Money = this_month
                .iter()
                .filter(|expense| expense.category == budget.category)
                .map(|expense| expense.amount)
                .sum();
            let ratio = if budget.limit.is_zero() {
                0.0
            } else {
                spent.to_major_f64() / budget.limit.to_major_f64()
            };
            BudgetStatus {
                category: budget.category,
                limit: budget.limit,
                spent,
                remaining: budget.limit - spent,
                ratio,
                exceeded: spent > budget.limit,
            }
        })
        .collect()
}
