//! Query and aggregation engine over an in-memory set of expenses.
//!
//! Everything here is a pure function of its inputs: the record slice, a
//! [`FilterSpec`] and an explicit "now" whose time zone defines the local
//! calendar. Nothing is cached between calls, so the same inputs always give
//! the same output.
//!
//! - [`apply_filter`]: search, category and date-range filtering followed by
//!   a stable sort.
//! - [`aggregate_by_category`] / [`top_categories`]: per-category totals.
//! - [`bucket_by_day`], [`bucket_by_week`], [`bucket_by_month`]: spending
//!   series aligned on local calendar boundaries.
//! - [`statistics`] / [`summarize`]: sum, average, min and max.
//! - [`budget_status`]: monthly budgets against actual spending.
pub use aggregate::{
    Bucket, CategoryTotals, aggregate_by_category, bucket_by_day, bucket_by_month, bucket_by_week,
    top_categories,
};
pub use budget::{Budget, BudgetStatus, budget_status};
pub use category::Category;
pub use error::EngineError;
pub use expense::Expense;
pub use filter::{
    CategoryFilter, DateRange, FilterSpec, SortDirection, SortKey, SortSpec, apply_filter,
};
pub use money::Money;
pub use stats::{Statistics, Summary, statistics, summarize};

mod aggregate;
mod budget;
mod calendar;
mod category;
mod error;
mod expense;
mod filter;
mod money;
mod stats;

pub type ResultEngine<T> = Result<T, EngineError>;
