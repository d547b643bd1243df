//! Plain-text screens.

use chrono::TimeZone;
use engine::{Bucket, BudgetStatus, Category, CategoryTotals, Expense, FilterSpec, Money, Summary};

use crate::{config::AppConfig, state::Settings};

const BAR_WIDTH: usize = 24;
const ID_WIDTH: usize = 8;

fn amount(value: Money, currency: &str) -> String {
    format!("{currency} {value:>9}")
}

fn short_id(id: &str) -> &str {
    id.get(..ID_WIDTH).unwrap_or(id)
}

fn bar(value: Money, max: Money) -> String {
    if max.cents() <= 0 || value.cents() <= 0 {
        return String::new();
    }
    let filled = (value.cents() as f64 / max.cents() as f64 * BAR_WIDTH as f64).round() as usize;
    "#".repeat(filled.clamp(1, BAR_WIDTH))
}

fn title(name: &str) -> Vec<String> {
    vec![format!("== {name} =="), String::new()]
}

fn expense_line<Tz: TimeZone>(expense: &Expense, currency: &str, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}  {}  {:<18} {}  {}",
        short_id(&expense.id),
        expense.date.with_timezone(tz).format("%Y-%m-%d %H:%M"),
        expense.category.label(),
        amount(expense.amount, currency),
        expense.description
    )
}

fn series(name: &str, buckets: &[Bucket], currency: &str) -> Vec<String> {
    let max = buckets.iter().map(|bucket| bucket.total).max().unwrap_or(Money::ZERO);
    let mut lines = vec![format!("{name}:")];
    lines.extend(buckets.iter().map(|bucket| {
        format!(
            "  {:<9} {}  {}",
            bucket.label,
            amount(bucket.total, currency),
            bar(bucket.total, max)
        )
    }));
    lines
}

pub fn dashboard<Tz: TimeZone>(
    summary: &Summary,
    top: &[(Category, Money)],
    recent: &[&Expense],
    currency: &str,
    tz: &Tz,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut lines = title("Dashboard");
    lines.push(format!("Today       {}", amount(summary.today, currency)));
    lines.push(format!("This week   {}", amount(summary.this_week, currency)));
    lines.push(format!("This month  {}", amount(summary.this_month, currency)));
    lines.push(format!(
        "All time    {}  ({} expenses, avg {})",
        amount(summary.overall.sum, currency),
        summary.overall.count,
        summary.overall.avg
    ));

    if !top.is_empty() {
        lines.push(String::new());
        lines.push("Top categories:".to_string());
        let max = top.first().map(|(_, total)| *total).unwrap_or(Money::ZERO);
        for (category, total) in top {
            lines.push(format!(
                "  {:<18} {}  {}",
                category.label(),
                amount(*total, currency),
                bar(*total, max)
            ));
        }
    }

    lines.push(String::new());
    if recent.is_empty() {
        lines.push("No expenses yet. Try: add 12.50 food pizza".to_string());
    } else {
        lines.push("Recent:".to_string());
        lines.extend(recent.iter().map(|expense| format!("  {}", expense_line(expense, currency, tz))));
    }
    lines.join("\n")
}

pub fn expenses<Tz: TimeZone>(
    list: &[&Expense],
    filters: &FilterSpec,
    currency: &str,
    tz: &Tz,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut lines = title("Expenses");
    let sort = filters
        .sort
        .map(|sort| sort.to_string())
        .unwrap_or_else(|| "none".to_string());
    lines.push(format!(
        "search: {:?}  category: {}  range: {}  sort: {}",
        filters.search_query, filters.category, filters.date_range, sort
    ));
    lines.push(String::new());

    if list.is_empty() {
        lines.push("No matching expenses.".to_string());
    } else {
        lines.extend(list.iter().map(|expense| expense_line(expense, currency, tz)));
        let total: Money = list.iter().map(|expense| expense.amount).sum();
        lines.push(String::new());
        lines.push(format!("{} expenses, total {}", list.len(), amount(total, currency)));
    }
    lines.join("\n")
}

pub fn stats(
    totals: &CategoryTotals,
    months: &[Bucket],
    weeks: &[Bucket],
    days: &[Bucket],
    currency: &str,
) -> String {
    let mut lines = title("Statistics");
    let max = totals.values().copied().max().unwrap_or(Money::ZERO);
    lines.push("By category:".to_string());
    for (category, total) in totals {
        lines.push(format!(
            "  {:<18} {}  {}",
            category.label(),
            amount(*total, currency),
            bar(*total, max)
        ));
    }
    for (name, buckets) in [("Monthly", months), ("Weekly", weeks), ("Daily", days)] {
        lines.push(String::new());
        lines.extend(series(name, buckets, currency));
    }
    lines.join("\n")
}

pub fn budgets(statuses: &[BudgetStatus], currency: &str) -> String {
    let mut lines = title("Budgets (this month)");
    if statuses.is_empty() {
        lines.push("No budgets. Try: budget food 300".to_string());
        return lines.join("\n");
    }
    for status in statuses {
        let marker = if status.exceeded { "  OVER" } else { "" };
        lines.push(format!(
            "  {:<18} {} of {}  ({:>3.0}%)  left {}{marker}",
            status.category.label(),
            amount(status.spent, currency),
            amount(status.limit, currency),
            status.ratio * 100.0,
            amount(status.remaining, currency),
        ));
    }
    lines.join("\n")
}

pub fn settings(settings: &Settings, config: &AppConfig) -> String {
    let mut lines = title("Settings");
    lines.push(format!("currency          {}", settings.currency));
    lines.push(format!("default category  {}", settings.default_category));
    lines.push(format!("default range     {}", settings.default_range));
    lines.push(format!("timezone          {}", config.timezone));
    lines.push(format!("data directory    {}", config.data_dir.display()));
    lines.join("\n")
}

pub fn not_found(path: &str) -> String {
    format!("No view named {path:?}. Views: dashboard, expenses, stats, budgets, settings.")
}

pub fn help() -> String {
    [
        "Commands:",
        "  #<view>[?params] | go <view>     navigate (dashboard, expenses, stats, budgets, settings)",
        "  add <amount> [category] [text]   record an expense",
        "  rm <id-prefix>                   delete an expense",
        "  search <text>                    filter by description or category",
        "  category <name|all>              filter by category",
        "  range <all|today|week|month|last30|year>",
        "  sort <date|amount>-<asc|desc> | sort none",
        "  budget <category> <amount>       monthly limit, 0 removes it",
        "  currency <symbol>",
        "  help | quit",
    ]
    .join("\n")
}
