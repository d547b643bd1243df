//! The module contains the errors the query engine can throw.
//!
//! The pure query functions never fail: errors only come out of parsing
//! user-facing values (amounts, date ranges, sort keys, category filters).
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),
    #[error("Invalid sort: {0}")]
    InvalidSort(String),
    #[error("Invalid category: {0}")]
    InvalidCategory(String),
}
