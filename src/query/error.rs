//! Query-specific error types
//!
//! Two layers of failure exist in the query pipeline:
//!
//! - **`ParseError`**: a metatag value that does not fit its grammar. These never
//!   escape the parser; the clause degrades to a filter that matches nothing.
//! - **`SearchError`**: failures surfaced to callers of the engine, either the
//!   tag limit being exceeded or a collaborator failing.

use crate::db::DbError;
use thiserror::Error;

/// Errors produced while parsing metatag values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Invalid range: {0}")]
    InvalidRange(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),
    #[error("Invalid size: {0}")]
    InvalidSize(String),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Search-specific errors
#[derive(Debug, Error)]
pub enum SearchError {
    /// More counted clauses than the configured maximum
    #[error("You cannot search for more than {limit} tags at a time ({count} given)")]
    TagLimitExceeded { count: usize, limit: usize },

    /// A collaborator failed while resolving or scanning
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbError),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
