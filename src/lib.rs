//! Tagq - a tag query engine for image-board style post collections
//!
//! This library compiles search strings such as `cat_ears -dog rating:s order:score`
//! into a predicate and an ordering over posts, resolving aliases, user and pool
//! references and viewer permissions along the way. Posts can be held in an
//! in-memory [`catalog::Catalog`] or an embedded sled [`db::Database`].

use thiserror::Error;

pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod engine;
pub mod model;
pub mod output;
pub mod query;
pub mod repository;
pub mod scan;

#[cfg(test)]
pub mod testing;

/// Error enum, contains all failure states of the program
#[derive(Debug, Error)]
pub enum TagqError {
    /// Database error
    #[error("Database error: {0}")]
    DbError(#[from] db::DbError),
    /// Search error
    #[error("Search error: {0}")]
    SearchError(#[from] query::SearchError),
    /// Represents a configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ::config::ConfigError),
    /// Represents an I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
