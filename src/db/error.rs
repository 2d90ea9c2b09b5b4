//! Database-specific error types
//!
//! This module defines all error types that can occur while storing or reading
//! posts and the records queries reference.
//!
//! # Error Types
//!
//! - **`SledError`**: Errors from the underlying sled embedded database
//! - **`DecodeError`** / **`EncodeError`**: bincode failures on stored values
//! - **`JsonError`**: A catalog document that is not valid JSON
//! - **`SerializeError`**: Other conversion failures (e.g., invalid UTF-8 keys)
//!
//! All errors implement `std::error::Error` via the `thiserror` crate.

use thiserror::Error;

/// Database-specific errors
#[derive(Debug, Error)]
pub enum DbError {
    /// Represents a sled database error
    #[error("Database error: {0}")]
    SledError(#[from] sled::Error),

    /// Represents a bincode decoding error
    #[error("Error while decoding data: {0}")]
    DecodeError(#[from] bincode::error::DecodeError),

    /// Represents a bincode encoding error
    #[error("Error while encoding data: {0}")]
    EncodeError(#[from] bincode::error::EncodeError),

    /// Catalog JSON could not be parsed or written
    #[error("Invalid catalog: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Reading a catalog file failed
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic serialization/deserialization error
    #[error("Error during serialization: {0}")]
    SerializeError(String),

    /// File does not exist on the filesystem
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// A referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
