//! Testing utilities for tagq
//!
//! This module provides helper types and functions for writing tests,
//! including a `TestDb` wrapper for temporary database management.
//!
//! Only available when compiled with `cfg(test)`.

use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;
use tempfile::TempDir;

use crate::catalog::Catalog;
use crate::db::Database;
use crate::model::Post;

/// Wrapper for a temporary test database that cleans up on drop
///
/// The database lives in its own temporary directory, which is removed when
/// the wrapper goes out of scope.
pub struct TestDb {
    db: Database,
    dir: TempDir,
}

impl TestDb {
    /// Create an empty database in a fresh temporary directory
    ///
    /// # Panics
    /// Panics if the directory or the database cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open(dir.path().join("db")).expect("Failed to open test database");
        Self { db, dir }
    }

    /// Get a reference to the underlying database
    #[must_use]
    pub const fn db(&self) -> &Database {
        &self.db
    }

    /// Get the temporary directory holding the database
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for TestDb {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed evaluation time used by tests that depend on post age
///
/// # Panics
/// Never; the date is valid.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Catalog holding `posts`, created in order
#[must_use]
pub fn catalog_with(posts: impl IntoIterator<Item = Post>) -> Catalog {
    let mut catalog = Catalog::new();
    for post in posts {
        catalog.insert_post(post);
    }
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_is_isolated() {
        let first = TestDb::new();
        let second = TestDb::new();
        first
            .db()
            .insert_post(&Post::builder(1).tag_string("aaa").build())
            .unwrap();
        assert_eq!(first.db().count(), 1);
        assert_eq!(second.db().count(), 0);
        assert_ne!(first.path(), second.path());
    }

    #[test]
    fn test_catalog_with() {
        let catalog = catalog_with([Post::builder(1).build(), Post::builder(2).build()]);
        assert_eq!(catalog.len(), 2);
    }
}
