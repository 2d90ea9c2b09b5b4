//! Normalize command - print the canonical form of a query

use crate::{TagqError, config::EngineConfig, db::Database, engine::QueryEngine};

type Result<T> = std::result::Result<T, TagqError>;

/// Execute the normalize command
///
/// # Errors
/// Returns an error if an alias lookup fails.
pub fn execute(db: &Database, config: &EngineConfig, query: &str) -> Result<()> {
    let engine = QueryEngine::from_backend(db, config.clone());
    println!("{}", engine.normalize_query(query)?);
    Ok(())
}
