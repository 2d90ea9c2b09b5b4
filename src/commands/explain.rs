//! Explain command - show how a query is interpreted

use crate::{
    TagqError,
    config::EngineConfig,
    db::Database,
    engine::QueryEngine,
    model::ViewerContext,
    output,
    query::split_query,
};

type Result<T> = std::result::Result<T, TagqError>;

/// Execute the explain command
///
/// Prints the tokens, the clauses after alias rewriting, the number of
/// counted clauses and the resolved ordering, as seen by an anonymous viewer.
///
/// # Errors
/// Returns an error if the query exceeds the tag limit or the database fails.
pub fn execute(db: &Database, config: &EngineConfig, query: &str, quiet: bool) -> Result<()> {
    let engine = QueryEngine::from_backend(db, config.clone());
    let parsed = engine.parse(query)?;
    let compiled = engine.evaluate(Some(query), &ViewerContext::anonymous())?;

    if quiet {
        println!("{}", compiled.sort);
        return Ok(());
    }

    println!("{}", output::heading("Tokens:"));
    for term in split_query(query) {
        println!("{}", output::term(&term));
    }

    println!("{}", output::heading("Clauses:"));
    for clause in parsed.clauses() {
        println!("{}", output::clause(clause));
    }

    println!(
        "{} {} of {}",
        output::heading("Counted:"),
        compiled.counted,
        config.tag_query_limit
    );
    println!("{} {}", output::heading("Order:"), compiled.sort);
    println!("{} {}", output::heading("Page size:"), config.page_size(compiled.limit));
    Ok(())
}
