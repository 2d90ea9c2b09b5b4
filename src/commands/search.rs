//! Search command - run a query and print the first page of matching posts

use crate::{
    TagqError,
    config::EngineConfig,
    db::Database,
    engine::QueryEngine,
    model::ViewerContext,
    output,
    repository::Directory,
};

type Result<T> = std::result::Result<T, TagqError>;

/// Execute the search command
///
/// # Errors
/// Returns `TagqError::InvalidInput` if `user` does not exist, or an error if
/// the query exceeds the tag limit or the database fails.
pub fn execute(
    db: &Database,
    config: &EngineConfig,
    query: &str,
    user: Option<&str>,
    hide_deleted: bool,
    quiet: bool,
) -> Result<()> {
    let viewer = viewer_for(db, user)?.with_hide_deleted(hide_deleted);
    let engine = QueryEngine::from_backend(db, config.clone());
    let ids = engine.page(Some(query), &viewer)?;

    if !quiet {
        println!("{}", output::result_summary(ids.len(), query));
    }

    for id in ids {
        match db.get_post(id)? {
            Some(post) => println!("{}", output::post_line(&post, quiet)),
            None => println!("{}", output::post_id(id, quiet)),
        }
    }
    Ok(())
}

/// Anonymous viewer, or the named user
///
/// # Errors
/// Returns `TagqError::InvalidInput` if the user is unknown.
pub fn viewer_for(db: &Database, user: Option<&str>) -> Result<ViewerContext> {
    let Some(name) = user else {
        return Ok(ViewerContext::anonymous());
    };
    let user = db
        .resolve_user(name)?
        .ok_or_else(|| TagqError::InvalidInput(format!("Unknown user '{name}'")))?;
    Ok(ViewerContext::for_user(user))
}
