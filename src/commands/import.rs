//! Import command - load a JSON catalog into the database

use crate::{TagqError, catalog::Catalog, db::Database, output};
use std::path::Path;

type Result<T> = std::result::Result<T, TagqError>;

/// Execute the import command
///
/// Posts, users, pools, favorite groups, aliases and saved searches already
/// present with the same key are replaced.
///
/// # Errors
/// Returns an error if the catalog cannot be read or parsed, or if writing to
/// the database fails.
pub fn execute(db: &Database, file: &Path, quiet: bool) -> Result<()> {
    let catalog = Catalog::load(file)?;
    let imported = db.import(&catalog)?;
    db.flush()?;

    if !quiet {
        println!(
            "{}",
            output::success(&format!(
                "Imported {imported} post(s) from {} ({} total)",
                file.display(),
                db.count()
            ))
        );
    }
    Ok(())
}
