//! Rewrites literal tags through the repository's alias map

use std::collections::HashMap;

use super::parser::{ClauseKind, ParsedQuery};
use crate::db::DbError;
use crate::repository::Repository;

/// Replaces each literal tag clause with its alias consequent, once
///
/// Wildcards and metatags are left alone, and consequents are not looked up
/// again, so chains are never followed.
pub struct AliasResolver<'a> {
    repository: &'a dyn Repository,
}

impl<'a> AliasResolver<'a> {
    #[must_use]
    pub fn new(repository: &'a dyn Repository) -> Self {
        Self { repository }
    }

    /// Rewrite `query` in place and return how many clauses changed
    ///
    /// # Errors
    /// Returns the repository's `DbError` if an alias lookup fails.
    pub fn apply(&self, query: &mut ParsedQuery) -> Result<usize, DbError> {
        let mut seen: HashMap<String, Option<String>> = HashMap::new();
        let mut rewritten = 0;

        for clause in query.clauses_mut() {
            let ClauseKind::Tag(name) = &mut clause.kind else {
                continue;
            };

            let consequent = match seen.get(name.as_str()) {
                Some(cached) => cached.clone(),
                None => {
                    let found = self.repository.resolve_alias(&name.to_lowercase())?;
                    seen.insert(name.clone(), found.clone());
                    found
                }
            };

            if let Some(consequent) = consequent
                && consequent != *name
            {
                log::trace!("alias {name} -> {consequent}");
                *name = consequent;
                rewritten += 1;
            }
        }

        Ok(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn test_rewrites_all_polarities() {
        let mut catalog = Catalog::new();
        catalog.add_alias("gray_hair", "grey_hair");
        let mut query = ParsedQuery::parse("gray_hair -gray_hair ~gray_hair");

        let rewritten = AliasResolver::new(&catalog).apply(&mut query).unwrap();

        assert_eq!(rewritten, 3);
        for clause in query.clauses() {
            assert_eq!(clause.kind, ClauseKind::Tag("grey_hair".to_string()));
        }
    }

    #[test]
    fn test_does_not_chain() {
        let mut catalog = Catalog::new();
        catalog.add_alias("a", "b");
        catalog.add_alias("b", "c");
        let mut query = ParsedQuery::parse("a");

        AliasResolver::new(&catalog).apply(&mut query).unwrap();

        assert_eq!(query.clauses()[0].kind, ClauseKind::Tag("b".to_string()));
    }

    #[test]
    fn test_skips_wildcards_and_metatags() {
        let mut catalog = Catalog::new();
        catalog.add_alias("a*", "b");
        catalog.add_alias("id:1", "b");
        let mut query = ParsedQuery::parse("a* id:1");

        let rewritten = AliasResolver::new(&catalog).apply(&mut query).unwrap();

        assert_eq!(rewritten, 0);
        assert!(matches!(query.clauses()[0].kind, ClauseKind::Wildcard(_)));
    }
}
