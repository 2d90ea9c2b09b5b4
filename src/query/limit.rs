//! Enforces the maximum number of counted clauses per query

use std::collections::BTreeSet;

use super::error::SearchError;
use super::parser::{Clause, ParsedQuery};
use crate::config::EngineConfig;

/// Counts clauses and rejects queries above the limit
///
/// Every clause counts, whatever its polarity, except metatags named in the
/// exemption set.
#[derive(Debug, Clone)]
pub struct QueryLimiter {
    limit: usize,
    untallied: BTreeSet<String>,
}

impl QueryLimiter {
    #[must_use]
    pub fn new(limit: usize, untallied: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            limit,
            untallied: untallied.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.tag_query_limit, config.untallied_metatags.iter().cloned())
    }

    #[must_use]
    pub fn is_counted(&self, clause: &Clause) -> bool {
        clause
            .metatag_name()
            .is_none_or(|name| !self.untallied.contains(name))
    }

    #[must_use]
    pub fn count(&self, query: &ParsedQuery) -> usize {
        query.clauses().iter().filter(|c| self.is_counted(c)).count()
    }

    /// Return the counted total, or fail when it exceeds the limit
    ///
    /// # Errors
    /// Returns `SearchError::TagLimitExceeded` above the limit.
    pub fn check(&self, query: &ParsedQuery) -> Result<usize, SearchError> {
        let count = self.count(query);
        if count > self.limit {
            return Err(SearchError::TagLimitExceeded {
                count,
                limit: self.limit,
            });
        }
        Ok(count)
    }
}

impl Default for QueryLimiter {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_every_polarity() {
        let limiter = QueryLimiter::default();
        assert_eq!(limiter.count(&ParsedQuery::parse("a -b ~c d*")), 4);
    }

    #[test]
    fn test_exempt_metatags_not_counted() {
        let limiter = QueryLimiter::default();
        let query = ParsedQuery::parse("a b c d e f rating:s -status:deleted limit:10");
        assert_eq!(limiter.check(&query).unwrap(), 6);
    }

    #[test]
    fn test_seven_clauses_rejected() {
        let limiter = QueryLimiter::default();
        let query = ParsedQuery::parse("a b c d e f id:1");
        assert!(matches!(
            limiter.check(&query),
            Err(SearchError::TagLimitExceeded { count: 7, limit: 6 })
        ));
    }

    #[test]
    fn test_negated_only_query_is_valid() {
        let limiter = QueryLimiter::default();
        assert_eq!(limiter.check(&ParsedQuery::parse("-a -b")).unwrap(), 2);
    }

    #[test]
    fn test_custom_exemptions() {
        let limiter = QueryLimiter::new(1, ["order"]);
        assert!(limiter.check(&ParsedQuery::parse("a order:score")).is_ok());
        assert!(limiter.check(&ParsedQuery::parse("a rating:s")).is_err());
    }
}
