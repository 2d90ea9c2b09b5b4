//! Turns tokenized terms into a [`ParsedQuery`]

use super::metatags::{self, MetatagValue};
use super::tokenizer::{Prefix, Term, split_query};
use super::types::Filter;
use super::wildcard::{TagPattern, is_wildcard};

/// How a clause participates in the query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Plain term; must match
    Required,
    /// `-term`; must not match
    Excluded,
    /// `~term`; at least one optional clause must match
    Optional,
}

impl From<Prefix> for Polarity {
    fn from(prefix: Prefix) -> Self {
        match prefix {
            Prefix::None => Self::Required,
            Prefix::Exclude => Self::Excluded,
            Prefix::Optional => Self::Optional,
        }
    }
}

impl Polarity {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Required => "",
            Self::Excluded => "-",
            Self::Optional => "~",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClauseKind {
    Tag(String),
    Wildcard(TagPattern),
    Metatag {
        /// Canonical registry name
        name: &'static str,
        filter: Filter,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub polarity: Polarity,
    pub kind: ClauseKind,
}

impl Clause {
    #[must_use]
    pub const fn new(polarity: Polarity, kind: ClauseKind) -> Self {
        Self { polarity, kind }
    }

    #[must_use]
    pub fn metatag_name(&self) -> Option<&'static str> {
        match self.kind {
            ClauseKind::Metatag { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Classify one term as metatag, wildcard or literal tag
    #[must_use]
    pub fn from_term(term: &Term) -> Self {
        let polarity = Polarity::from(term.prefix);

        if let Some((name, value)) = term.body.split_once(':')
            && !value.is_empty()
            && let Some(spec) = metatags::lookup(name)
        {
            let filter = spec.build(MetatagValue {
                raw: value,
                quoted: term.quoted,
            });
            return Self::new(
                polarity,
                ClauseKind::Metatag {
                    name: spec.name(),
                    filter,
                },
            );
        }

        if is_wildcard(&term.body) {
            match TagPattern::new(&term.body) {
                Ok(pattern) => return Self::new(polarity, ClauseKind::Wildcard(pattern)),
                Err(e) => log::debug!("treating {:?} as a literal tag: {e}", term.body),
            }
        }

        Self::new(polarity, ClauseKind::Tag(term.body.clone()))
    }
}

impl std::fmt::Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = self.polarity.prefix();
        match &self.kind {
            ClauseKind::Tag(name) => write!(f, "{prefix}{name}"),
            ClauseKind::Wildcard(pattern) => write!(f, "{prefix}{pattern} (wildcard)"),
            ClauseKind::Metatag { name, filter } => write!(f, "{prefix}{name}: {filter:?}"),
        }
    }
}

/// An ordered list of clauses parsed from one query string
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedQuery {
    clauses: Vec<Clause>,
}

impl ParsedQuery {
    /// Tokenize and classify a raw query; never fails
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self::from_terms(&split_query(raw))
    }

    #[must_use]
    pub fn from_terms(terms: &[Term]) -> Self {
        Self {
            clauses: terms.iter().map(Clause::from_term).collect(),
        }
    }

    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn clauses_mut(&mut self) -> &mut [Clause] {
        &mut self.clauses
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// One tag or wildcard clause of any polarity and nothing else
    #[must_use]
    pub fn is_single_tag(&self) -> bool {
        matches!(
            self.clauses.as_slice(),
            [Clause {
                kind: ClauseKind::Tag(_) | ClauseKind::Wildcard(_),
                ..
            }]
        )
    }

    /// Exactly one required literal tag
    #[must_use]
    pub fn is_simple_tag(&self) -> bool {
        matches!(
            self.clauses.as_slice(),
            [Clause {
                polarity: Polarity::Required,
                kind: ClauseKind::Tag(_),
            }]
        )
    }

    /// Whether a metatag with this canonical name appears with any polarity
    #[must_use]
    pub fn has_metatag(&self, name: &str) -> bool {
        self.clauses.iter().any(|c| c.metatag_name() == Some(name))
    }

    /// Filters of every metatag clause with this canonical name, in query order
    pub fn metatags<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = (Polarity, &'a Filter)> + 'a {
        self.clauses.iter().filter_map(move |clause| match &clause.kind {
            ClauseKind::Metatag { name: n, filter } if *n == name => {
                Some((clause.polarity, filter))
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::types::RangeCondition;

    #[test]
    fn test_classifies_terms() {
        let query = ParsedQuery::parse("aaa -b* ~id:5 fate/stay_night");
        let clauses = query.clauses();
        assert_eq!(clauses.len(), 4);
        assert_eq!(clauses[0].kind, ClauseKind::Tag("aaa".to_string()));
        assert_eq!(clauses[1].polarity, Polarity::Excluded);
        assert!(matches!(clauses[1].kind, ClauseKind::Wildcard(_)));
        assert_eq!(clauses[2].polarity, Polarity::Optional);
        assert_eq!(
            clauses[2].kind,
            ClauseKind::Metatag {
                name: "id",
                filter: Filter::Id(RangeCondition::Equals(5))
            }
        );
        assert_eq!(clauses[3].kind, ClauseKind::Tag("fate/stay_night".to_string()));
    }

    #[test]
    fn test_unknown_metatag_is_literal() {
        let query = ParsedQuery::parse("re:zero");
        assert_eq!(query.clauses()[0].kind, ClauseKind::Tag("re:zero".to_string()));
    }

    #[test]
    fn test_empty_metatag_value_is_literal() {
        let query = ParsedQuery::parse("status:");
        assert_eq!(query.clauses()[0].kind, ClauseKind::Tag("status:".to_string()));
    }

    #[test]
    fn test_question_mark_tag_is_literal() {
        let query = ParsedQuery::parse("?");
        assert_eq!(query.clauses()[0].kind, ClauseKind::Tag("?".to_string()));
    }

    #[test]
    fn test_metatag_name_case_insensitive() {
        let query = ParsedQuery::parse("STATUS:Pending");
        assert_eq!(query.clauses()[0].metatag_name(), Some("status"));
    }

    #[test]
    fn test_is_single_tag() {
        assert!(ParsedQuery::parse("aaa").is_single_tag());
        assert!(ParsedQuery::parse("-aaa").is_single_tag());
        assert!(ParsedQuery::parse("aaa*").is_single_tag());
        assert!(!ParsedQuery::parse("aaa bbb").is_single_tag());
        assert!(!ParsedQuery::parse("id:5").is_single_tag());
        assert!(!ParsedQuery::parse("").is_single_tag());
    }

    #[test]
    fn test_is_simple_tag() {
        assert!(ParsedQuery::parse("aaa").is_simple_tag());
        assert!(!ParsedQuery::parse("-aaa").is_simple_tag());
        assert!(!ParsedQuery::parse("~aaa").is_simple_tag());
        assert!(!ParsedQuery::parse("aaa*").is_simple_tag());
        assert!(!ParsedQuery::parse("fav:a").is_simple_tag());
    }

    #[test]
    fn test_has_metatag_any_polarity() {
        assert!(ParsedQuery::parse("-status:deleted").has_metatag("status"));
        assert!(ParsedQuery::parse("~status:active").has_metatag("status"));
        assert!(!ParsedQuery::parse("status_tag").has_metatag("status"));
    }
}
