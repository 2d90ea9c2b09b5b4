//! The query language
//!
//! A raw query goes through these stages, leaves first:
//!
//! 1. [`tokenizer`] splits it into prefixed terms.
//! 2. [`parser`] classifies each term as a tag, wildcard or metatag, using the
//!    [`metatags`] registry to build typed [`Filter`]s.
//! 3. [`alias`] rewrites literal tags through the repository's alias map.
//! 4. [`limit`] rejects queries with too many counted clauses.
//! 5. [`permission`] resolves references for the viewer and produces the final
//!    [`Predicate`].
//! 6. [`order`] picks the [`SortSpec`].
//!
//! [`crate::engine::QueryEngine`] runs the whole pipeline.

pub mod alias;
pub mod error;
pub mod limit;
pub mod metatags;
pub mod order;
pub mod parser;
pub mod permission;
pub mod pixiv;
pub mod predicate;
pub mod tokenizer;
pub mod types;
pub mod wildcard;

pub use alias::AliasResolver;
pub use error::{ParseError, SearchError};
pub use limit::QueryLimiter;
pub use order::{Direction, OrderResolver, ResolvedOrder, SortField, SortSpec};
pub use parser::{Clause, ClauseKind, ParsedQuery, Polarity};
pub use permission::{PermissionFilter, Resolution};
pub use predicate::Predicate;
pub use tokenizer::{Prefix, Term, split_query};
pub use types::{Filter, RangeCondition};
pub use wildcard::TagPattern;
