//! The query engine facade
//!
//! [`QueryEngine`] runs the full pipeline for one request: tokenize and parse,
//! rewrite aliases, enforce the tag limit, resolve references for the viewer,
//! and pick the ordering. The result is a [`CompiledQuery`] that a
//! [`Repository`] can scan.
//!
//! # Examples
//! ```
//! use tagq::catalog::Catalog;
//! use tagq::config::EngineConfig;
//! use tagq::engine::QueryEngine;
//! use tagq::model::{Post, ViewerContext};
//!
//! let mut catalog = Catalog::new();
//! catalog.insert_post(Post::builder(1).tag_string("aaa bbb").build());
//! catalog.insert_post(Post::builder(2).tag_string("aaa").build());
//!
//! let engine = QueryEngine::from_backend(&catalog, EngineConfig::default());
//! let ids = engine.search(Some("aaa -bbb"), &ViewerContext::anonymous()).unwrap();
//! assert_eq!(ids, vec![2]);
//! ```

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::config::EngineConfig;
use crate::model::{PostId, ViewerContext};
use crate::query::{
    AliasResolver, ClauseKind, Filter, OrderResolver, ParsedQuery, PermissionFilter, Predicate,
    QueryLimiter, SearchError, SortSpec, split_query,
};
use crate::repository::{Directory, Repository, SavedSearchIndex};

/// Everything needed to run one query; built per request and discarded after use
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub predicate: Predicate,
    pub sort: SortSpec,
    /// Value of the last well-formed `limit:` clause
    pub limit: Option<u32>,
    /// Clauses counted against the tag limit
    pub counted: usize,
}

pub struct QueryEngine<'a> {
    repository: &'a dyn Repository,
    directory: &'a dyn Directory,
    saved_searches: &'a dyn SavedSearchIndex,
    config: EngineConfig,
}

impl<'a> QueryEngine<'a> {
    #[must_use]
    pub fn new(
        repository: &'a dyn Repository,
        directory: &'a dyn Directory,
        saved_searches: &'a dyn SavedSearchIndex,
        config: EngineConfig,
    ) -> Self {
        Self {
            repository,
            directory,
            saved_searches,
            config,
        }
    }

    /// Use one backend for all three collaborator roles
    #[must_use]
    pub fn from_backend<B>(backend: &'a B, config: EngineConfig) -> Self
    where
        B: Repository + Directory + SavedSearchIndex,
    {
        Self::new(backend, backend, backend, config)
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse and alias a query without checking limits or resolving references
    ///
    /// # Errors
    /// Returns `SearchError::DatabaseError` if an alias lookup fails.
    pub fn parse(&self, raw: &str) -> Result<ParsedQuery, SearchError> {
        let mut query = ParsedQuery::parse(raw);
        AliasResolver::new(self.repository).apply(&mut query)?;
        Ok(query)
    }

    /// Compile a query for `viewer` at the current time
    ///
    /// An absent or blank query matches every visible post.
    ///
    /// # Errors
    /// Returns `SearchError::TagLimitExceeded` when the query has too many
    /// counted clauses, or `SearchError::DatabaseError` if a collaborator fails.
    pub fn evaluate(
        &self,
        raw: Option<&str>,
        viewer: &ViewerContext,
    ) -> Result<CompiledQuery, SearchError> {
        self.evaluate_at(raw, viewer, Utc::now())
    }

    /// Compile a query with an explicit notion of "now" for `age:` and `order:rank`
    ///
    /// # Errors
    /// See [`QueryEngine::evaluate`].
    pub fn evaluate_at(
        &self,
        raw: Option<&str>,
        viewer: &ViewerContext,
        now: DateTime<Utc>,
    ) -> Result<CompiledQuery, SearchError> {
        let query = self.parse(raw.unwrap_or_default())?;
        log::debug!("parsed {} clauses", query.len());

        let counted = QueryLimiter::from_config(&self.config).check(&query)?;
        log::debug!("{counted} counted clauses");

        let resolution =
            PermissionFilter::new(self.directory, self.saved_searches, viewer, now).apply(&query)?;
        let order = OrderResolver::new(now).resolve(&query, resolution.ordering);

        let predicate = match order.filter {
            Some(filter) => Predicate::all([resolution.predicate, filter]),
            None => resolution.predicate,
        };

        Ok(CompiledQuery {
            predicate,
            sort: order.sort,
            limit: last_limit(&query),
            counted,
        })
    }

    /// Run a query and return matching ids in order
    ///
    /// A `limit:` clause truncates the result, clamped to the configured maximum.
    ///
    /// # Errors
    /// See [`QueryEngine::evaluate`].
    pub fn search(
        &self,
        raw: Option<&str>,
        viewer: &ViewerContext,
    ) -> Result<Vec<PostId>, SearchError> {
        self.search_at(raw, viewer, Utc::now())
    }

    /// [`QueryEngine::search`] with an explicit "now"
    ///
    /// # Errors
    /// See [`QueryEngine::evaluate`].
    pub fn search_at(
        &self,
        raw: Option<&str>,
        viewer: &ViewerContext,
        now: DateTime<Utc>,
    ) -> Result<Vec<PostId>, SearchError> {
        let compiled = self.evaluate_at(raw, viewer, now)?;
        let mut ids = self.repository.scan(&compiled.predicate, &compiled.sort)?;
        if let Some(limit) = compiled.limit {
            ids.truncate(self.config.page_size(Some(limit)) as usize);
        }
        log::debug!("{} matching posts", ids.len());
        Ok(ids)
    }

    /// First page of results: at most `limit:` ids, or `default_limit` without one
    ///
    /// # Errors
    /// See [`QueryEngine::evaluate`].
    pub fn page(
        &self,
        raw: Option<&str>,
        viewer: &ViewerContext,
    ) -> Result<Vec<PostId>, SearchError> {
        self.page_at(raw, viewer, Utc::now())
    }

    /// [`QueryEngine::page`] with an explicit "now"
    ///
    /// # Errors
    /// See [`QueryEngine::evaluate`].
    pub fn page_at(
        &self,
        raw: Option<&str>,
        viewer: &ViewerContext,
        now: DateTime<Utc>,
    ) -> Result<Vec<PostId>, SearchError> {
        let compiled = self.evaluate_at(raw, viewer, now)?;
        let mut ids = self.repository.scan(&compiled.predicate, &compiled.sort)?;
        let size = self.config.page_size(compiled.limit);
        log::debug!("{} matching posts, page size {size}", ids.len());
        ids.truncate(size as usize);
        Ok(ids)
    }

    /// Canonical form of a query: lowercased, aliased, deduplicated and sorted
    ///
    /// # Errors
    /// Returns `SearchError::DatabaseError` if an alias lookup fails.
    pub fn normalize_query(&self, raw: &str) -> Result<String, SearchError> {
        let terms = split_query(raw);
        let mut query = ParsedQuery::from_terms(&terms);
        AliasResolver::new(self.repository).apply(&mut query)?;

        let normalized: BTreeSet<String> = terms
            .iter()
            .zip(query.clauses())
            .map(|(term, clause)| match &clause.kind {
                ClauseKind::Tag(name) => format!("{}{name}", clause.polarity.prefix()),
                _ => term.to_query_string(),
            })
            .collect();

        Ok(normalized.into_iter().collect::<Vec<_>>().join(" "))
    }
}

fn last_limit(query: &ParsedQuery) -> Option<u32> {
    query
        .metatags("limit")
        .filter_map(|(_, filter)| match filter {
            Filter::Limit(limit) => *limit,
            _ => None,
        })
        .last()
}
