//! Binds a parsed query to the viewer and produces the final predicate
//!
//! Named references (users, pools, favorite groups, saved searches) are
//! resolved through the collaborators and checked against what the viewer may
//! see. Anything that cannot be resolved, or is not visible, becomes
//! [`Predicate::False`], so its negation matches everything.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use super::order::{Direction, SortField, SortSpec};
use super::parser::{Clause, ClauseKind, ParsedQuery, Polarity};
use super::predicate::{DisapprovalMatch, Predicate, RelationTarget};
use super::types::{DisapprovalTarget, Filter, PoolTarget, Presence, StatusFilter, UserTarget};
use crate::db::DbError;
use crate::model::{PoolRef, UserRef, ViewerContext};
use crate::repository::{Directory, SavedSearchIndex};

/// The predicate of a query plus any ordering a reference metatag asked for
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub predicate: Predicate,
    /// Set by `ordfav:` or `ordpool:`; the last one in the query wins
    pub ordering: Option<SortSpec>,
}

pub struct PermissionFilter<'a> {
    directory: &'a dyn Directory,
    saved_searches: &'a dyn SavedSearchIndex,
    viewer: &'a ViewerContext,
    now: DateTime<Utc>,
}

impl<'a> PermissionFilter<'a> {
    #[must_use]
    pub fn new(
        directory: &'a dyn Directory,
        saved_searches: &'a dyn SavedSearchIndex,
        viewer: &'a ViewerContext,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            directory,
            saved_searches,
            viewer,
            now,
        }
    }

    /// Combine every clause by polarity and add the implicit deleted filter
    ///
    /// Required clauses are ANDed, excluded clauses are negated and ANDed, and
    /// all optional clauses form a single OR group. When the viewer hides
    /// deleted posts and no `status:` clause appears with any polarity,
    /// deleted posts are excluded.
    ///
    /// # Errors
    /// Returns a `DbError` if a collaborator lookup fails.
    pub fn apply(&self, query: &ParsedQuery) -> Result<Resolution, DbError> {
        let mut required = Vec::new();
        let mut optional = Vec::new();
        let mut ordering = None;

        for clause in query.clauses() {
            let Some(predicate) = self.resolve_clause(clause, &mut ordering)? else {
                continue;
            };
            log::trace!("{clause} => {predicate:?}");
            match clause.polarity {
                Polarity::Required => required.push(predicate),
                Polarity::Excluded => required.push(predicate.negate()),
                Polarity::Optional => optional.push(predicate),
            }
        }

        if !optional.is_empty() {
            required.push(Predicate::any(optional));
        }

        if self.viewer.hide_deleted_posts && !query.has_metatag("status") {
            log::trace!("hiding deleted posts");
            required.push(Predicate::Status(StatusFilter::Deleted).negate());
        }

        Ok(Resolution {
            predicate: Predicate::all(required),
            ordering,
        })
    }

    /// `None` for clauses that only configure the request (`order:`, `limit:`)
    fn resolve_clause(
        &self,
        clause: &Clause,
        ordering: &mut Option<SortSpec>,
    ) -> Result<Option<Predicate>, DbError> {
        match &clause.kind {
            ClauseKind::Tag(name) => Ok(Some(Predicate::Tag(name.clone()))),
            ClauseKind::Wildcard(pattern) => Ok(Some(Predicate::Wildcard(pattern.clone()))),
            ClauseKind::Metatag { filter, .. } => {
                let orders = clause.polarity != Polarity::Excluded;
                self.resolve_filter(filter, orders, ordering)
            }
        }
    }

    fn resolve_filter(
        &self,
        filter: &Filter,
        orders: bool,
        ordering: &mut Option<SortSpec>,
    ) -> Result<Option<Predicate>, DbError> {
        let predicate = match filter {
            Filter::Order(_) | Filter::Limit(_) => return Ok(None),
            Filter::Invalid(_) => Predicate::False,
            Filter::Id(range) => Predicate::Id(range.clone()),
            Filter::Age(range) => Predicate::Age {
                seconds: range.clone(),
                now: self.now,
            },
            Filter::Date(range) => Predicate::Date {
                range: range.clone(),
                offset: self.viewer.time_zone,
            },
            Filter::Favorites(name) => match self.visible_favorites_owner(name)? {
                Some(user) => Predicate::FavoritedBy(user.id),
                None => Predicate::False,
            },
            Filter::OrderedFavorites(name) => match self.visible_favorites_owner(name)? {
                Some(user) => {
                    if orders {
                        *ordering = Some(SortSpec::new(
                            SortField::FavoritedAt(user.id),
                            Direction::Desc,
                        ));
                    }
                    Predicate::FavoritedBy(user.id)
                }
                None => Predicate::False,
            },
            Filter::Pool(target) => self.pool_predicate(target)?,
            Filter::OrderedPool(target) => self.ordered_pool_predicate(target, orders, ordering)?,
            Filter::Parent(target) => Predicate::Parent(target.clone()),
            Filter::Child(Presence::Any) => Predicate::HasChildren,
            Filter::Child(Presence::None) => Predicate::HasChildren.negate(),
            Filter::FavGroup(id_or_name) => {
                match self.directory.resolve_favgroup(id_or_name, self.viewer)? {
                    Some(group) => Predicate::InSet(group.post_ids.iter().copied().collect()),
                    None => unresolved("favgroup", id_or_name),
                }
            }
            Filter::Relation(kind, target) => match target {
                UserTarget::Any => Predicate::Relation(*kind, RelationTarget::Any),
                UserTarget::None => Predicate::Relation(*kind, RelationTarget::Any).negate(),
                UserTarget::Named(name) => match self.directory.resolve_user(name)? {
                    Some(user) => Predicate::Relation(*kind, RelationTarget::User(user.id)),
                    None => unresolved("user", name),
                },
            },
            Filter::NoteCount(scope, range) => Predicate::NoteCount(*scope, range.clone()),
            Filter::Commentary(commentary) => Predicate::Commentary(commentary.clone()),
            Filter::Ratio(range) => Predicate::Ratio(range.clone()),
            Filter::Status(StatusFilter::Any) => Predicate::True,
            Filter::Status(status) => Predicate::Status(*status),
            Filter::FileType(exts) => Predicate::FileType(exts.clone()),
            Filter::Embedded(flag) => Predicate::Embedded(*flag),
            Filter::TagCount(category, range) => Predicate::TagCount(*category, range.clone()),
            Filter::Md5(hashes) => Predicate::Md5(hashes.clone()),
            Filter::Source(source) => Predicate::Source(source.clone()),
            Filter::PixivId(pixiv) => Predicate::PixivId(*pixiv),
            Filter::SavedSearch(label) => match self.saved_searches.lookup(label, self.viewer)? {
                Some(ids) => Predicate::InSet(ids),
                None => unresolved("search", label),
            },
            Filter::Rating(rating) => Predicate::Rating(*rating),
            Filter::Locked(kind) => Predicate::Locked(*kind),
            Filter::Vote(kind, name) => match self.directory.resolve_user(name)? {
                Some(user) if self.viewer.is_user(user.id) || self.viewer.is_moderator() => {
                    Predicate::Vote(*kind, user.id)
                }
                _ => unresolved("vote owner", name),
            },
            Filter::Disapproved(target) => self.disapproval_predicate(target)?,
            Filter::Width(range) => Predicate::Width(range.clone()),
            Filter::Height(range) => Predicate::Height(range.clone()),
            Filter::Score(range) => Predicate::Score(range.clone()),
            Filter::FavCount(range) => Predicate::FavCount(range.clone()),
            Filter::Mpixels(range) => Predicate::Mpixels(range.clone()),
            Filter::FileSize(range) => Predicate::FileSize(range.clone()),
        };
        Ok(Some(predicate))
    }

    /// The named user, if their favorites are visible to the viewer
    fn visible_favorites_owner(&self, name: &str) -> Result<Option<UserRef>, DbError> {
        let Some(user) = self.directory.resolve_user(name)? else {
            log::debug!("fav:{name} names no user, matching nothing");
            return Ok(None);
        };
        if self.directory.is_private_favorites(&user)? && !self.viewer.is_user(user.id) {
            log::debug!("favorites of {name} are private, matching nothing");
            return Ok(None);
        }
        Ok(Some(user))
    }

    fn resolve_pools(&self, target: &PoolTarget) -> Result<Vec<PoolRef>, DbError> {
        Ok(match target {
            PoolTarget::Any | PoolTarget::None => Vec::new(),
            PoolTarget::Category(category) => self.directory.pools_in_category(*category)?,
            PoolTarget::Id(id) => self
                .directory
                .resolve_pool(&id.to_string())?
                .into_iter()
                .collect(),
            PoolTarget::Name(name) => self.directory.resolve_pool(name)?.into_iter().collect(),
            PoolTarget::Pattern(pattern) => self.directory.find_pools(pattern)?,
        })
    }

    fn pool_predicate(&self, target: &PoolTarget) -> Result<Predicate, DbError> {
        match target {
            PoolTarget::Any => Ok(Predicate::HasPool),
            PoolTarget::None => Ok(Predicate::HasPool.negate()),
            _ => {
                let ids: BTreeSet<_> = self.resolve_pools(target)?.iter().map(|p| p.id).collect();
                if ids.is_empty() {
                    Ok(unresolved("pool", &format!("{target:?}")))
                } else {
                    Ok(Predicate::InPools(ids))
                }
            }
        }
    }

    /// `ordpool:` orders by the first matching pool's stored sequence
    fn ordered_pool_predicate(
        &self,
        target: &PoolTarget,
        orders: bool,
        ordering: &mut Option<SortSpec>,
    ) -> Result<Predicate, DbError> {
        if matches!(
            target,
            PoolTarget::Any | PoolTarget::None | PoolTarget::Category(_)
        ) {
            return self.pool_predicate(target);
        }

        let mut pools = self.resolve_pools(target)?;
        pools.sort_by_key(|p| p.id);
        let Some(pool) = pools.into_iter().next() else {
            return Ok(unresolved("ordpool", &format!("{target:?}")));
        };

        if orders {
            *ordering = Some(SortSpec::new(
                SortField::PoolSequence(pool.post_ids.clone()),
                Direction::Asc,
            ));
        }
        Ok(Predicate::InPools(BTreeSet::from([pool.id])))
    }

    fn disapproval_predicate(&self, target: &DisapprovalTarget) -> Result<Predicate, DbError> {
        if !self.viewer.can_approve_posts() {
            log::debug!("viewer cannot approve posts, disapproved: matches nothing");
            return Ok(Predicate::False);
        }
        Ok(match target {
            DisapprovalTarget::Any => Predicate::Disapproved(DisapprovalMatch::Any),
            DisapprovalTarget::Reason(reason) => {
                Predicate::Disapproved(DisapprovalMatch::Reason(*reason))
            }
            DisapprovalTarget::User(name) => match self.directory.resolve_user(name)? {
                Some(user) => Predicate::Disapproved(DisapprovalMatch::User(user.id)),
                None => unresolved("disapprover", name),
            },
        })
    }
}

fn unresolved(what: &str, reference: &str) -> Predicate {
    log::debug!("{what} {reference} is not visible, matching nothing");
    Predicate::False
}
