//! Collaborator contracts consumed by the query engine
//!
//! The engine never owns storage. It asks a [`Repository`] for alias
//! consequents and ordered scans, a [`Directory`] for users, pools and
//! favorite groups, and a [`SavedSearchIndex`] for saved search results.
//! [`crate::catalog::Catalog`] and [`crate::db::Database`] implement all three.

use std::collections::BTreeSet;

use crate::db::DbError;
use crate::model::{
    FavGroupRef, PoolCategory, PoolRef, PostId, SavedSearch, UserRef, ViewerContext,
};
use crate::query::{Predicate, SortSpec, TagPattern};

/// Post storage: aliases and scans
pub trait Repository {
    /// Consequent of an alias antecedent, looked up case-insensitively
    ///
    /// # Errors
    /// Returns a `DbError` if the alias store cannot be read.
    fn resolve_alias(&self, name: &str) -> Result<Option<String>, DbError>;

    /// Ids of posts matching `predicate`, ordered by `sort`
    ///
    /// # Errors
    /// Returns a `DbError` if posts cannot be read.
    fn scan(&self, predicate: &Predicate, sort: &SortSpec) -> Result<Vec<PostId>, DbError>;
}

/// Users, pools and favorite groups referenced by name from queries
pub trait Directory {
    /// # Errors
    /// Returns a `DbError` if the user store cannot be read.
    fn resolve_user(&self, name: &str) -> Result<Option<UserRef>, DbError>;

    /// Whether `user` hides their favorites from everyone else
    ///
    /// # Errors
    /// Returns a `DbError` if the setting cannot be read.
    fn is_private_favorites(&self, user: &UserRef) -> Result<bool, DbError> {
        Ok(user.private_favorites)
    }

    /// A favorite group by id (any group visible to `viewer`) or by name (the viewer's own)
    ///
    /// # Errors
    /// Returns a `DbError` if favorite groups cannot be read.
    fn resolve_favgroup(
        &self,
        id_or_name: &str,
        viewer: &ViewerContext,
    ) -> Result<Option<FavGroupRef>, DbError>;

    /// A pool by numeric id or by normalized name
    ///
    /// # Errors
    /// Returns a `DbError` if pools cannot be read.
    fn resolve_pool(&self, id_or_name: &str) -> Result<Option<PoolRef>, DbError>;

    /// Pools whose normalized name matches `pattern`
    ///
    /// # Errors
    /// Returns a `DbError` if pools cannot be read.
    fn find_pools(&self, pattern: &TagPattern) -> Result<Vec<PoolRef>, DbError>;

    /// # Errors
    /// Returns a `DbError` if pools cannot be read.
    fn pools_in_category(&self, category: PoolCategory) -> Result<Vec<PoolRef>, DbError>;
}

/// Saved-search results for the viewer
pub trait SavedSearchIndex {
    /// Post ids of the viewer's saved searches labelled `label`, or of all of them for `all`
    ///
    /// Returns `None` when the viewer is anonymous or has no matching search.
    ///
    /// # Errors
    /// Returns a `DbError` if saved searches cannot be read.
    fn lookup(
        &self,
        label: &str,
        viewer: &ViewerContext,
    ) -> Result<Option<BTreeSet<PostId>>, DbError>;
}

/// Normalize a pool name for comparison: lowercase, spaces as underscores
#[must_use]
pub fn normalize_pool_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Pick a favorite group from `groups` the way [`Directory::resolve_favgroup`] describes
pub fn select_favgroup<'a>(
    groups: impl IntoIterator<Item = &'a FavGroupRef>,
    id_or_name: &str,
    viewer: &ViewerContext,
) -> Option<FavGroupRef> {
    let mut groups = groups.into_iter();
    if let Ok(id) = id_or_name.parse::<u64>() {
        return groups
            .find(|g| g.id == id && g.is_visible_to(viewer))
            .cloned();
    }

    let owner = viewer.user_id()?;
    let name = normalize_pool_name(id_or_name);
    groups
        .find(|g| g.creator_id == owner && normalize_pool_name(&g.name) == name)
        .cloned()
}

/// Pick a pool from `pools` by id or normalized name
pub fn select_pool<'a>(
    pools: impl IntoIterator<Item = &'a PoolRef>,
    id_or_name: &str,
) -> Option<PoolRef> {
    let mut pools = pools.into_iter();
    if let Ok(id) = id_or_name.parse::<u64>() {
        return pools.find(|p| p.id == id).cloned();
    }
    let name = normalize_pool_name(id_or_name);
    pools
        .find(|p| normalize_pool_name(&p.name) == name)
        .cloned()
}

/// Union of the post ids of the viewer's saved searches carrying `label` (or all for `all`)
pub fn collect_saved_searches<'a>(
    searches: impl IntoIterator<Item = &'a SavedSearch>,
    label: &str,
    viewer: &ViewerContext,
) -> Option<BTreeSet<PostId>> {
    let owner = viewer.user_id()?;
    let label = label.to_lowercase();
    let mut found = false;
    let mut ids = BTreeSet::new();

    for search in searches.into_iter().filter(|s| s.user_id == owner) {
        if label == "all" || search.labels.iter().any(|l| l.to_lowercase() == label) {
            found = true;
            ids.extend(search.post_ids.iter().copied());
        }
    }

    found.then_some(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserRef;

    fn group(id: u64, name: &str, creator_id: u64, is_public: bool) -> FavGroupRef {
        FavGroupRef {
            id,
            name: name.to_string(),
            creator_id,
            is_public,
            post_ids: vec![id],
        }
    }

    #[test]
    fn test_normalize_pool_name() {
        assert_eq!(normalize_pool_name("Test A"), "test_a");
        assert_eq!(normalize_pool_name(" test_a "), "test_a");
    }

    #[test]
    fn test_favgroup_by_id_respects_visibility() {
        let groups = vec![group(1, "public", 1, true), group(2, "private", 1, false)];
        let stranger = ViewerContext::for_user(UserRef::new(9, "stranger"));
        assert!(select_favgroup(&groups, "1", &stranger).is_some());
        assert!(select_favgroup(&groups, "2", &stranger).is_none());

        let owner = ViewerContext::for_user(UserRef::new(1, "owner"));
        assert!(select_favgroup(&groups, "2", &owner).is_some());
    }

    #[test]
    fn test_favgroup_by_name_only_own() {
        let groups = vec![group(1, "Favorites", 1, true)];
        let owner = ViewerContext::for_user(UserRef::new(1, "owner"));
        let other = ViewerContext::for_user(UserRef::new(2, "other"));
        assert!(select_favgroup(&groups, "favorites", &owner).is_some());
        assert!(select_favgroup(&groups, "favorites", &other).is_none());
        assert!(select_favgroup(&groups, "favorites", &ViewerContext::anonymous()).is_none());
    }

    #[test]
    fn test_select_pool() {
        let pools = vec![PoolRef {
            id: 7,
            name: "Test_A".to_string(),
            category: PoolCategory::Series,
            post_ids: vec![],
        }];
        assert_eq!(select_pool(&pools, "7").map(|p| p.id), Some(7));
        assert_eq!(select_pool(&pools, "test a").map(|p| p.id), Some(7));
        assert!(select_pool(&pools, "8").is_none());
    }

    #[test]
    fn test_saved_searches_by_label() {
        let searches = vec![
            SavedSearch {
                id: 1,
                user_id: 1,
                query: "aaa".into(),
                labels: vec!["Zzz".into()],
                post_ids: vec![1, 2],
            },
            SavedSearch {
                id: 2,
                user_id: 1,
                query: "bbb".into(),
                labels: vec![],
                post_ids: vec![3],
            },
            SavedSearch {
                id: 3,
                user_id: 2,
                query: "ccc".into(),
                labels: vec!["zzz".into()],
                post_ids: vec![4],
            },
        ];
        let viewer = ViewerContext::for_user(UserRef::new(1, "alice"));
        assert_eq!(
            collect_saved_searches(&searches, "zzz", &viewer),
            Some(BTreeSet::from([1, 2]))
        );
        assert_eq!(
            collect_saved_searches(&searches, "all", &viewer),
            Some(BTreeSet::from([1, 2, 3]))
        );
        assert_eq!(collect_saved_searches(&searches, "nope", &viewer), None);
        assert_eq!(
            collect_saved_searches(&searches, "zzz", &ViewerContext::anonymous()),
            None
        );
    }
}
