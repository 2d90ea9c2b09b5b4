//! In-memory collaborator backend
//!
//! A [`Catalog`] holds posts, users, pools, favorite groups, aliases and saved
//! searches in memory and implements every collaborator trait the engine
//! needs. It loads from and saves to a JSON document and is also the import
//! format for [`crate::db::Database`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use crate::db::DbError;
use crate::model::{
    FavGroupRef, PoolCategory, PoolRef, Post, PostId, SavedSearch, UserRef, ViewerContext,
};
use crate::query::{Predicate, SortSpec, TagPattern};
use crate::repository::{
    Directory, Repository, SavedSearchIndex, collect_saved_searches, normalize_pool_name,
    select_favgroup, select_pool,
};
use crate::scan::scan_posts;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    posts: Vec<Post>,
    users: Vec<UserRef>,
    pools: Vec<PoolRef>,
    favgroups: Vec<FavGroupRef>,
    /// Antecedent to consequent, both lowercase
    aliases: BTreeMap<String, String>,
    saved_searches: Vec<SavedSearch>,
    #[serde(skip)]
    index: HashMap<PostId, usize>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from JSON and rebuild derived fields
    ///
    /// # Errors
    /// Returns `DbError::JsonError` if the document is not a valid catalog.
    pub fn from_json_str(json: &str) -> Result<Self, DbError> {
        let mut catalog: Self = serde_json::from_str(json)?;
        catalog.reindex();
        Ok(catalog)
    }

    /// Load a catalog from a JSON file
    ///
    /// # Errors
    /// Returns `DbError::FileNotFound` if the file is missing, or a read or parse error.
    pub fn load(path: &Path) -> Result<Self, DbError> {
        if !path.exists() {
            return Err(DbError::FileNotFound(path.display().to_string()));
        }
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// # Errors
    /// Returns `DbError::JsonError` if serialization fails.
    pub fn to_json_string(&self) -> Result<String, DbError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Recompute the id index, `has_children` and `pool_ids`
    pub fn reindex(&mut self) {
        self.index = self
            .posts
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();

        let parents: BTreeSet<PostId> = self.posts.iter().filter_map(|p| p.parent_id).collect();
        let mut memberships: HashMap<PostId, Vec<u64>> = HashMap::new();
        for pool in &self.pools {
            for post_id in &pool.post_ids {
                let pools = memberships.entry(*post_id).or_default();
                if !pools.contains(&pool.id) {
                    pools.push(pool.id);
                }
            }
        }

        for post in &mut self.posts {
            post.has_children |= parents.contains(&post.id);
            if let Some(pools) = memberships.get(&post.id) {
                for pool_id in pools {
                    if !post.pool_ids.contains(pool_id) {
                        post.pool_ids.push(*pool_id);
                    }
                }
            }
        }
    }

    /// Insert or replace a post, keeping parent and pool links consistent
    pub fn insert_post(&mut self, mut post: Post) {
        post.has_children |= self.posts.iter().any(|p| p.parent_id == Some(post.id));
        for pool in self.pools.iter().filter(|p| p.post_ids.contains(&post.id)) {
            if !post.pool_ids.contains(&pool.id) {
                post.pool_ids.push(pool.id);
            }
        }
        if let Some(parent_id) = post.parent_id
            && let Some(parent) = self.post_mut(parent_id)
        {
            parent.has_children = true;
        }

        match self.index.get(&post.id) {
            Some(&i) => self.posts[i] = post,
            None => {
                self.index.insert(post.id, self.posts.len());
                self.posts.push(post);
            }
        }
    }

    pub fn insert_user(&mut self, user: UserRef) {
        self.users.retain(|u| u.id != user.id);
        self.users.push(user);
    }

    /// Insert or replace a pool, syncing membership on the posts it lists or no longer lists
    pub fn insert_pool(&mut self, pool: PoolRef) {
        for post in &mut self.posts {
            if !pool.post_ids.contains(&post.id) {
                post.pool_ids.retain(|&id| id != pool.id);
            }
        }
        for post_id in &pool.post_ids {
            if let Some(&i) = self.index.get(post_id) {
                let post = &mut self.posts[i];
                if !post.pool_ids.contains(&pool.id) {
                    post.pool_ids.push(pool.id);
                }
            }
        }
        self.pools.retain(|p| p.id != pool.id);
        self.pools.push(pool);
    }

    pub fn insert_favgroup(&mut self, group: FavGroupRef) {
        self.favgroups.retain(|g| g.id != group.id);
        self.favgroups.push(group);
    }

    pub fn add_alias(&mut self, antecedent: &str, consequent: &str) {
        self.aliases
            .insert(antecedent.to_lowercase(), consequent.to_lowercase());
    }

    pub fn insert_saved_search(&mut self, search: SavedSearch) {
        self.saved_searches.retain(|s| s.id != search.id);
        self.saved_searches.push(search);
    }

    #[must_use]
    pub fn post(&self, id: PostId) -> Option<&Post> {
        self.index.get(&id).map(|&i| &self.posts[i])
    }

    fn post_mut(&mut self, id: PostId) -> Option<&mut Post> {
        self.index.get(&id).map(|&i| &mut self.posts[i])
    }

    #[must_use]
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    #[must_use]
    pub fn users(&self) -> &[UserRef] {
        &self.users
    }

    #[must_use]
    pub fn pools(&self) -> &[PoolRef] {
        &self.pools
    }

    #[must_use]
    pub fn favgroups(&self) -> &[FavGroupRef] {
        &self.favgroups
    }

    #[must_use]
    pub const fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    #[must_use]
    pub fn saved_searches(&self) -> &[SavedSearch] {
        &self.saved_searches
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

impl Repository for Catalog {
    fn resolve_alias(&self, name: &str) -> Result<Option<String>, DbError> {
        Ok(self.aliases.get(&name.to_lowercase()).cloned())
    }

    fn scan(&self, predicate: &Predicate, sort: &SortSpec) -> Result<Vec<PostId>, DbError> {
        Ok(scan_posts(&self.posts, predicate, sort))
    }
}

impl Directory for Catalog {
    fn resolve_user(&self, name: &str) -> Result<Option<UserRef>, DbError> {
        let name = name.to_lowercase();
        Ok(self
            .users
            .iter()
            .find(|u| u.name.to_lowercase() == name)
            .cloned())
    }

    fn resolve_favgroup(
        &self,
        id_or_name: &str,
        viewer: &ViewerContext,
    ) -> Result<Option<FavGroupRef>, DbError> {
        Ok(select_favgroup(&self.favgroups, id_or_name, viewer))
    }

    fn resolve_pool(&self, id_or_name: &str) -> Result<Option<PoolRef>, DbError> {
        Ok(select_pool(&self.pools, id_or_name))
    }

    fn find_pools(&self, pattern: &TagPattern) -> Result<Vec<PoolRef>, DbError> {
        Ok(self
            .pools
            .iter()
            .filter(|p| pattern.matches(&normalize_pool_name(&p.name)))
            .cloned()
            .collect())
    }

    fn pools_in_category(&self, category: PoolCategory) -> Result<Vec<PoolRef>, DbError> {
        Ok(self
            .pools
            .iter()
            .filter(|p| p.category == category)
            .cloned()
            .collect())
    }
}

impl SavedSearchIndex for Catalog {
    fn lookup(
        &self,
        label: &str,
        viewer: &ViewerContext,
    ) -> Result<Option<BTreeSet<PostId>>, DbError> {
        Ok(collect_saved_searches(&self.saved_searches, label, viewer))
    }
}
