//! Database wrapper module for tagq
//!
//! Persists posts and the entities queries reference using sled as the
//! embedded database backend. Values are encoded with bincode in serde mode.
//!
//! Uses multiple sled trees for efficient indexing:
//! - `posts`: post id (big endian) -> `Post`
//! - `tags`: reverse index mapping tag names to post ids
//! - `aliases`: antecedent -> consequent
//! - `users`: lowercase user name -> `UserRef`
//! - `pools`, `favgroups`, `saved_searches`: id (big endian) -> record

use serde::Serialize;
use serde::de::DeserializeOwned;
use sled::{Db, Tree};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crate::catalog::Catalog;
use crate::model::{
    FavGroupRef, PoolCategory, PoolRef, Post, PostId, SavedSearch, UserRef, ViewerContext,
};
use crate::query::{Predicate, SortSpec, TagPattern};
use crate::repository::{
    Directory, Repository, SavedSearchIndex, collect_saved_searches, normalize_pool_name,
    select_favgroup, select_pool,
};
use crate::scan::scan_posts;

pub mod error;

pub use error::DbError;

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, DbError> {
    Ok(bincode::serde::encode_to_vec(
        value,
        bincode::config::standard(),
    )?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DbError> {
    let (value, _): (T, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
    Ok(value)
}

const fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

/// Database wrapper that encapsulates all database operations
pub struct Database {
    db: Db,
    posts: Tree,
    tags: Tree,
    aliases: Tree,
    users: Tree,
    pools: Tree,
    favgroups: Tree,
    saved_searches: Tree,
}

impl Database {
    /// Opens or creates a database at the specified path
    ///
    /// # Examples
    /// ```no_run
    /// use tagq::db::Database;
    /// let db = Database::open("my_db").unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the database cannot be opened or if the internal trees cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let db = sled::open(path)?;
        Ok(Self {
            posts: db.open_tree("posts")?,
            tags: db.open_tree("tags")?,
            aliases: db.open_tree("aliases")?,
            users: db.open_tree("users")?,
            pools: db.open_tree("pools")?,
            favgroups: db.open_tree("favgroups")?,
            saved_searches: db.open_tree("saved_searches")?,
            db,
        })
    }

    /// Insert or replace a post and update the tag index
    ///
    /// # Errors
    ///
    /// Returns `DbError` if database operations fail or serialization errors occur.
    pub fn insert_post(&self, post: &Post) -> Result<(), DbError> {
        if let Some(old) = self.get_post(post.id)? {
            let old_tags: Vec<&str> = old.tag_names().collect();
            self.remove_from_tag_index(post.id, &old_tags)?;
        }

        self.posts.insert(id_key(post.id), encode(post)?)?;

        let tags: Vec<&str> = post.tag_names().collect();
        self.add_to_tag_index(post.id, &tags)?;
        Ok(())
    }

    /// Get a post by id
    ///
    /// # Errors
    ///
    /// Returns `DbError` if database operations fail or deserialization errors occur.
    pub fn get_post(&self, id: PostId) -> Result<Option<Post>, DbError> {
        self.posts
            .get(id_key(id))?
            .map(|value| decode(&value))
            .transpose()
    }

    /// Remove a post and its tag index entries
    ///
    /// # Errors
    ///
    /// Returns `DbError` if database operations fail.
    pub fn remove_post(&self, id: PostId) -> Result<bool, DbError> {
        let Some(post) = self.get_post(id)? else {
            return Ok(false);
        };
        let tags: Vec<&str> = post.tag_names().collect();
        self.remove_from_tag_index(id, &tags)?;
        Ok(self.posts.remove(id_key(id))?.is_some())
    }

    /// All posts in ascending id order
    ///
    /// # Errors
    ///
    /// Returns `DbError` if database iteration fails or deserialization errors occur.
    pub fn list_posts(&self) -> Result<Vec<Post>, DbError> {
        self.posts
            .iter()
            .map(|result| {
                let (_, value) = result?;
                decode(&value)
            })
            .collect()
    }

    /// Ids of posts carrying `tag`, using the reverse index
    ///
    /// # Errors
    ///
    /// Returns `DbError` if database operations fail or deserialization errors occur.
    pub fn find_by_tag(&self, tag: &str) -> Result<Vec<PostId>, DbError> {
        match self.tags.get(tag.as_bytes())? {
            Some(value) => decode(&value),
            None => Ok(Vec::new()),
        }
    }

    /// Ids of posts carrying every tag in `tags`
    ///
    /// # Errors
    ///
    /// Returns `DbError` if any tag lookup fails.
    pub fn find_by_all_tags(&self, tags: &[&str]) -> Result<Vec<PostId>, DbError> {
        let Some((first, rest)) = tags.split_first() else {
            return Ok(Vec::new());
        };

        let mut ids: BTreeSet<PostId> = self.find_by_tag(first)?.into_iter().collect();
        for tag in rest {
            if ids.is_empty() {
                break;
            }
            let other: HashSet<PostId> = self.find_by_tag(tag)?.into_iter().collect();
            ids.retain(|id| other.contains(id));
        }
        Ok(ids.into_iter().collect())
    }

    /// All tag names in the index, sorted
    ///
    /// # Errors
    ///
    /// Returns `DbError` if database iteration fails.
    pub fn list_all_tags(&self) -> Result<Vec<String>, DbError> {
        let mut tags = Vec::new();
        for result in &self.tags {
            let (key, _) = result?;
            let tag = String::from_utf8(key.to_vec())
                .map_err(|e| DbError::SerializeError(e.to_string()))?;
            tags.push(tag);
        }
        tags.sort();
        Ok(tags)
    }

    /// Get the number of posts in the database
    #[must_use]
    pub fn count(&self) -> usize {
        self.posts.len()
    }

    /// Record an alias; both sides are stored lowercase
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the write fails.
    pub fn add_alias(&self, antecedent: &str, consequent: &str) -> Result<(), DbError> {
        self.aliases.insert(
            antecedent.to_lowercase().as_bytes(),
            consequent.to_lowercase().as_bytes(),
        )?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if database operations fail or serialization errors occur.
    pub fn insert_user(&self, user: &UserRef) -> Result<(), DbError> {
        self.users
            .insert(user.name.to_lowercase().as_bytes(), encode(user)?)?;
        Ok(())
    }

    /// Insert or replace a pool, syncing membership on the posts it lists or no longer lists
    ///
    /// # Errors
    ///
    /// Returns `DbError` if database operations fail or serialization errors occur.
    pub fn insert_pool(&self, pool: &PoolRef) -> Result<(), DbError> {
        let members: BTreeSet<PostId> = pool.post_ids.iter().copied().collect();
        if let Some(old) = self.pools.get(id_key(pool.id))? {
            let old: PoolRef = decode(&old)?;
            for post_id in old.post_ids.iter().filter(|id| !members.contains(*id)) {
                if let Some(mut post) = self.get_post(*post_id)?
                    && post.pool_ids.contains(&pool.id)
                {
                    post.pool_ids.retain(|&id| id != pool.id);
                    self.posts.insert(id_key(*post_id), encode(&post)?)?;
                }
            }
        }
        for post_id in members {
            if let Some(mut post) = self.get_post(post_id)?
                && !post.pool_ids.contains(&pool.id)
            {
                post.pool_ids.push(pool.id);
                self.posts.insert(id_key(post_id), encode(&post)?)?;
            }
        }
        self.pools.insert(id_key(pool.id), encode(pool)?)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if database operations fail or serialization errors occur.
    pub fn insert_favgroup(&self, group: &FavGroupRef) -> Result<(), DbError> {
        self.favgroups.insert(id_key(group.id), encode(group)?)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DbError` if database operations fail or serialization errors occur.
    pub fn insert_saved_search(&self, search: &SavedSearch) -> Result<(), DbError> {
        self.saved_searches
            .insert(id_key(search.id), encode(search)?)?;
        Ok(())
    }

    /// Bulk-load every record of a catalog, returning the number of posts written
    ///
    /// # Errors
    ///
    /// Returns `DbError` if any write fails.
    pub fn import(&self, catalog: &Catalog) -> Result<usize, DbError> {
        for post in catalog.posts() {
            self.insert_post(post)?;
        }
        for user in catalog.users() {
            self.insert_user(user)?;
        }
        for pool in catalog.pools() {
            self.insert_pool(pool)?;
        }
        for group in catalog.favgroups() {
            self.insert_favgroup(group)?;
        }
        for (antecedent, consequent) in catalog.aliases() {
            self.add_alias(antecedent, consequent)?;
        }
        for search in catalog.saved_searches() {
            self.insert_saved_search(search)?;
        }
        log::info!("imported {} posts", catalog.len());
        Ok(catalog.len())
    }

    /// Flush all pending writes to disk
    ///
    /// # Errors
    ///
    /// Returns `DbError` if the flush operation fails.
    pub fn flush(&self) -> Result<(), DbError> {
        self.db.flush()?;
        Ok(())
    }

    /// Clear all entries from the database
    ///
    /// # Errors
    ///
    /// Returns `DbError` if clearing any tree fails.
    pub fn clear(&self) -> Result<(), DbError> {
        for tree in self.trees() {
            tree.clear()?;
        }
        Ok(())
    }

    const fn trees(&self) -> [&Tree; 7] {
        [
            &self.posts,
            &self.tags,
            &self.aliases,
            &self.users,
            &self.pools,
            &self.favgroups,
            &self.saved_searches,
        ]
    }

    fn values<T: DeserializeOwned>(tree: &Tree) -> Result<Vec<T>, DbError> {
        tree.iter()
            .map(|result| {
                let (_, value) = result?;
                decode(&value)
            })
            .collect()
    }

    /// Candidate posts for a predicate, narrowed through the tag index when possible
    fn candidates(&self, predicate: &Predicate) -> Result<Vec<Post>, DbError> {
        let required = predicate.required_tags();
        if required.is_empty() {
            return self.list_posts();
        }

        let ids = self.find_by_all_tags(&required)?;
        log::debug!("tag index narrowed scan to {} posts", ids.len());
        ids.into_iter()
            .filter_map(|id| self.get_post(id).transpose())
            .collect()
    }

    fn add_to_tag_index(&self, post_id: PostId, tags: &[&str]) -> Result<(), DbError> {
        for tag in tags {
            let mut ids: Vec<PostId> = match self.tags.get(tag.as_bytes())? {
                Some(value) => decode(&value)?,
                None => Vec::new(),
            };
            if !ids.contains(&post_id) {
                ids.push(post_id);
                self.tags.insert(tag.as_bytes(), encode(&ids)?)?;
            }
        }
        Ok(())
    }

    fn remove_from_tag_index(&self, post_id: PostId, tags: &[&str]) -> Result<(), DbError> {
        for tag in tags {
            if let Some(value) = self.tags.get(tag.as_bytes())? {
                let mut ids: Vec<PostId> = decode(&value)?;
                ids.retain(|id| *id != post_id);
                if ids.is_empty() {
                    self.tags.remove(tag.as_bytes())?;
                } else {
                    self.tags.insert(tag.as_bytes(), encode(&ids)?)?;
                }
            }
        }
        Ok(())
    }
}

impl Repository for Database {
    fn resolve_alias(&self, name: &str) -> Result<Option<String>, DbError> {
        self.aliases
            .get(name.to_lowercase().as_bytes())?
            .map(|value| {
                String::from_utf8(value.to_vec()).map_err(|e| DbError::SerializeError(e.to_string()))
            })
            .transpose()
    }

    fn scan(&self, predicate: &Predicate, sort: &SortSpec) -> Result<Vec<PostId>, DbError> {
        let candidates = self.candidates(predicate)?;
        Ok(scan_posts(&candidates, predicate, sort))
    }
}

impl Directory for Database {
    fn resolve_user(&self, name: &str) -> Result<Option<UserRef>, DbError> {
        self.users
            .get(name.to_lowercase().as_bytes())?
            .map(|value| decode(&value))
            .transpose()
    }

    fn resolve_favgroup(
        &self,
        id_or_name: &str,
        viewer: &ViewerContext,
    ) -> Result<Option<FavGroupRef>, DbError> {
        let groups: Vec<FavGroupRef> = Self::values(&self.favgroups)?;
        Ok(select_favgroup(&groups, id_or_name, viewer))
    }

    fn resolve_pool(&self, id_or_name: &str) -> Result<Option<PoolRef>, DbError> {
        if let Ok(id) = id_or_name.parse::<u64>() {
            return self
                .pools
                .get(id_key(id))?
                .map(|value| decode(&value))
                .transpose();
        }
        let pools: Vec<PoolRef> = Self::values(&self.pools)?;
        Ok(select_pool(&pools, id_or_name))
    }

    fn find_pools(&self, pattern: &TagPattern) -> Result<Vec<PoolRef>, DbError> {
        let pools: Vec<PoolRef> = Self::values(&self.pools)?;
        Ok(pools
            .into_iter()
            .filter(|p| pattern.matches(&normalize_pool_name(&p.name)))
            .collect())
    }

    fn pools_in_category(&self, category: PoolCategory) -> Result<Vec<PoolRef>, DbError> {
        let pools: Vec<PoolRef> = Self::values(&self.pools)?;
        Ok(pools.into_iter().filter(|p| p.category == category).collect())
    }
}

impl SavedSearchIndex for Database {
    fn lookup(
        &self,
        label: &str,
        viewer: &ViewerContext,
    ) -> Result<Option<BTreeSet<PostId>>, DbError> {
        let searches: Vec<SavedSearch> = Self::values(&self.saved_searches)?;
        Ok(collect_saved_searches(&searches, label, viewer))
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        // Best-effort flush; callers needing durability call flush()
        let _ = self.db.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rating;
    use crate::query::{Direction, SortField};
    use crate::testing::TestDb;

    fn post(id: PostId, tags: &str) -> Post {
        Post::builder(id).tag_string(tags).build()
    }

    #[test]
    fn test_create_database() {
        let test_db = TestDb::new();
        assert_eq!(test_db.db().count(), 0);
        assert!(test_db.path().exists());
    }

    #[test]
    fn test_insert_and_get_post() {
        let test_db = TestDb::new();
        let db = test_db.db();
        let stored = Post::builder(7)
            .tag_string("artist:wokada aaa")
            .rating(Rating::Safe)
            .source("http://example.com")
            .build();

        db.insert_post(&stored).unwrap();

        assert_eq!(db.get_post(7).unwrap(), Some(stored));
        assert_eq!(db.get_post(8).unwrap(), None);
        assert_eq!(db.count(), 1);
    }

    #[test]
    fn test_tag_index_tracks_replacements() {
        let test_db = TestDb::new();
        let db = test_db.db();

        db.insert_post(&post(1, "aaa bbb")).unwrap();
        db.insert_post(&post(1, "bbb ccc")).unwrap();

        assert!(db.find_by_tag("aaa").unwrap().is_empty());
        assert_eq!(db.find_by_tag("ccc").unwrap(), vec![1]);
        assert_eq!(db.list_all_tags().unwrap(), vec!["bbb", "ccc"]);
    }

    #[test]
    fn test_find_by_all_tags() {
        let test_db = TestDb::new();
        let db = test_db.db();
        db.insert_post(&post(1, "aaa bbb")).unwrap();
        db.insert_post(&post(2, "aaa")).unwrap();
        db.insert_post(&post(3, "bbb")).unwrap();

        assert_eq!(db.find_by_all_tags(&["aaa", "bbb"]).unwrap(), vec![1]);
        assert!(db.find_by_all_tags(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_remove_post() {
        let test_db = TestDb::new();
        let db = test_db.db();
        db.insert_post(&post(1, "aaa")).unwrap();

        assert!(db.remove_post(1).unwrap());
        assert!(!db.remove_post(1).unwrap());
        assert!(db.find_by_tag("aaa").unwrap().is_empty());
    }

    #[test]
    fn test_aliases_are_case_insensitive() {
        let test_db = TestDb::new();
        let db = test_db.db();
        db.add_alias("Gray_Hair", "grey_hair").unwrap();

        assert_eq!(
            db.resolve_alias("GRAY_HAIR").unwrap(),
            Some("grey_hair".to_string())
        );
        assert_eq!(db.resolve_alias("blue_hair").unwrap(), None);
    }

    #[test]
    fn test_insert_pool_updates_members() {
        let test_db = TestDb::new();
        let db = test_db.db();
        db.insert_post(&post(1, "aaa")).unwrap();
        db.insert_pool(&PoolRef {
            id: 3,
            name: "Test A".into(),
            category: PoolCategory::Series,
            post_ids: vec![1, 1],
        })
        .unwrap();

        assert_eq!(db.get_post(1).unwrap().unwrap().pool_ids, vec![3]);
        assert_eq!(db.resolve_pool("test_a").unwrap().map(|p| p.id), Some(3));
        assert_eq!(db.resolve_pool("3").unwrap().map(|p| p.id), Some(3));
    }

    #[test]
    fn test_replacing_pool_drops_removed_members() {
        let test_db = TestDb::new();
        let db = test_db.db();
        db.insert_post(&post(1, "aaa")).unwrap();
        db.insert_post(&post(2, "aaa")).unwrap();
        let pool = |post_ids| PoolRef {
            id: 5,
            name: "p".into(),
            category: PoolCategory::Series,
            post_ids,
        };

        db.insert_pool(&pool(vec![1, 2])).unwrap();
        db.insert_pool(&pool(vec![2])).unwrap();

        assert!(db.get_post(1).unwrap().unwrap().pool_ids.is_empty());
        assert_eq!(db.get_post(2).unwrap().unwrap().pool_ids, vec![5]);
    }

    #[test]
    fn test_resolve_non_ascii_user() {
        let test_db = TestDb::new();
        let db = test_db.db();
        db.insert_user(&UserRef::new(4, "Ünal")).unwrap();
        assert_eq!(db.resolve_user("ünal").unwrap().map(|u| u.id), Some(4));
    }

    #[test]
    fn test_scan_with_index_narrowing() {
        let test_db = TestDb::new();
        let db = test_db.db();
        db.insert_post(&post(1, "aaa bbb")).unwrap();
        db.insert_post(&post(2, "aaa")).unwrap();
        db.insert_post(&post(3, "ccc")).unwrap();

        let predicate = Predicate::all([
            Predicate::Tag("aaa".into()),
            Predicate::Tag("bbb".into()).negate(),
        ]);
        let ids = db
            .scan(&predicate, &SortSpec::new(SortField::Id, Direction::Desc))
            .unwrap();
        assert_eq!(ids, vec![2]);

        let all = db.scan(&Predicate::True, &SortSpec::default()).unwrap();
        assert_eq!(all, vec![3, 2, 1]);
    }

    #[test]
    fn test_import_catalog() {
        let test_db = TestDb::new();
        let db = test_db.db();
        let mut catalog = Catalog::new();
        catalog.insert_post(post(1, "aaa"));
        catalog.insert_post(post(2, "bbb"));
        catalog.insert_user(UserRef::new(5, "Alice"));
        catalog.add_alias("zzz", "aaa");

        assert_eq!(db.import(&catalog).unwrap(), 2);
        assert_eq!(db.count(), 2);
        assert_eq!(db.resolve_user("alice").unwrap().map(|u| u.id), Some(5));
        assert_eq!(db.resolve_alias("zzz").unwrap(), Some("aaa".to_string()));
    }

    #[test]
    fn test_reopen_existing_database() {
        let test_db = TestDb::new();
        let path = test_db.path().join("reopen");
        {
            let db = Database::open(&path).unwrap();
            db.insert_post(&post(1, "aaa")).unwrap();
            db.flush().unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.find_by_tag("aaa").unwrap(), vec![1]);
    }

    #[test]
    fn test_clear() {
        let test_db = TestDb::new();
        let db = test_db.db();
        db.insert_post(&post(1, "aaa")).unwrap();
        db.add_alias("a", "b").unwrap();

        db.clear().unwrap();

        assert_eq!(db.count(), 0);
        assert!(db.list_all_tags().unwrap().is_empty());
        assert_eq!(db.resolve_alias("a").unwrap(), None);
    }
}

