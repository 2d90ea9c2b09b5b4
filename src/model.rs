//! Records the query engine evaluates predicates against
//!
//! A [`Post`] carries its own tag set plus the denormalized relations the
//! metatags join against (favorites, pool membership, comments, notes,
//! commentary, votes, flags and disapprovals). The remaining types describe
//! the entities named references resolve to: users, pools, favorite groups
//! and saved searches.
//!
//! Everything here is plain data and serializable with `serde`, so the same
//! structs back the JSON catalog format and the `sled` store.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type PostId = u64;
pub type UserId = u64;
pub type PoolId = u64;
pub type FavGroupId = u64;

/// Category a tag belongs to, used by the per-category tag count metatags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagCategory {
    #[default]
    General,
    Artist,
    Copyright,
    Character,
    Meta,
}

impl TagCategory {
    /// Split a category-prefixed tag such as `artist:wokada` into its category and name
    ///
    /// Tags without a recognized prefix are general tags and are returned unchanged.
    #[must_use]
    pub fn split_prefixed(tag: &str) -> (Self, &str) {
        match tag.split_once(':') {
            Some(("artist" | "art", name)) if !name.is_empty() => (Self::Artist, name),
            Some(("copyright" | "copy", name)) if !name.is_empty() => (Self::Copyright, name),
            Some(("character" | "char", name)) if !name.is_empty() => (Self::Character, name),
            Some(("meta", name)) if !name.is_empty() => (Self::Meta, name),
            Some(("general" | "gen", name)) if !name.is_empty() => (Self::General, name),
            _ => (Self::General, tag),
        }
    }
}

/// Content rating of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Safe,
    #[default]
    Questionable,
    Explicit,
}

impl Rating {
    /// Parse a rating from its code; only the first letter is significant (`s`, `safe`, ...)
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.chars().next()?.to_ascii_lowercase() {
            's' => Some(Self::Safe),
            'q' => Some(Self::Questionable),
            'e' => Some(Self::Explicit),
            _ => None,
        }
    }

    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Safe => 's',
            Self::Questionable => 'q',
            Self::Explicit => 'e',
        }
    }
}

/// A user's favorite; `id` increases with the time the favorite was added
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: u64,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub creator_id: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
    /// Comments made with "do not bump" leave `last_comment_bumped_at` untouched
    #[serde(default)]
    pub do_not_bump_post: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub creator_id: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

/// Artist commentary attached to a post
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Commentary {
    #[serde(default)]
    pub original_title: String,
    #[serde(default)]
    pub original_description: String,
    #[serde(default)]
    pub translated_title: String,
    #[serde(default)]
    pub translated_description: String,
    /// Users who created or edited the commentary
    #[serde(default)]
    pub updater_ids: Vec<UserId>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Commentary {
    #[must_use]
    pub fn has_original(&self) -> bool {
        !self.original_title.is_empty() || !self.original_description.is_empty()
    }

    #[must_use]
    pub fn has_translation(&self) -> bool {
        !self.translated_title.is_empty() || !self.translated_description.is_empty()
    }

    #[must_use]
    pub fn has_content(&self) -> bool {
        self.has_original() || self.has_translation()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        [
            self.original_title.as_str(),
            self.original_description.as_str(),
            self.translated_title.as_str(),
            self.translated_description.as_str(),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub user_id: UserId,
    /// Positive for an upvote, negative for a downvote
    pub score: i32,
}

/// A moderation flag raised against a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFlag {
    pub creator_id: UserId,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub is_resolved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisapprovalReason {
    BreaksRules,
    PoorQuality,
    Disinterest,
}

impl DisapprovalReason {
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "breaks_rules" => Some(Self::BreaksRules),
            "poor_quality" => Some(Self::PoorQuality),
            "disinterest" => Some(Self::Disinterest),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BreaksRules => "breaks_rules",
            Self::PoorQuality => "poor_quality",
            Self::Disinterest => "disinterest",
        }
    }
}

/// A moderator's disapproval of a pending post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disapproval {
    pub user_id: UserId,
    pub reason: DisapprovalReason,
}

/// A tagged item in the repository
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Tag name to category
    #[serde(default)]
    pub tags: BTreeMap<String, TagCategory>,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub md5: String,
    #[serde(default)]
    pub file_ext: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub image_width: u32,
    #[serde(default)]
    pub image_height: u32,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub uploader_id: UserId,
    #[serde(default)]
    pub approver_id: Option<UserId>,
    #[serde(default)]
    pub parent_id: Option<PostId>,
    #[serde(default)]
    pub has_children: bool,
    #[serde(default)]
    pub is_pending: bool,
    #[serde(default)]
    pub is_flagged: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_banned: bool,
    #[serde(default)]
    pub is_rating_locked: bool,
    #[serde(default)]
    pub is_note_locked: bool,
    #[serde(default)]
    pub is_status_locked: bool,
    #[serde(default)]
    pub has_embedded_notes: bool,
    #[serde(default)]
    pub favorites: Vec<Favorite>,
    /// Pools this post belongs to; kept in sync by the stores when pools are inserted
    #[serde(default)]
    pub pool_ids: Vec<PoolId>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub commentary: Option<Commentary>,
    #[serde(default)]
    pub votes: Vec<Vote>,
    #[serde(default)]
    pub flags: Vec<PostFlag>,
    #[serde(default)]
    pub disapprovals: Vec<Disapproval>,
}

impl Post {
    /// Start building a post with the given id
    #[must_use]
    pub fn builder(id: PostId) -> PostBuilder {
        PostBuilder::new(id)
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    /// Number of tags, optionally restricted to one category
    #[must_use]
    pub fn tag_count(&self, category: Option<TagCategory>) -> u64 {
        match category {
            None => self.tags.len() as u64,
            Some(category) => self.tags.values().filter(|c| **c == category).count() as u64,
        }
    }

    #[must_use]
    pub fn fav_count(&self) -> u64 {
        self.favorites.len() as u64
    }

    #[must_use]
    pub fn is_favorited_by(&self, user_id: UserId) -> bool {
        self.favorites.iter().any(|f| f.user_id == user_id)
    }

    /// Ordering key of `user_id`'s favorite on this post, if any
    #[must_use]
    pub fn favorite_id(&self, user_id: UserId) -> Option<u64> {
        self.favorites
            .iter()
            .find(|f| f.user_id == user_id)
            .map(|f| f.id)
    }

    pub fn visible_comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(|c| !c.is_deleted)
    }

    pub fn active_notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter().filter(|n| n.is_active)
    }

    #[must_use]
    pub fn last_commented_at(&self) -> Option<DateTime<Utc>> {
        self.visible_comments().map(|c| c.created_at).max()
    }

    #[must_use]
    pub fn last_comment_bumped_at(&self) -> Option<DateTime<Utc>> {
        self.visible_comments()
            .filter(|c| !c.do_not_bump_post)
            .map(|c| c.created_at)
            .max()
    }

    #[must_use]
    pub fn last_noted_at(&self) -> Option<DateTime<Utc>> {
        self.notes.iter().map(|n| n.created_at).max()
    }

    #[must_use]
    pub fn mpixels(&self) -> f64 {
        f64::from(self.image_width) * f64::from(self.image_height) / 1_000_000.0
    }

    /// Width over height; a zero height counts as one
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.image_width) / f64::from(self.image_height.max(1))
    }
}

/// Fluent constructor for [`Post`], used by fixtures and the catalog loader
#[derive(Debug, Clone)]
pub struct PostBuilder {
    post: Post,
}

impl PostBuilder {
    #[must_use]
    pub fn new(id: PostId) -> Self {
        Self {
            post: Post {
                id,
                ..Post::default()
            },
        }
    }

    #[must_use]
    pub const fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.post.created_at = at;
        self
    }

    #[must_use]
    pub const fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.post.updated_at = Some(at);
        self
    }

    /// Set tags from a space-separated tag string; `artist:`, `copy:`, `char:`
    /// and similar prefixes assign categories
    #[must_use]
    pub fn tag_string(mut self, tags: &str) -> Self {
        self.post.tags = tags
            .split_whitespace()
            .map(|tag| {
                let (category, name) = TagCategory::split_prefixed(tag);
                (name.to_lowercase(), category)
            })
            .collect();
        self
    }

    #[must_use]
    pub const fn rating(mut self, rating: Rating) -> Self {
        self.post.rating = rating;
        self
    }

    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.post.source = source.into();
        self
    }

    #[must_use]
    pub fn md5(mut self, md5: impl Into<String>) -> Self {
        self.post.md5 = md5.into();
        self
    }

    #[must_use]
    pub fn file_ext(mut self, ext: impl Into<String>) -> Self {
        self.post.file_ext = ext.into();
        self
    }

    #[must_use]
    pub const fn file_size(mut self, bytes: u64) -> Self {
        self.post.file_size = bytes;
        self
    }

    #[must_use]
    pub const fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.post.image_width = width;
        self.post.image_height = height;
        self
    }

    #[must_use]
    pub const fn score(mut self, score: i64) -> Self {
        self.post.score = score;
        self
    }

    #[must_use]
    pub const fn uploader(mut self, user_id: UserId) -> Self {
        self.post.uploader_id = user_id;
        self
    }

    #[must_use]
    pub const fn approver(mut self, user_id: UserId) -> Self {
        self.post.approver_id = Some(user_id);
        self
    }

    #[must_use]
    pub const fn parent(mut self, parent_id: PostId) -> Self {
        self.post.parent_id = Some(parent_id);
        self
    }

    #[must_use]
    pub const fn pending(mut self) -> Self {
        self.post.is_pending = true;
        self
    }

    #[must_use]
    pub const fn flagged(mut self) -> Self {
        self.post.is_flagged = true;
        self
    }

    #[must_use]
    pub const fn deleted(mut self) -> Self {
        self.post.is_deleted = true;
        self
    }

    #[must_use]
    pub const fn banned(mut self) -> Self {
        self.post.is_banned = true;
        self
    }

    #[must_use]
    pub const fn locks(mut self, rating: bool, note: bool, status: bool) -> Self {
        self.post.is_rating_locked = rating;
        self.post.is_note_locked = note;
        self.post.is_status_locked = status;
        self
    }

    #[must_use]
    pub const fn embedded_notes(mut self, embedded: bool) -> Self {
        self.post.has_embedded_notes = embedded;
        self
    }

    #[must_use]
    pub fn favorite(mut self, favorite_id: u64, user_id: UserId) -> Self {
        self.post.favorites.push(Favorite {
            id: favorite_id,
            user_id,
        });
        self
    }

    #[must_use]
    pub fn comment(mut self, comment: Comment) -> Self {
        self.post.comments.push(comment);
        self
    }

    #[must_use]
    pub fn note(mut self, note: Note) -> Self {
        self.post.notes.push(note);
        self
    }

    #[must_use]
    pub fn commentary(mut self, commentary: Commentary) -> Self {
        self.post.commentary = Some(commentary);
        self
    }

    #[must_use]
    pub fn vote(mut self, user_id: UserId, score: i32) -> Self {
        self.post.votes.push(Vote { user_id, score });
        self
    }

    #[must_use]
    pub fn flag(mut self, flag: PostFlag) -> Self {
        self.post.flags.push(flag);
        self
    }

    #[must_use]
    pub fn disapproval(mut self, user_id: UserId, reason: DisapprovalReason) -> Self {
        self.post.disapprovals.push(Disapproval { user_id, reason });
        self
    }

    #[must_use]
    pub fn build(self) -> Post {
        self.post
    }
}

/// Permission level of a user; ordered from least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserLevel {
    Anonymous,
    #[default]
    Member,
    Gold,
    Platinum,
    Builder,
    Moderator,
    Admin,
}

/// A resolved user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub level: UserLevel,
    #[serde(default)]
    pub private_favorites: bool,
    #[serde(default)]
    pub can_approve_posts: bool,
}

impl UserRef {
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            level: UserLevel::Member,
            private_favorites: false,
            can_approve_posts: false,
        }
    }

    #[must_use]
    pub const fn with_level(mut self, level: UserLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub const fn with_private_favorites(mut self) -> Self {
        self.private_favorites = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolCategory {
    #[default]
    Series,
    Collection,
}

/// A named, ordered collection of posts; `post_ids` may repeat a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRef {
    pub id: PoolId,
    pub name: String,
    #[serde(default)]
    pub category: PoolCategory,
    #[serde(default)]
    pub post_ids: Vec<PostId>,
}

/// A user's favorite group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavGroupRef {
    pub id: FavGroupId,
    pub name: String,
    pub creator_id: UserId,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub post_ids: Vec<PostId>,
}

impl FavGroupRef {
    /// Public groups are visible to everyone, private ones only to their creator
    #[must_use]
    pub fn is_visible_to(&self, viewer: &ViewerContext) -> bool {
        self.is_public || viewer.user_id() == Some(self.creator_id)
    }
}

/// A saved search together with the post ids its index currently holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub id: u64,
    pub user_id: UserId,
    pub query: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub post_ids: Vec<PostId>,
}

/// The principal a query is evaluated for
///
/// Immutable for the duration of one evaluation; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerContext {
    pub user: Option<UserRef>,
    /// Hide deleted posts unless the query mentions `status:` explicitly
    pub hide_deleted_posts: bool,
    /// Offset used to turn timestamps into calendar dates for `date:`
    pub time_zone: FixedOffset,
}

impl Default for ViewerContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl ViewerContext {
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            user: None,
            hide_deleted_posts: false,
            time_zone: Utc.fix(),
        }
    }

    #[must_use]
    pub fn for_user(user: UserRef) -> Self {
        Self {
            user: Some(user),
            ..Self::anonymous()
        }
    }

    #[must_use]
    pub const fn with_hide_deleted(mut self, hide: bool) -> Self {
        self.hide_deleted_posts = hide;
        self
    }

    #[must_use]
    pub const fn with_time_zone(mut self, offset: FixedOffset) -> Self {
        self.time_zone = offset;
        self
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id)
    }

    #[must_use]
    pub fn level(&self) -> UserLevel {
        self.user
            .as_ref()
            .map_or(UserLevel::Anonymous, |u| u.level)
    }

    #[must_use]
    pub fn is_moderator(&self) -> bool {
        self.level() >= UserLevel::Moderator
    }

    /// Moderators and users holding the approver permission
    #[must_use]
    pub fn can_approve_posts(&self) -> bool {
        self.is_moderator() || self.user.as_ref().is_some_and(|u| u.can_approve_posts)
    }

    #[must_use]
    pub fn is_user(&self, user_id: UserId) -> bool {
        self.user_id() == Some(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_split_prefixed_categories() {
        assert_eq!(
            TagCategory::split_prefixed("artist:wokada"),
            (TagCategory::Artist, "wokada")
        );
        assert_eq!(
            TagCategory::split_prefixed("char:hatsune_miku"),
            (TagCategory::Character, "hatsune_miku")
        );
        assert_eq!(
            TagCategory::split_prefixed("twintails"),
            (TagCategory::General, "twintails")
        );
        assert_eq!(
            TagCategory::split_prefixed("artist:"),
            (TagCategory::General, "artist:")
        );
    }

    #[test]
    fn test_rating_from_code() {
        assert_eq!(Rating::from_code("s"), Some(Rating::Safe));
        assert_eq!(Rating::from_code("Explicit"), Some(Rating::Explicit));
        assert_eq!(Rating::from_code("x"), None);
        assert_eq!(Rating::from_code(""), None);
    }

    #[test]
    fn test_tag_string_counts() {
        let post = Post::builder(1)
            .tag_string("artist:wokada copyright:vocaloid char:hatsune_miku twintails")
            .build();
        assert_eq!(post.tag_count(None), 4);
        assert_eq!(post.tag_count(Some(TagCategory::Artist)), 1);
        assert_eq!(post.tag_count(Some(TagCategory::General)), 1);
        assert!(post.has_tag("hatsune_miku"));
    }

    #[test]
    fn test_comment_bump_ignores_do_not_bump() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let post = Post::builder(1)
            .comment(Comment {
                creator_id: 1,
                created_at: at,
                is_deleted: false,
                do_not_bump_post: true,
            })
            .build();
        assert_eq!(post.last_commented_at(), Some(at));
        assert_eq!(post.last_comment_bumped_at(), None);
    }

    #[test]
    fn test_favgroup_visibility() {
        let group = FavGroupRef {
            id: 1,
            name: "mine".into(),
            creator_id: 7,
            is_public: false,
            post_ids: vec![],
        };
        let owner = ViewerContext::for_user(UserRef::new(7, "owner"));
        let other = ViewerContext::for_user(UserRef::new(8, "other"));
        assert!(group.is_visible_to(&owner));
        assert!(!group.is_visible_to(&other));
        assert!(!group.is_visible_to(&ViewerContext::anonymous()));
    }

    #[test]
    fn test_viewer_permissions() {
        let moderator =
            ViewerContext::for_user(UserRef::new(1, "mod").with_level(UserLevel::Moderator));
        assert!(moderator.is_moderator());
        assert!(moderator.can_approve_posts());

        let member = ViewerContext::for_user(UserRef::new(2, "member"));
        assert!(!member.can_approve_posts());
        assert_eq!(ViewerContext::anonymous().level(), UserLevel::Anonymous);
    }
}
