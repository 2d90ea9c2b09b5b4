//! Compiled predicates over posts
//!
//! A [`Predicate`] is the fully resolved form of a query: every named reference
//! has been bound to ids and every viewer check has been applied, so evaluating
//! it needs nothing but the candidate [`Post`].

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::collections::BTreeSet;

use super::pixiv::pixiv_id;
use super::types::{
    CommentaryFilter, LockKind, NoteScope, ParentTarget, PixivFilter, RangeCondition,
    RelationKind, SourceFilter, StatusFilter, VoteKind, to_hundredths,
};
use super::wildcard::TagPattern;
use crate::model::{DisapprovalReason, PoolId, Post, PostId, Rating, TagCategory, UserId};

/// A resolved relation target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationTarget {
    /// The relation exists with some user
    Any,
    User(UserId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisapprovalMatch {
    Any,
    Reason(DisapprovalReason),
    User(UserId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    True,
    False,
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Tag(String),
    Wildcard(TagPattern),
    Id(RangeCondition<u64>),
    Age {
        seconds: RangeCondition<i64>,
        now: DateTime<Utc>,
    },
    Date {
        range: RangeCondition<NaiveDate>,
        offset: FixedOffset,
    },
    FavoritedBy(UserId),
    InPools(BTreeSet<PoolId>),
    HasPool,
    /// Membership in a precomputed id set (favorite groups, saved searches)
    InSet(BTreeSet<PostId>),
    Parent(ParentTarget),
    HasChildren,
    Relation(RelationKind, RelationTarget),
    NoteCount(NoteScope, RangeCondition<u64>),
    Commentary(CommentaryFilter),
    Ratio(RangeCondition<i64>),
    Status(StatusFilter),
    FileType(Vec<String>),
    Embedded(bool),
    TagCount(Option<TagCategory>, RangeCondition<u64>),
    Md5(Vec<String>),
    Source(SourceFilter),
    PixivId(PixivFilter),
    Rating(Rating),
    Locked(LockKind),
    Vote(VoteKind, UserId),
    Disapproved(DisapprovalMatch),
    Width(RangeCondition<u64>),
    Height(RangeCondition<u64>),
    Score(RangeCondition<i64>),
    FavCount(RangeCondition<u64>),
    Mpixels(RangeCondition<f64>),
    FileSize(RangeCondition<u64>),
}

impl Predicate {
    /// Conjunction, flattening nested `And`s and folding constants
    #[must_use]
    pub fn all(predicates: impl IntoIterator<Item = Self>) -> Self {
        let mut parts = Vec::new();
        for predicate in predicates {
            match predicate {
                Self::True => {}
                Self::False => return Self::False,
                Self::And(inner) => parts.extend(inner),
                other => parts.push(other),
            }
        }
        match parts.len() {
            0 => Self::True,
            1 => parts.pop().unwrap_or(Self::True),
            _ => Self::And(parts),
        }
    }

    /// Disjunction, flattening nested `Or`s and folding constants
    #[must_use]
    pub fn any(predicates: impl IntoIterator<Item = Self>) -> Self {
        let mut parts = Vec::new();
        for predicate in predicates {
            match predicate {
                Self::False => {}
                Self::True => return Self::True,
                Self::Or(inner) => parts.extend(inner),
                other => parts.push(other),
            }
        }
        match parts.len() {
            0 => Self::False,
            1 => parts.pop().unwrap_or(Self::False),
            _ => Self::Or(parts),
        }
    }

    /// Logical complement
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }

    /// Literal tags every match must carry; used to narrow candidates by index
    #[must_use]
    pub fn required_tags(&self) -> Vec<&str> {
        match self {
            Self::Tag(tag) => vec![tag.as_str()],
            Self::And(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    Self::Tag(tag) => Some(tag.as_str()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Evaluate against one post
    #[must_use]
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            Self::True => true,
            Self::False => false,
            Self::Not(inner) => !inner.matches(post),
            Self::And(parts) => parts.iter().all(|p| p.matches(post)),
            Self::Or(parts) => parts.iter().any(|p| p.matches(post)),
            Self::Tag(tag) => post.has_tag(tag),
            Self::Wildcard(pattern) => post.tag_names().any(|t| pattern.matches(t)),
            Self::Id(range) => range.contains(&post.id),
            Self::Age { seconds, now } => {
                seconds.contains(&now.signed_duration_since(post.created_at).num_seconds())
            }
            Self::Date { range, offset } => {
                range.contains(&post.created_at.with_timezone(offset).date_naive())
            }
            Self::FavoritedBy(user_id) => post.is_favorited_by(*user_id),
            Self::InPools(pools) => post.pool_ids.iter().any(|id| pools.contains(id)),
            Self::HasPool => !post.pool_ids.is_empty(),
            Self::InSet(ids) => ids.contains(&post.id),
            Self::Parent(target) => match target {
                ParentTarget::Any => post.parent_id.is_some(),
                ParentTarget::None => post.parent_id.is_none(),
                ParentTarget::Post(id) => post.id == *id || post.parent_id == Some(*id),
            },
            Self::HasChildren => post.has_children,
            Self::Relation(kind, target) => matches_relation(post, *kind, *target),
            Self::NoteCount(scope, range) => {
                let count = match scope {
                    NoteScope::All => post.notes.len(),
                    NoteScope::Active => post.active_notes().count(),
                    NoteScope::Deleted => post.notes.iter().filter(|n| !n.is_active).count(),
                };
                range.contains(&(count as u64))
            }
            Self::Commentary(filter) => matches_commentary(post, filter),
            Self::Ratio(range) => range.contains(&to_hundredths(post.aspect_ratio())),
            Self::Status(status) => matches_status(post, *status),
            Self::FileType(exts) => exts.iter().any(|e| e.eq_ignore_ascii_case(&post.file_ext)),
            Self::Embedded(flag) => post.has_embedded_notes == *flag,
            Self::TagCount(category, range) => range.contains(&post.tag_count(*category)),
            Self::Md5(hashes) => hashes.iter().any(|h| h.eq_ignore_ascii_case(&post.md5)),
            Self::Source(filter) => match filter {
                SourceFilter::None => post.source.is_empty(),
                SourceFilter::Substring(needle) => post.source.to_lowercase().contains(needle),
                SourceFilter::Pattern(pattern) => pattern.matches(&post.source),
            },
            Self::PixivId(filter) => {
                let id = pixiv_id(&post.source);
                match filter {
                    PixivFilter::Any => id.is_some(),
                    PixivFilter::None => id.is_none(),
                    PixivFilter::Id(wanted) => id == Some(*wanted),
                }
            }
            Self::Rating(rating) => post.rating == *rating,
            Self::Locked(kind) => match kind {
                LockKind::Rating => post.is_rating_locked,
                LockKind::Note => post.is_note_locked,
                LockKind::Status => post.is_status_locked,
            },
            Self::Vote(kind, user_id) => post.votes.iter().any(|v| {
                v.user_id == *user_id
                    && match kind {
                        VoteKind::Up => v.score > 0,
                        VoteKind::Down => v.score < 0,
                    }
            }),
            Self::Disapproved(target) => post.disapprovals.iter().any(|d| match target {
                DisapprovalMatch::Any => true,
                DisapprovalMatch::Reason(reason) => d.reason == *reason,
                DisapprovalMatch::User(user_id) => d.user_id == *user_id,
            }),
            Self::Width(range) => range.contains(&u64::from(post.image_width)),
            Self::Height(range) => range.contains(&u64::from(post.image_height)),
            Self::Score(range) => range.contains(&post.score),
            Self::FavCount(range) => range.contains(&post.fav_count()),
            Self::Mpixels(range) => range.contains(&post.mpixels()),
            Self::FileSize(range) => range.contains(&post.file_size),
        }
    }
}

fn matches_relation(post: &Post, kind: RelationKind, target: RelationTarget) -> bool {
    let is_target = |user_id: u64| match target {
        RelationTarget::Any => true,
        RelationTarget::User(id) => id == user_id,
    };
    match kind {
        RelationKind::Uploader => is_target(post.uploader_id),
        RelationKind::Approver => post.approver_id.is_some_and(is_target),
        RelationKind::Commenter => post.visible_comments().any(|c| is_target(c.creator_id)),
        RelationKind::Noter => post.active_notes().any(|n| is_target(n.creator_id)),
        RelationKind::CommentaryUpdater => post
            .commentary
            .as_ref()
            .is_some_and(|c| c.updater_ids.iter().any(|id| is_target(*id))),
    }
}

fn matches_commentary(post: &Post, filter: &CommentaryFilter) -> bool {
    let Some(commentary) = post.commentary.as_ref() else {
        return matches!(filter, CommentaryFilter::Absent);
    };
    match filter {
        CommentaryFilter::Present => commentary.has_content(),
        CommentaryFilter::Absent => !commentary.has_content(),
        CommentaryFilter::Translated => commentary.has_translation(),
        CommentaryFilter::Untranslated => {
            commentary.has_original() && !commentary.has_translation()
        }
        CommentaryFilter::Text(needle) => {
            let needle = needle.to_lowercase();
            commentary
                .fields()
                .any(|field| field.to_lowercase().contains(&needle))
        }
    }
}

fn matches_status(post: &Post, status: StatusFilter) -> bool {
    match status {
        StatusFilter::Pending => post.is_pending,
        StatusFilter::Flagged => post.is_flagged,
        StatusFilter::Deleted => post.is_deleted,
        StatusFilter::Banned => post.is_banned,
        StatusFilter::Active => !post.is_pending && !post.is_flagged && !post.is_deleted,
        StatusFilter::Modqueue => post.is_pending || post.is_flagged,
        StatusFilter::Unmoderated => {
            (post.is_pending && post.disapprovals.is_empty())
                || (post.is_flagged && post.flags.iter().any(|f| !f.is_resolved))
        }
        StatusFilter::Any => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Comment, Commentary, PostFlag};
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_all_folds_constants() {
        assert_eq!(Predicate::all([]), Predicate::True);
        assert_eq!(
            Predicate::all([Predicate::True, Predicate::Tag("a".into())]),
            Predicate::Tag("a".into())
        );
        assert_eq!(
            Predicate::all([Predicate::Tag("a".into()), Predicate::False]),
            Predicate::False
        );
    }

    #[test]
    fn test_any_folds_constants() {
        assert_eq!(Predicate::any([]), Predicate::False);
        assert_eq!(
            Predicate::any([Predicate::False, Predicate::Tag("a".into())]),
            Predicate::Tag("a".into())
        );
        assert_eq!(
            Predicate::any([Predicate::Tag("a".into()), Predicate::True]),
            Predicate::True
        );
    }

    #[test]
    fn test_negate_is_involutive() {
        let tag = Predicate::Tag("a".into());
        assert_eq!(tag.clone().negate().negate(), tag);
        assert_eq!(Predicate::False.negate(), Predicate::True);
    }

    #[test]
    fn test_required_tags() {
        let predicate = Predicate::all([
            Predicate::Tag("a".into()),
            Predicate::Tag("b".into()).negate(),
            Predicate::Tag("c".into()),
        ]);
        assert_eq!(predicate.required_tags(), vec!["a", "c"]);
        assert!(Predicate::True.required_tags().is_empty());
    }

    #[test]
    fn test_age_uses_now() {
        let post = Post::builder(1).created_at(at(1, 0)).build();
        let within_day = Predicate::Age {
            seconds: RangeCondition::LessThan(86_400),
            now: at(1, 12),
        };
        let later = Predicate::Age {
            seconds: RangeCondition::LessThan(86_400),
            now: at(3, 0),
        };
        assert!(within_day.matches(&post));
        assert!(!later.matches(&post));
    }

    #[test]
    fn test_date_uses_offset() {
        let post = Post::builder(1).created_at(at(1, 22)).build();
        let date = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        assert!(
            Predicate::Date {
                range: RangeCondition::Equals(date),
                offset: tokyo
            }
            .matches(&post)
        );
        assert!(
            !Predicate::Date {
                range: RangeCondition::Equals(date),
                offset: utc
            }
            .matches(&post)
        );
    }

    #[test]
    fn test_parent_includes_self() {
        let parent = Post::builder(1).build();
        let child = Post::builder(2).parent(1).build();
        let other = Post::builder(3).build();
        let predicate = Predicate::Parent(ParentTarget::Post(1));
        assert!(predicate.matches(&parent));
        assert!(predicate.matches(&child));
        assert!(!predicate.matches(&other));
    }

    #[test]
    fn test_commenter_skips_deleted_comments() {
        let post = Post::builder(1)
            .comment(Comment {
                creator_id: 5,
                created_at: at(1, 0),
                is_deleted: true,
                do_not_bump_post: false,
            })
            .build();
        assert!(!Predicate::Relation(RelationKind::Commenter, RelationTarget::Any).matches(&post));
        assert!(
            !Predicate::Relation(RelationKind::Commenter, RelationTarget::User(5)).matches(&post)
        );
    }

    #[test]
    fn test_status_table() {
        let active_banned = Post::builder(1).banned().build();
        let pending = Post::builder(2).pending().build();
        let deleted = Post::builder(3).deleted().build();
        assert!(matches_status(&active_banned, StatusFilter::Active));
        assert!(matches_status(&active_banned, StatusFilter::Banned));
        assert!(!matches_status(&pending, StatusFilter::Active));
        assert!(matches_status(&pending, StatusFilter::Modqueue));
        assert!(!matches_status(&deleted, StatusFilter::Active));
        assert!(matches_status(&deleted, StatusFilter::Any));
    }

    #[test]
    fn test_unmoderated() {
        let pending = Post::builder(1).pending().build();
        let disapproved = Post::builder(2)
            .pending()
            .disapproval(9, DisapprovalReason::Disinterest)
            .build();
        let flagged = Post::builder(3)
            .flagged()
            .flag(PostFlag {
                creator_id: 4,
                reason: "bad".into(),
                is_resolved: false,
            })
            .build();
        let resolved = Post::builder(4)
            .flagged()
            .flag(PostFlag {
                creator_id: 4,
                reason: "bad".into(),
                is_resolved: true,
            })
            .build();
        assert!(matches_status(&pending, StatusFilter::Unmoderated));
        assert!(!matches_status(&disapproved, StatusFilter::Unmoderated));
        assert!(matches_status(&flagged, StatusFilter::Unmoderated));
        assert!(!matches_status(&resolved, StatusFilter::Unmoderated));
    }

    #[test]
    fn test_commentary_states() {
        let translated = Post::builder(1)
            .commentary(Commentary {
                original_title: "うみ".into(),
                translated_title: "Azur Lane".into(),
                ..Commentary::default()
            })
            .build();
        let untranslated = Post::builder(2)
            .commentary(Commentary {
                original_title: "うみ".into(),
                ..Commentary::default()
            })
            .build();
        let blank = Post::builder(3).commentary(Commentary::default()).build();
        let none = Post::builder(4).build();

        let present = Predicate::Commentary(CommentaryFilter::Present);
        assert!(present.matches(&translated));
        assert!(!present.matches(&blank));
        assert!(!present.matches(&none));

        let untranslated_filter = Predicate::Commentary(CommentaryFilter::Untranslated);
        assert!(untranslated_filter.matches(&untranslated));
        assert!(!untranslated_filter.matches(&translated));
        assert!(!untranslated_filter.matches(&blank));

        let text = Predicate::Commentary(CommentaryFilter::Text("azur".into()));
        assert!(text.matches(&translated));
        assert!(!text.matches(&untranslated));

        let absent = Predicate::Commentary(CommentaryFilter::Absent);
        assert!(absent.matches(&blank));
        assert!(absent.matches(&none));
    }

    #[test]
    fn test_ratio_rounds_to_hundredths() {
        let post = Post::builder(1).dimensions(1000, 750).build();
        assert!(Predicate::Ratio(RangeCondition::Equals(133)).matches(&post));
    }
}
