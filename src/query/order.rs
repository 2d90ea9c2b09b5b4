//! Result ordering: `order:`, `ordfav:` and `ordpool:`

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use super::parser::{ParsedQuery, Polarity};
use super::predicate::Predicate;
use super::types::{Filter, RangeCondition};
use crate::model::{Post, PostId, TagCategory, UserId};

/// 2005-05-24T00:00:00Z, the epoch `order:rank` measures post age from
const RANK_EPOCH: i64 = 1_116_892_800;
const RANK_DECAY_SECONDS: f64 = 35_000.0;
const RANK_WINDOW_SECONDS: i64 = 2 * 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Id,
    Score,
    FavCount,
    /// Last update time
    Change,
    /// Last comment time
    Comment,
    /// Last bumping comment time
    CommentBumped,
    /// Last note time
    Note,
    /// Commentary update time
    Artcomm,
    Mpixels,
    /// Width over height
    Aspect,
    FileSize,
    TagCount(Option<TagCategory>),
    NoteCount,
    Rank,
    /// When the given user favorited the post
    FavoritedAt(UserId),
    /// A pool's stored sequence; may repeat posts
    PoolSequence(Vec<PostId>),
}

impl SortField {
    /// Parse a field name with its natural direction
    fn from_name(name: &str) -> Option<(Self, Direction)> {
        let field = match name {
            "id" => return Some((Self::Id, Direction::Asc)),
            "portrait" => return Some((Self::Aspect, Direction::Asc)),
            "landscape" => return Some((Self::Aspect, Direction::Desc)),
            "score" => Self::Score,
            "favcount" => Self::FavCount,
            "change" => Self::Change,
            "comment" => Self::Comment,
            "comment_bumped" => Self::CommentBumped,
            "note" => Self::Note,
            "artcomm" => Self::Artcomm,
            "mpixels" => Self::Mpixels,
            "filesize" => Self::FileSize,
            "tagcount" => Self::TagCount(None),
            "gentags" => Self::TagCount(Some(TagCategory::General)),
            "arttags" => Self::TagCount(Some(TagCategory::Artist)),
            "chartags" => Self::TagCount(Some(TagCategory::Character)),
            "copytags" => Self::TagCount(Some(TagCategory::Copyright)),
            "note_count" | "notes" => Self::NoteCount,
            "rank" => Self::Rank,
            _ => return None,
        };
        Some((field, Direction::Desc))
    }

    /// Sort key for a post; `None` sorts as the smallest value
    #[allow(clippy::cast_precision_loss)]
    fn key(&self, post: &Post) -> Option<f64> {
        let timestamp = |at: Option<DateTime<Utc>>| at.map(|t| t.timestamp_micros() as f64);
        match self {
            Self::Id => Some(post.id as f64),
            Self::Score => Some(post.score as f64),
            Self::FavCount => Some(post.fav_count() as f64),
            Self::Change => timestamp(post.updated_at),
            Self::Comment => timestamp(post.last_commented_at()),
            Self::CommentBumped => timestamp(post.last_comment_bumped_at()),
            Self::Note => timestamp(post.last_noted_at()),
            Self::Artcomm => timestamp(post.commentary.as_ref().and_then(|c| c.updated_at)),
            Self::Mpixels => Some(post.mpixels()),
            Self::Aspect => Some(post.aspect_ratio()),
            Self::FileSize => Some(post.file_size as f64),
            Self::TagCount(category) => Some(post.tag_count(*category) as f64),
            Self::NoteCount => Some(post.notes.len() as f64),
            Self::Rank => Some(rank_key(post)),
            Self::FavoritedAt(user_id) => post.favorite_id(*user_id).map(|id| id as f64),
            Self::PoolSequence(_) => None,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn rank_key(post: &Post) -> f64 {
    let score = post.score.max(1) as f64;
    score.log(3.0) + (post.created_at.timestamp() - RANK_EPOCH) as f64 / RANK_DECAY_SECONDS
}

/// A field and the direction to sort it in
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: Direction,
}

impl SortSpec {
    #[must_use]
    pub const fn new(field: SortField, direction: Direction) -> Self {
        Self { field, direction }
    }

    /// Parse an `order:` value such as `score`, `id_desc` or `portrait`
    ///
    /// `_asc` and `_desc` suffixes override the field's natural direction.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.to_lowercase();
        if let Some(field) = value.strip_suffix("_asc") {
            let (field, _) = SortField::from_name(field)?;
            return Some(Self::new(field, Direction::Asc));
        }
        if let Some(field) = value.strip_suffix("_desc") {
            let (field, _) = SortField::from_name(field)?;
            return Some(Self::new(field, Direction::Desc));
        }
        let (field, direction) = SortField::from_name(&value)?;
        Some(Self::new(field, direction))
    }

    /// Compare two posts; missing keys sort last when descending, ties break by id
    #[must_use]
    pub fn compare(&self, a: &Post, b: &Post) -> Ordering {
        let ordering = match (self.field.key(a), self.field.key(b)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
        }
        .then_with(|| a.id.cmp(&b.id));

        match self.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }

    #[must_use]
    pub fn pool_sequence(&self) -> Option<&[PostId]> {
        match &self.field {
            SortField::PoolSequence(ids) => Some(ids),
            _ => None,
        }
    }
}

impl std::fmt::Display for SortSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let direction = match self.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        match &self.field {
            SortField::PoolSequence(ids) => write!(f, "pool order ({} entries)", ids.len()),
            SortField::FavoritedAt(user_id) => write!(f, "favorited by #{user_id} {direction}"),
            field => write!(f, "{field:?} {direction}"),
        }
    }
}

/// The outcome of order resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOrder {
    pub sort: SortSpec,
    /// Extra requirement the ordering imposes (`order:rank`)
    pub filter: Option<Predicate>,
}

/// Picks the ordering for a query
///
/// An `ordfav:`/`ordpool:` ordering resolved by the permission filter takes
/// precedence; otherwise the last recognised `order:` clause that is not
/// excluded applies, and unknown values are ignored.
#[derive(Debug, Clone, Copy)]
pub struct OrderResolver {
    now: DateTime<Utc>,
}

impl OrderResolver {
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    #[must_use]
    pub fn resolve(&self, query: &ParsedQuery, referenced: Option<SortSpec>) -> ResolvedOrder {
        let sort = referenced
            .or_else(|| {
                query
                    .metatags("order")
                    .filter(|(polarity, _)| *polarity != Polarity::Excluded)
                    .filter_map(|(_, filter)| match filter {
                        Filter::Order(value) => {
                            let spec = SortSpec::parse(value);
                            if spec.is_none() {
                                log::debug!("ignoring unknown order:{value}");
                            }
                            spec
                        }
                        _ => None,
                    })
                    .last()
            })
            .unwrap_or_default();

        let filter = (sort.field == SortField::Rank).then(|| {
            Predicate::all([
                Predicate::Score(RangeCondition::GreaterThan(0)),
                Predicate::Age {
                    seconds: RangeCondition::LessThan(RANK_WINDOW_SECONDS),
                    now: self.now,
                },
            ])
        });

        log::debug!("resolved ordering: {sort}");
        ResolvedOrder { sort, filter }
    }
}
