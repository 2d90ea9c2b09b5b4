//! The fixed metatag registry
//!
//! Every recognised `<name>:<value>` metatag maps to a builder function that
//! turns the raw value into a typed [`Filter`]. A value that does not fit its
//! grammar becomes [`Filter::Invalid`], which compiles to a predicate matching
//! nothing; building never fails.

use super::error::ParseError;
use super::types::{
    CommentaryFilter, DisapprovalTarget, Filter, LockKind, NoteScope, ParentTarget, PixivFilter,
    PoolTarget, Presence, RangeCondition, RelationKind, SourceFilter, StatusFilter, UserTarget,
    VoteKind, parse_date, parse_duration, parse_file_size_range, parse_float, parse_ratio,
    parse_signed, parse_unsigned,
};
use crate::model::{Rating, TagCategory};

/// The value half of a metatag term
#[derive(Debug, Clone, Copy)]
pub struct MetatagValue<'a> {
    pub raw: &'a str,
    pub quoted: bool,
}

type Builder = fn(MetatagValue<'_>) -> Result<Filter, ParseError>;

/// A registry entry: the names a metatag answers to and its builder
pub struct MetatagSpec {
    /// First name is canonical; the rest are synonyms
    names: &'static [&'static str],
    builder: Builder,
}

impl MetatagSpec {
    const fn new(names: &'static [&'static str], builder: Builder) -> Self {
        Self { names, builder }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.names[0]
    }

    /// Build the filter for `value`, degrading malformed values to `Filter::Invalid`
    #[must_use]
    pub fn build(&self, value: MetatagValue<'_>) -> Filter {
        (self.builder)(value).unwrap_or_else(|e| {
            log::debug!("{}:{} is malformed ({e}), matching nothing", self.name(), value.raw);
            Filter::Invalid(e)
        })
    }
}

impl std::fmt::Debug for MetatagSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetatagSpec").field("names", &self.names).finish()
    }
}

static REGISTRY: &[MetatagSpec] = &[
    MetatagSpec::new(&["id"], |v| {
        Ok(Filter::Id(RangeCondition::parse_with(v.raw, parse_unsigned)?))
    }),
    MetatagSpec::new(&["age"], |v| {
        Ok(Filter::Age(RangeCondition::parse_with(v.raw, parse_duration)?))
    }),
    MetatagSpec::new(&["date"], |v| {
        Ok(Filter::Date(RangeCondition::parse_with(v.raw, parse_date)?))
    }),
    MetatagSpec::new(&["fav"], |v| Ok(Filter::Favorites(v.raw.to_string()))),
    MetatagSpec::new(&["ordfav"], |v| {
        Ok(Filter::OrderedFavorites(v.raw.to_string()))
    }),
    MetatagSpec::new(&["pool"], |v| Ok(Filter::Pool(PoolTarget::try_from(v.raw)?))),
    MetatagSpec::new(&["ordpool"], |v| {
        Ok(Filter::OrderedPool(PoolTarget::try_from(v.raw)?))
    }),
    MetatagSpec::new(&["parent"], |v| {
        Ok(Filter::Parent(ParentTarget::try_from(v.raw)?))
    }),
    MetatagSpec::new(&["child"], |v| Ok(Filter::Child(Presence::try_from(v.raw)?))),
    MetatagSpec::new(&["favgroup"], |v| Ok(Filter::FavGroup(v.raw.to_string()))),
    MetatagSpec::new(&["user"], |v| {
        Ok(Filter::Relation(RelationKind::Uploader, UserTarget::from(v.raw)))
    }),
    MetatagSpec::new(&["approver"], |v| {
        Ok(Filter::Relation(RelationKind::Approver, UserTarget::from(v.raw)))
    }),
    MetatagSpec::new(&["commenter", "comm"], |v| {
        Ok(Filter::Relation(RelationKind::Commenter, UserTarget::from(v.raw)))
    }),
    MetatagSpec::new(&["noter"], |v| {
        Ok(Filter::Relation(RelationKind::Noter, UserTarget::from(v.raw)))
    }),
    MetatagSpec::new(&["commentaryupdater", "artcomm"], |v| {
        Ok(Filter::Relation(
            RelationKind::CommentaryUpdater,
            UserTarget::from(v.raw),
        ))
    }),
    MetatagSpec::new(&["note_count", "notes"], |v| note_count(NoteScope::All, v)),
    MetatagSpec::new(&["active_note_count", "active_notes"], |v| {
        note_count(NoteScope::Active, v)
    }),
    MetatagSpec::new(&["deleted_note_count", "deleted_notes"], |v| {
        note_count(NoteScope::Deleted, v)
    }),
    MetatagSpec::new(&["commentary"], |v| {
        Ok(Filter::Commentary(CommentaryFilter::from_value(v.raw, v.quoted)))
    }),
    MetatagSpec::new(&["ratio"], |v| {
        Ok(Filter::Ratio(RangeCondition::parse_with(v.raw, parse_ratio)?))
    }),
    MetatagSpec::new(&["status"], |v| {
        Ok(Filter::Status(StatusFilter::try_from(v.raw)?))
    }),
    MetatagSpec::new(&["filetype"], |v| Ok(Filter::FileType(list(v.raw)?))),
    MetatagSpec::new(&["embedded"], |v| match v.raw {
        "true" => Ok(Filter::Embedded(true)),
        "false" => Ok(Filter::Embedded(false)),
        other => Err(ParseError::InvalidValue(other.to_string())),
    }),
    MetatagSpec::new(&["tagcount"], |v| tag_count(None, v)),
    MetatagSpec::new(&["gentags"], |v| tag_count(Some(TagCategory::General), v)),
    MetatagSpec::new(&["arttags"], |v| tag_count(Some(TagCategory::Artist), v)),
    MetatagSpec::new(&["copytags"], |v| tag_count(Some(TagCategory::Copyright), v)),
    MetatagSpec::new(&["chartags"], |v| tag_count(Some(TagCategory::Character), v)),
    MetatagSpec::new(&["md5"], |v| Ok(Filter::Md5(list(v.raw)?))),
    MetatagSpec::new(&["source"], |v| {
        Ok(Filter::Source(SourceFilter::from_value(v.raw, v.quoted)?))
    }),
    MetatagSpec::new(&["pixiv_id", "pixiv"], |v| {
        Ok(Filter::PixivId(PixivFilter::try_from(v.raw)?))
    }),
    MetatagSpec::new(&["search"], |v| Ok(Filter::SavedSearch(v.raw.to_string()))),
    MetatagSpec::new(&["rating"], |v| {
        Rating::from_code(v.raw)
            .map(Filter::Rating)
            .ok_or_else(|| ParseError::InvalidValue(v.raw.to_string()))
    }),
    MetatagSpec::new(&["locked"], |v| Ok(Filter::Locked(LockKind::try_from(v.raw)?))),
    MetatagSpec::new(&["upvote"], |v| Ok(Filter::Vote(VoteKind::Up, v.raw.to_string()))),
    MetatagSpec::new(&["downvote"], |v| {
        Ok(Filter::Vote(VoteKind::Down, v.raw.to_string()))
    }),
    MetatagSpec::new(&["disapproved"], |v| {
        Ok(Filter::Disapproved(DisapprovalTarget::from(v.raw)))
    }),
    MetatagSpec::new(&["width"], |v| {
        Ok(Filter::Width(RangeCondition::parse_with(v.raw, parse_unsigned)?))
    }),
    MetatagSpec::new(&["height"], |v| {
        Ok(Filter::Height(RangeCondition::parse_with(v.raw, parse_unsigned)?))
    }),
    MetatagSpec::new(&["score"], |v| {
        Ok(Filter::Score(RangeCondition::parse_with(v.raw, parse_signed)?))
    }),
    MetatagSpec::new(&["favcount"], |v| {
        Ok(Filter::FavCount(RangeCondition::parse_with(v.raw, parse_unsigned)?))
    }),
    MetatagSpec::new(&["mpixels"], |v| {
        Ok(Filter::Mpixels(
            RangeCondition::parse_with(v.raw, parse_float)?.fudged(0.05),
        ))
    }),
    MetatagSpec::new(&["filesize"], |v| {
        Ok(Filter::FileSize(parse_file_size_range(v.raw)?))
    }),
    MetatagSpec::new(&["order"], |v| Ok(Filter::Order(v.raw.to_string()))),
    MetatagSpec::new(&["limit"], |v| Ok(Filter::Limit(v.raw.trim().parse().ok()))),
];

fn note_count(scope: NoteScope, value: MetatagValue<'_>) -> Result<Filter, ParseError> {
    Ok(Filter::NoteCount(
        scope,
        RangeCondition::parse_with(value.raw, parse_unsigned)?,
    ))
}

fn tag_count(
    category: Option<TagCategory>,
    value: MetatagValue<'_>,
) -> Result<Filter, ParseError> {
    Ok(Filter::TagCount(
        category,
        RangeCondition::parse_with(value.raw, parse_unsigned)?,
    ))
}

fn list(value: &str) -> Result<Vec<String>, ParseError> {
    let items: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_lowercase)
        .collect();
    if items.is_empty() {
        Err(ParseError::InvalidValue(value.to_string()))
    } else {
        Ok(items)
    }
}

/// Look up a metatag by any of its names, ignoring case
#[must_use]
pub fn lookup(name: &str) -> Option<&'static MetatagSpec> {
    REGISTRY
        .iter()
        .find(|spec| spec.names.iter().any(|n| n.eq_ignore_ascii_case(name)))
}

/// Canonical names of every registered metatag
pub fn names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(MetatagSpec::name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(name: &str, raw: &str) -> Filter {
        lookup(name).unwrap().build(MetatagValue { raw, quoted: false })
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(lookup("ID").map(MetatagSpec::name), Some("id"));
        assert!(lookup("nonexistent").is_none());
    }

    #[test]
    fn test_synonyms_share_a_canonical_name() {
        assert_eq!(lookup("notes").map(MetatagSpec::name), Some("note_count"));
        assert_eq!(
            lookup("artcomm").map(MetatagSpec::name),
            Some("commentaryupdater")
        );
        assert_eq!(lookup("pixiv").map(MetatagSpec::name), Some("pixiv_id"));
    }

    #[test]
    fn test_names_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for spec in REGISTRY {
            for name in spec.names {
                assert!(seen.insert(*name), "duplicate metatag name {name}");
            }
        }
    }

    #[test]
    fn test_malformed_values_degrade() {
        assert!(matches!(build("id", "abc"), Filter::Invalid(_)));
        assert!(matches!(build("status", "garbage"), Filter::Invalid(_)));
        assert!(matches!(build("embedded", "maybe"), Filter::Invalid(_)));
        assert!(matches!(build("rating", "x"), Filter::Invalid(_)));
        assert!(matches!(build("locked", "everything"), Filter::Invalid(_)));
        assert!(matches!(build("child", "garbage"), Filter::Invalid(_)));
        assert!(matches!(build("parent", "garbage"), Filter::Invalid(_)));
    }

    #[test]
    fn test_rating_uses_first_letter() {
        assert_eq!(build("rating", "safe"), Filter::Rating(Rating::Safe));
        assert_eq!(build("rating", "e"), Filter::Rating(Rating::Explicit));
    }

    #[test]
    fn test_limit_never_invalid() {
        assert_eq!(build("limit", "10"), Filter::Limit(Some(10)));
        assert_eq!(build("limit", "many"), Filter::Limit(None));
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            build("filetype", "PNG,jpg"),
            Filter::FileType(vec!["png".to_string(), "jpg".to_string()])
        );
        assert!(matches!(build("md5", ","), Filter::Invalid(_)));
    }

    #[test]
    fn test_quoted_source_keeps_keyword_as_text() {
        let spec = lookup("source").unwrap();
        assert_eq!(
            spec.build(MetatagValue {
                raw: "none",
                quoted: true
            }),
            Filter::Source(SourceFilter::Substring("none".to_string()))
        );
        assert_eq!(build("source", "none"), Filter::Source(SourceFilter::None));
    }
}
