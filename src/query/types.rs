use chrono::NaiveDate;

use super::error::ParseError;
use super::wildcard::TagPattern;
use crate::model::{DisapprovalReason, PoolCategory, PostId, Rating, TagCategory};

/// A filter built from one metatag clause
///
/// Built once at parse time by the registry; named references (users, pools,
/// favorite groups, saved searches) are still unresolved strings here and are
/// bound to entities by the permission filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Id(RangeCondition<u64>),
    /// Age in seconds
    Age(RangeCondition<i64>),
    Date(RangeCondition<NaiveDate>),
    Favorites(String),
    OrderedFavorites(String),
    Pool(PoolTarget),
    OrderedPool(PoolTarget),
    Parent(ParentTarget),
    Child(Presence),
    FavGroup(String),
    Relation(RelationKind, UserTarget),
    NoteCount(NoteScope, RangeCondition<u64>),
    Commentary(CommentaryFilter),
    /// Aspect ratio in hundredths
    Ratio(RangeCondition<i64>),
    Status(StatusFilter),
    FileType(Vec<String>),
    Embedded(bool),
    TagCount(Option<TagCategory>, RangeCondition<u64>),
    Md5(Vec<String>),
    Source(SourceFilter),
    PixivId(PixivFilter),
    SavedSearch(String),
    Rating(Rating),
    Locked(LockKind),
    Vote(VoteKind, String),
    Disapproved(DisapprovalTarget),
    Width(RangeCondition<u64>),
    Height(RangeCondition<u64>),
    Score(RangeCondition<i64>),
    FavCount(RangeCondition<u64>),
    Mpixels(RangeCondition<f64>),
    FileSize(RangeCondition<u64>),
    Order(String),
    /// Page size; `None` when the value did not parse
    Limit(Option<u32>),
    /// A malformed value; never matches
    Invalid(ParseError),
}

/// Comparison against a single value, an inclusive interval or a list
#[derive(Debug, Clone, PartialEq)]
pub enum RangeCondition<T> {
    Equals(T),
    GreaterThan(T),
    GreaterOrEqual(T),
    LessThan(T),
    LessOrEqual(T),
    Between(T, T),
    AnyOf(Vec<T>),
}

impl<T: PartialOrd> RangeCondition<T> {
    /// Parse the shared numeric grammar, delegating single values to `parse_one`
    ///
    /// Accepts `N`, `N,M,...`, `N..M`, `N...M`, `N..`, `..M`, `>N`, `>=N`, `<N`
    /// and `<=N`. Interval bounds given in reverse are swapped.
    ///
    /// # Errors
    /// Returns `ParseError::InvalidRange` when the shape is wrong, or whatever
    /// `parse_one` reports for an individual value.
    pub fn parse_with<F>(input: &str, parse_one: F) -> Result<Self, ParseError>
    where
        F: Fn(&str) -> Result<T, ParseError>,
    {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseError::InvalidRange(input.to_string()));
        }

        if let Some(rest) = input.strip_prefix(">=") {
            return Ok(Self::GreaterOrEqual(parse_one(rest)?));
        }
        if let Some(rest) = input.strip_prefix("<=") {
            return Ok(Self::LessOrEqual(parse_one(rest)?));
        }
        if let Some(rest) = input.strip_prefix('>') {
            return Ok(Self::GreaterThan(parse_one(rest)?));
        }
        if let Some(rest) = input.strip_prefix('<') {
            return Ok(Self::LessThan(parse_one(rest)?));
        }

        let interval = input
            .split_once("...")
            .or_else(|| input.split_once(".."));
        if let Some((low, high)) = interval {
            return match (low.is_empty(), high.is_empty()) {
                (true, true) => Err(ParseError::InvalidRange(input.to_string())),
                (false, true) => Ok(Self::GreaterOrEqual(parse_one(low)?)),
                (true, false) => Ok(Self::LessOrEqual(parse_one(high)?)),
                (false, false) => {
                    let low = parse_one(low)?;
                    let high = parse_one(high)?;
                    if high < low {
                        Ok(Self::Between(high, low))
                    } else {
                        Ok(Self::Between(low, high))
                    }
                }
            };
        }

        if input.contains(',') {
            let values = input
                .split(',')
                .filter(|part| !part.is_empty())
                .map(&parse_one)
                .collect::<Result<Vec<_>, _>>()?;
            if values.is_empty() {
                return Err(ParseError::InvalidRange(input.to_string()));
            }
            return Ok(Self::AnyOf(values));
        }

        Ok(Self::Equals(parse_one(input)?))
    }

    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        match self {
            Self::Equals(v) => value == v,
            Self::GreaterThan(v) => value > v,
            Self::GreaterOrEqual(v) => value >= v,
            Self::LessThan(v) => value < v,
            Self::LessOrEqual(v) => value <= v,
            Self::Between(low, high) => value >= low && value <= high,
            Self::AnyOf(values) => values.iter().any(|v| v == value),
        }
    }

    /// Convert every bound with `f`
    #[must_use]
    pub fn map<U, F>(self, f: F) -> RangeCondition<U>
    where
        F: Fn(T) -> U,
    {
        match self {
            Self::Equals(v) => RangeCondition::Equals(f(v)),
            Self::GreaterThan(v) => RangeCondition::GreaterThan(f(v)),
            Self::GreaterOrEqual(v) => RangeCondition::GreaterOrEqual(f(v)),
            Self::LessThan(v) => RangeCondition::LessThan(f(v)),
            Self::LessOrEqual(v) => RangeCondition::LessOrEqual(f(v)),
            Self::Between(low, high) => RangeCondition::Between(f(low), f(high)),
            Self::AnyOf(values) => RangeCondition::AnyOf(values.into_iter().map(f).collect()),
        }
    }
}

impl RangeCondition<f64> {
    /// Widen exact values into a ±`fraction` band
    #[must_use]
    pub fn fudged(self, fraction: f64) -> Self {
        match self {
            Self::Equals(v) => Self::Between(v * (1.0 - fraction), v * (1.0 + fraction)),
            other => other,
        }
    }
}

pub(crate) fn parse_unsigned(value: &str) -> Result<u64, ParseError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ParseError::InvalidValue(value.to_string()))
}

pub(crate) fn parse_signed(value: &str) -> Result<i64, ParseError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidValue(value.to_string()))
}

pub(crate) fn parse_float(value: &str) -> Result<f64, ParseError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidValue(value.to_string()))
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ParseError::InvalidDate(value.to_string()))
}

/// Parse a duration such as `3d`, `2mo` or `45` into seconds
pub(crate) fn parse_duration(value: &str) -> Result<i64, ParseError> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (amount, unit) = value.split_at(split);
    let amount = amount
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidDuration(value.to_string()))?;

    let seconds_per_unit = match unit {
        "" | "s" | "sec" | "second" | "seconds" => 1,
        "mi" | "min" | "mins" | "minute" | "minutes" | "m" => 60,
        "h" | "hour" | "hours" => 3_600,
        "d" | "day" | "days" => 86_400,
        "w" | "week" | "weeks" => 7 * 86_400,
        "mo" | "month" | "months" => 30 * 86_400,
        "y" | "year" | "years" => 365 * 86_400,
        _ => return Err(ParseError::InvalidDuration(value.to_string())),
    };

    amount
        .checked_mul(seconds_per_unit)
        .ok_or_else(|| ParseError::InvalidDuration(value.to_string()))
}

/// Parse `W:H` or a decimal ratio into hundredths
pub(crate) fn parse_ratio(value: &str) -> Result<i64, ParseError> {
    let ratio = match value.split_once(':') {
        Some((width, height)) => {
            let width = parse_float(width)?;
            let height = parse_float(height)?;
            if height == 0.0 {
                return Err(ParseError::InvalidValue(value.to_string()));
            }
            width / height
        }
        None => parse_float(value)?,
    };
    Ok(to_hundredths(ratio))
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn to_hundredths(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Parse one file size and report whether it carried a unit
pub(crate) fn parse_file_size(value: &str) -> Result<(u64, bool), ParseError> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(value.len());
    let (amount, unit) = value.split_at(split);
    let amount = amount
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidSize(value.to_string()))?;

    let (multiplier, has_unit) = match unit {
        "" => (1.0, false),
        "b" => (1.0, false),
        "k" | "kb" => (1024.0, true),
        "m" | "mb" => (1024.0 * 1024.0, true),
        _ => return Err(ParseError::InvalidSize(value.to_string())),
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bytes = (amount * multiplier).round() as u64;
    Ok((bytes, has_unit))
}

/// File size range; values given with a `kb`/`mb` unit match within ±5%
pub(crate) fn parse_file_size_range(value: &str) -> Result<RangeCondition<u64>, ParseError> {
    let fuzzy = RangeCondition::parse_with(value, parse_file_size)?;
    Ok(match fuzzy {
        RangeCondition::Equals((bytes, true)) => {
            let band = bytes / 20;
            RangeCondition::Between(bytes - band, bytes + band)
        }
        other => other.map(|(bytes, _)| bytes),
    })
}

/// Presence test shared by several metatags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Any,
    None,
}

impl TryFrom<&str> for Presence {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "any" => Ok(Self::Any),
            "none" => Ok(Self::None),
            _ => Err(ParseError::InvalidValue(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentTarget {
    Any,
    None,
    Post(PostId),
}

impl TryFrom<&str> for ParentTarget {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "any" => Ok(Self::Any),
            "none" => Ok(Self::None),
            _ => Ok(Self::Post(parse_unsigned(value)?)),
        }
    }
}

/// What a `pool:` value refers to before it is resolved
#[derive(Debug, Clone, PartialEq)]
pub enum PoolTarget {
    Any,
    None,
    Category(PoolCategory),
    Id(u64),
    Pattern(TagPattern),
    Name(String),
}

impl TryFrom<&str> for PoolTarget {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = crate::repository::normalize_pool_name(value);
        match normalized.as_str() {
            "" => Err(ParseError::InvalidValue(value.to_string())),
            "any" => Ok(Self::Any),
            "none" => Ok(Self::None),
            "series" => Ok(Self::Category(PoolCategory::Series)),
            "collection" => Ok(Self::Category(PoolCategory::Collection)),
            name if name.bytes().all(|b| b.is_ascii_digit()) => Ok(Self::Id(parse_unsigned(name)?)),
            name if name.contains('*') => Ok(Self::Pattern(TagPattern::new(name)?)),
            name => Ok(Self::Name(name.to_string())),
        }
    }
}

/// Which user relation a relation metatag tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Uploader,
    Approver,
    Commenter,
    Noter,
    CommentaryUpdater,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserTarget {
    Any,
    None,
    Named(String),
}

impl From<&str> for UserTarget {
    fn from(value: &str) -> Self {
        match value {
            "any" => Self::Any,
            "none" => Self::None,
            name => Self::Named(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteScope {
    All,
    Active,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentaryFilter {
    Present,
    Absent,
    Translated,
    Untranslated,
    Text(String),
}

impl CommentaryFilter {
    /// Keywords only apply unquoted; a quoted value is always searched as text
    #[must_use]
    pub fn from_value(value: &str, quoted: bool) -> Self {
        if quoted {
            return Self::Text(value.to_string());
        }
        match value {
            "true" => Self::Present,
            "false" => Self::Absent,
            "translated" => Self::Translated,
            "untranslated" => Self::Untranslated,
            text => Self::Text(text.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Pending,
    Flagged,
    Deleted,
    Banned,
    Active,
    Modqueue,
    Unmoderated,
    Any,
}

impl TryFrom<&str> for StatusFilter {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "flagged" => Ok(Self::Flagged),
            "deleted" => Ok(Self::Deleted),
            "banned" => Ok(Self::Banned),
            "active" => Ok(Self::Active),
            "modqueue" => Ok(Self::Modqueue),
            "unmoderated" => Ok(Self::Unmoderated),
            "any" | "all" => Ok(Self::Any),
            _ => Err(ParseError::InvalidValue(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceFilter {
    None,
    Substring(String),
    Pattern(TagPattern),
}

impl SourceFilter {
    /// `none` is only a keyword when unquoted
    ///
    /// # Errors
    /// Returns `ParseError::InvalidPattern` for a wildcard that cannot be compiled.
    pub fn from_value(value: &str, quoted: bool) -> Result<Self, ParseError> {
        if !quoted && value == "none" {
            Ok(Self::None)
        } else if value.contains('*') {
            Ok(Self::Pattern(TagPattern::new(value)?))
        } else {
            Ok(Self::Substring(value.to_lowercase()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixivFilter {
    Any,
    None,
    Id(u64),
}

impl TryFrom<&str> for PixivFilter {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "any" => Ok(Self::Any),
            "none" => Ok(Self::None),
            _ => Ok(Self::Id(parse_unsigned(value)?)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Rating,
    Note,
    Status,
}

impl TryFrom<&str> for LockKind {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "rating" => Ok(Self::Rating),
            "note" | "notes" => Ok(Self::Note),
            "status" => Ok(Self::Status),
            _ => Err(ParseError::InvalidValue(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisapprovalTarget {
    Any,
    Reason(DisapprovalReason),
    User(String),
}

impl From<&str> for DisapprovalTarget {
    fn from(value: &str) -> Self {
        if value == "any" {
            return Self::Any;
        }
        DisapprovalReason::from_keyword(value)
            .map_or_else(|| Self::User(value.to_string()), Self::Reason)
    }
}
