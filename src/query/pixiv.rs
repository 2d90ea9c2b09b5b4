//! Pixiv illustration ids recovered from post source URLs

use regex::Regex;
use std::sync::LazyLock;

/// Source URL shapes that carry an illustration id in their first capture group
const SOURCE_PATTERNS: &[&str] = &[
    // member_illust.php?mode=medium&illust_id=N
    r"(?i)^https?://(?:www\.)?pixiv\.net/member_illust\.php\?(?:[^#]*&)?illust_id=(\d+)",
    // i1.pixiv.net/img123/img/artist-name/N.png, optionally _p3 or _s suffixed
    r"(?i)^https?://[^/]+\.pixiv\.net/img[^/]*/img/[^/]+/(\d+)(?:_[a-z0-9]+)*\.[a-z0-9]+(?:\?.*)?$",
    // img-inf, img-original and img-master under a /YYYY/MM/DD/hh/mm/ss/ path
    r"(?i)^https?://[^/]+\.(?:pixiv\.net|pximg\.net)/(?:c/[^/]+/)?img-(?:inf|original|master)/img/(?:\d+/){6}(\d+)(?:_[a-z0-9]+)*\.[a-z0-9]+(?:\?.*)?$",
];

static SOURCE_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SOURCE_PATTERNS
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Extract the illustration id from a Pixiv source URL
#[must_use]
pub fn pixiv_id(source: &str) -> Option<u64> {
    SOURCE_REGEXES.iter().find_map(|regex| {
        regex
            .captures(source)
            .and_then(|captures| captures.get(1))
            .and_then(|id| id.as_str().parse().ok())
    })
}
