//! Whole-name wildcard patterns (`*` any run, `?` one character)

use glob::{MatchOptions, Pattern};

use super::error::ParseError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A compiled wildcard matched against complete tag names, pool names or sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPattern {
    source: String,
    pattern: Pattern,
}

impl TagPattern {
    /// Compile a wildcard; every character other than `*` and `?` is literal
    ///
    /// # Errors
    /// Returns `ParseError::InvalidPattern` if the escaped pattern is rejected by `glob`.
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut escaped = String::with_capacity(source.len());
        for c in source.chars() {
            match c {
                '*' | '?' => escaped.push(c),
                _ => escaped.push_str(&Pattern::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }

        let pattern =
            Pattern::new(&escaped).map_err(|e| ParseError::InvalidPattern(format!("{source}: {e}")))?;
        Ok(Self {
            source: source.to_string(),
            pattern,
        })
    }

    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.pattern.matches_with(candidate, MATCH_OPTIONS)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Display for TagPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// A tag body is a wildcard when it has `*`, or has `?` without being made only of `?`
#[must_use]
pub fn is_wildcard(body: &str) -> bool {
    body.contains('*') || (body.contains('?') && !body.chars().all(|c| c == '?'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_matches_runs() {
        let pattern = TagPattern::new("aaa*").unwrap();
        assert!(pattern.matches("aaa"));
        assert!(pattern.matches("aaa_bbb"));
        assert!(!pattern.matches("baaa"));
    }

    #[test]
    fn test_question_mark_matches_one_char() {
        let pattern = TagPattern::new("a?c").unwrap();
        assert!(pattern.matches("abc"));
        assert!(!pattern.matches("ac"));
        assert!(!pattern.matches("abbc"));
    }

    #[test]
    fn test_brackets_and_slashes_are_literal() {
        let pattern = TagPattern::new("fate/stay_night_(*)").unwrap();
        assert!(pattern.matches("fate/stay_night_(anime)"));
        assert!(!pattern.matches("fate/stay_night"));

        let pattern = TagPattern::new("[x]*").unwrap();
        assert!(pattern.matches("[x]_tag"));
        assert!(!pattern.matches("x_tag"));
    }

    #[test]
    fn test_case_insensitive() {
        let pattern = TagPattern::new("*azur*").unwrap();
        assert!(pattern.matches("Azur Lane"));
    }

    #[test]
    fn test_is_wildcard() {
        assert!(is_wildcard("a*"));
        assert!(is_wildcard("a?b"));
        assert!(!is_wildcard("?"));
        assert!(!is_wildcard("??"));
        assert!(!is_wildcard("abc"));
    }
}
