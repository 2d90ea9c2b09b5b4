//! Splits raw query strings into prefixed terms
//!
//! Terms are separated by whitespace. A `"` or `'` opening at the start of a
//! term, or directly after a metatag's `:`, groups everything up to a closing
//! partner that ends a term, so `source:"a b"` is one term. Any other quote is
//! an ordinary character, so `'` and `don't` stay separate tags.

/// Structural prefix of a term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Prefix {
    #[default]
    None,
    /// `-tag`
    Exclude,
    /// `~tag`
    Optional,
}

impl Prefix {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Exclude => "-",
            Self::Optional => "~",
        }
    }
}

/// One whitespace-delimited unit of a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub prefix: Prefix,
    /// Lowercased body with quotes removed
    pub body: String,
    /// Whether any part of the body was quoted
    pub quoted: bool,
}

impl Term {
    #[must_use]
    pub fn new(prefix: Prefix, body: impl Into<String>) -> Self {
        Self {
            prefix,
            body: body.into(),
            quoted: false,
        }
    }

    /// Render the term back into query syntax, re-quoting metatag values that contain spaces
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let body = match self.body.split_once(':') {
            Some((name, value)) if value.contains(char::is_whitespace) => {
                format!("{name}:\"{value}\"")
            }
            _ if self.body.contains(char::is_whitespace) => format!("\"{}\"", self.body),
            _ => self.body.clone(),
        };
        format!("{}{body}", self.prefix.as_str())
    }
}

/// Split a query into terms, keeping order and duplicates
///
/// Bodies are lowercased; a bare `-` or `~` is dropped.
#[must_use]
pub fn split_query(input: &str) -> Vec<Term> {
    let chars: Vec<char> = input.chars().collect();
    let mut terms = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        let mut raw = String::new();
        let mut quoted = false;
        while i < chars.len() && !chars[i].is_whitespace() {
            let c = chars[i];
            if (c == '"' || c == '\'')
                && opens_quote(&raw)
                && let Some(close) = closing_quote(&chars, i)
            {
                raw.extend(&chars[i + 1..close]);
                quoted = true;
                i = close + 1;
                continue;
            }
            raw.push(c);
            i += 1;
        }

        if let Some(term) = make_term(&raw, quoted) {
            terms.push(term);
        }
    }

    terms
}

fn opens_quote(so_far: &str) -> bool {
    so_far.is_empty() || so_far == "-" || so_far == "~" || so_far.ends_with(':')
}

/// Index of the quote closing the one at `open`
///
/// The opening quote must be followed by a non-space character, and the
/// closing quote must end the term.
fn closing_quote(chars: &[char], open: usize) -> Option<usize> {
    let quote = chars[open];
    if chars.get(open + 1).is_none_or(|c| c.is_whitespace()) {
        return None;
    }
    (open + 1..chars.len()).find(|&j| {
        chars[j] == quote && chars.get(j + 1).is_none_or(|c| c.is_whitespace())
    })
}

fn make_term(raw: &str, quoted: bool) -> Option<Term> {
    let (prefix, body) = if let Some(rest) = raw.strip_prefix('-') {
        (Prefix::Exclude, rest)
    } else if let Some(rest) = raw.strip_prefix('~') {
        (Prefix::Optional, rest)
    } else {
        (Prefix::None, raw)
    };

    if body.is_empty() {
        log::trace!("dropping bare prefix term {raw:?}");
        return None;
    }

    Some(Term {
        prefix,
        body: body.to_lowercase(),
        quoted,
    })
}
