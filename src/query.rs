//! Query normalization: unicode folding, delimiter tokenization, and
//! trailing-prefix detection.
//!
//! Folding is NFD decomposition with combining marks stripped and the result
//! lowercased, so "Škoda", "skoda" and "SKODA" normalize identically. The
//! trailing token becomes the prefix whenever the raw query does not end on a
//! delimiter: the user is still typing it.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::interface::MAX_TOKENS;

/// A normalized query: complete tokens plus the optional trailing prefix.
/// An empty `prefix` means the query ended on a delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryTokens {
    pub tokens: Vec<String>,
    pub prefix: String,
}

impl QueryTokens {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.prefix.is_empty()
    }
}

/// Delimiter predicate: whitespace, punctuation, and common separators.
pub(crate) fn is_delimiter(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            ',' | '.'
                | ';'
                | ':'
                | '!'
                | '?'
                | '"'
                | '\''
                | '`'
                | '('
                | ')'
                | '['
                | ']'
                | '{'
                | '}'
                | '<'
                | '>'
                | '-'
                | '_'
                | '/'
                | '\\'
                | '&'
                | '+'
                | '#'
                | '*'
                | '|'
                | '~'
                | '='
                | '@'
        )
}

/// Case-fold and strip diacritical marks. Idempotent.
pub fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalize a raw query into at most [`MAX_TOKENS`] folded tokens plus the
/// optional prefix. Deterministic; empty input yields the empty value.
pub fn normalize_query(raw: &str) -> QueryTokens {
    let folded = fold(raw);

    let mut tokens: Vec<String> = folded
        .split(is_delimiter)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    let mut prefix = String::new();
    let ends_on_delimiter = raw.chars().next_back().map_or(true, is_delimiter);
    if !tokens.is_empty() && !ends_on_delimiter {
        prefix = tokens.pop().unwrap();
    }

    tokens.truncate(MAX_TOKENS);

    QueryTokens { tokens, prefix }
}
