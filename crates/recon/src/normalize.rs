//! Key normalization and title tokenization.
//!
//! Everything here is pure: the same text always produces the same key or
//! token set, and nothing is cached between calls.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Words that carry no product identity in catalog titles.
pub const STOPWORDS: &[&str] = &[
    "and", "the", "for", "with", "from", "this", "that", "are", "was", "you", "your", "our", "all",
    "new", "per", "its", "into", "not", "but", "has", "have", "will",
];

/// Minimum token length kept by default (tokens must be longer than 2 chars).
pub const DEFAULT_MIN_TOKEN_LEN: usize = 3;

/// Lowercase, `[a-z0-9]`-only form of an identifier or name.
///
/// The empty key is a valid value but never participates in matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalize free text into a comparable key.
///
/// `"HMH-100"` and `"hmh 100"` both become `"hmh100"`.
pub fn normalize(text: &str) -> NormalizedKey {
    let key = text
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();
    NormalizedKey(key)
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// Tokenizer settings. The default keeps tokens of 3+ chars minus [`STOPWORDS`].
#[derive(Debug, Clone)]
pub struct TokenRules {
    pub min_len: usize,
    pub extra_stopwords: Vec<String>,
}

impl Default for TokenRules {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_MIN_TOKEN_LEN,
            extra_stopwords: Vec::new(),
        }
    }
}

impl TokenRules {
    fn is_stopword(&self, token: &str) -> bool {
        STOPWORDS.contains(&token) || self.extra_stopwords.iter().any(|w| w == token)
    }
}

/// Set of lowercase word tokens derived from a display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TokenSet(BTreeSet<String>);

impl TokenSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn intersection_len(&self, other: &TokenSet) -> usize {
        self.0.intersection(&other.0).count()
    }
}

impl<S: Into<String>> FromIterator<S> for TokenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Split `text` on anything that is not a letter or digit, lowercase, then
/// drop short tokens and stopwords.
pub fn tokenize(text: &str, rules: &TokenRules) -> TokenSet {
    let lower = text.to_lowercase();
    let tokens = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= rules.min_len)
        .filter(|t| !rules.is_stopword(t))
        .map(str::to_string)
        .collect();
    TokenSet(tokens)
}

// ---------------------------------------------------------------------------
// Filenames
// ---------------------------------------------------------------------------

/// Reduce a path or URL to the part that identifies the image.
///
/// Drops the directory, query string/fragment and extension, then strips
/// WordPress resize suffixes (`-300x300`, `-scaled`) so that
/// `.../Big-Bud-1L-300x300.jpg?ver=2` and `big-bud-1l.png` share a stem.
pub fn filename_stem(text: &str) -> &str {
    let trimmed = text.trim();
    let without_query = trimmed.split(['?', '#']).next().unwrap_or("");
    let name = without_query
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(without_query);

    let mut stem = match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    };

    loop {
        let before = stem;
        if let Some(rest) = stem.strip_suffix("-scaled") {
            stem = rest;
        }
        stem = strip_dimension_suffix(stem);
        if stem == before {
            return stem;
        }
    }
}

/// Strip one trailing `-<digits>x<digits>` group.
fn strip_dimension_suffix(stem: &str) -> &str {
    let Some(dash) = stem.rfind('-') else {
        return stem;
    };
    let suffix = &stem[dash + 1..];
    let Some((w, h)) = suffix.split_once('x') else {
        return stem;
    };
    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if dash > 0 && is_digits(w) && is_digits(h) {
        &stem[..dash]
    } else {
        stem
    }
}
