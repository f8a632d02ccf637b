//! Keyword search terms
//!
//! A query matches book titles and saga names as a whole phrase, and authors
//! token by token (every token must appear in the first or last name).
//! Matching runs against stored lower-cased keys, so case folding is the same
//! for every character on every backend.

use std::collections::HashSet;
use std::hash::Hash;

/// Normalized search input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerms {
    /// Whole query, trimmed and lower-cased; inner whitespace is kept
    pub phrase: String,
    /// Whitespace separated tokens of the phrase
    pub tokens: Vec<String>,
}

/// Lower-cased form of a name or title stored for search
pub fn search_key(text: &str) -> String {
    text.trim().to_lowercase()
}

impl SearchTerms {
    /// Parse a raw query; `None` for an empty or blank query
    pub fn parse(query: &str) -> Option<Self> {
        let phrase = search_key(query);
        if phrase.is_empty() {
            return None;
        }
        let tokens = phrase.split_whitespace().map(String::from).collect();
        Some(Self { phrase, tokens })
    }

    /// LIKE pattern for the whole phrase
    pub fn phrase_pattern(&self) -> String {
        contains_pattern(&self.phrase)
    }

    /// LIKE patterns for each token
    pub fn token_patterns(&self) -> Vec<String> {
        self.tokens.iter().map(|t| contains_pattern(t)).collect()
    }
}

/// Escape character used in LIKE patterns
pub const LIKE_ESCAPE: char = '\\';

/// `%value%` with LIKE wildcards in `value` escaped
pub fn contains_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Concatenate groups, keeping only the first item for each key
pub fn union_by_key<T, K, F>(groups: Vec<Vec<T>>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    groups
        .into_iter()
        .flatten()
        .filter(|item| seen.insert(key(item)))
        .collect()
}
