//! Word tokenization shared by the index and the query layer.
//!
//! The word pattern covers ASCII word characters plus the Danish letters so
//! that vault notes and queries in either language tokenize the same way.

use once_cell::sync::Lazy;
use regex::Regex;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\wæøåÆØÅ]+").unwrap());

pub fn word_pattern() -> &'static Regex {
    &WORD_RE
}

/// Lowercase word tokens of `text`, in order of appearance.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Light plural/suffix stripping used for query expansion. Applies at most
/// one rule: trailing `s` (len > 3), trailing `er` (len > 4), trailing `e`
/// (len > 4).
pub fn stem(token: &str) -> String {
    let len = token.chars().count();
    if let Some(base) = token.strip_suffix('s') {
        if len > 3 {
            return base.to_string();
        }
    }
    if let Some(base) = token.strip_suffix("er") {
        if len > 4 {
            return base.to_string();
        }
    }
    if let Some(base) = token.strip_suffix('e') {
        if len > 4 {
            return base.to_string();
        }
    }
    token.to_string()
}

/// Truncate `text` to at most `max_chars` characters (not bytes), returning
/// the clipped prefix and whether anything was cut.
pub fn clip_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}
