//! Text normalization and tokenization primitives
//!
//! Every component operates on normalized text: trimmed, with internal
//! whitespace runs collapsed to a single space. Tokenization produces the
//! union of single characters and maximal alphanumeric/ideographic runs so
//! that overlap scoring works for both logographic and alphabetic scripts.

use std::collections::HashSet;

/// Trim and collapse all whitespace runs to a single space.
pub fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Bound a normalized value to `max_len` characters, truncating with an
/// ellipsis marker when it is longer.
pub fn bound(value: String, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        return value;
    }
    let mut truncated: String = value.chars().take(max_len).collect();
    truncated.push('…');
    truncated
}

/// Clip an extracted payload span: normalize, strip trailing sentence
/// punctuation, reject spans shorter than `min_len` characters, truncate
/// spans longer than `max_len` characters with an ellipsis marker.
pub fn clip(payload: &str, min_len: usize, max_len: usize) -> Option<String> {
    let mut value = normalize(payload);
    while value.ends_with(|c: char| matches!(c, '。' | '！' | '？' | '!' | '?')) {
        value.pop();
    }
    let value = value.trim_end().to_string();
    if value.chars().count() < min_len {
        return None;
    }
    Some(bound(value, max_len))
}

/// Tokenize a string for overlap scoring.
///
/// Lowercases, then unions (i) every non-whitespace character, so
/// logographic scripts contribute per-character overlap, and (ii) every
/// maximal run of alphanumeric or ideographic characters as a word.
pub fn tokenize(s: &str) -> HashSet<String> {
    let text = normalize(s).to_lowercase();
    let mut tokens = HashSet::new();

    for ch in text.chars().filter(|c| !c.is_whitespace()) {
        tokens.insert(ch.to_string());
    }

    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if !word.is_empty() {
            tokens.insert(word.to_string());
        }
    }

    tokens
}
