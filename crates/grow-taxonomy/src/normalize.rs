//! Text normalization and tokenization.
//!
//! Everything stored in or queried against the search block goes through
//! [`normalize`] first, so the output alphabet is fixed: lowercase ASCII
//! letters, digits, `#` and single spaces between words.

use unicode_normalization::UnicodeNormalization;

/// Lowercase, decompose, strip diacritics and collapse every run of
/// characters outside `[a-z0-9#]` into one space.
///
/// Idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;

    for c in lowered.nfkd() {
        if is_diacritic(c) {
            continue;
        }
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '#' {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }

    out
}

// Combining Diacritical Marks block
fn is_diacritic(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// Splits normalized text into tokens within a length window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tokenizer {
    min_len: usize,
    max_len: usize,
}

impl Tokenizer {
    pub fn new(min_len: usize, max_len: usize) -> Self {
        Self { min_len, max_len }
    }

    /// Window used when indexing post text (2..=32).
    pub fn for_index() -> Self {
        Self::new(2, 32)
    }

    /// Window used for queries, which also keep single characters (1..=32).
    pub fn for_query() -> Self {
        Self::new(1, 32)
    }

    /// Tokenize already-normalized text.
    pub fn tokenize(&self, normalized: &str) -> Vec<String> {
        normalized
            .split_whitespace()
            .filter(|w| {
                let len = w.chars().count();
                len >= self.min_len && len <= self.max_len
            })
            .map(str::to_string)
            .collect()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::for_index()
    }
}

/// Tokenize with the indexing window.
pub fn tokenize(normalized: &str) -> Vec<String> {
    Tokenizer::for_index().tokenize(normalized)
}

/// Sliding windows of exactly `n` tokens joined by a single space.
pub fn ngrams(tokens: &[String], n: usize) -> Vec<String> {
    if n == 0 || tokens.len() < n {
        return Vec::new();
    }
    tokens.windows(n).map(|w| w.join(" ")).collect()
}

/// Remove one leading `#`.
pub fn strip_hash(token: &str) -> &str {
    token.strip_prefix('#').unwrap_or(token)
}

/// Every leading substring of length `1..=min(len, max_len)` of every word,
/// with one leading `#` stripped first. Duplicate-free, first-seen order.
pub fn prefixes(words: &[String], max_len: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for word in words {
        let word = strip_hash(word);
        for (count, (idx, c)) in word.char_indices().enumerate() {
            if count >= max_len {
                break;
            }
            let prefix = &word[..idx + c.len_utf8()];
            if seen.insert(prefix.to_string()) {
                out.push(prefix.to_string());
            }
        }
    }

    out
}

/// Duplicate-free copy keeping first-seen order; empty strings are dropped.
pub fn unique<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .map(Into::into)
        .filter(|s: &String| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

/// URL-friendly form of a display name: "Gelato 41" -> "gelato-41".
pub fn slug(name: &str) -> String {
    normalize(name)
        .split(|c: char| c == ' ' || c == '#')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
