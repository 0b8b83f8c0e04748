//! Text normalization for listings and queries
//!
//! Tokenization is shared by the lexical index, the title vocabulary and the
//! n-gram booster so that all three agree on what a "word" is.

use std::sync::LazyLock;

use regex::Regex;

use crate::search::fuzzy;
use crate::storage::ListingDocument;

/// Closed set of short function words dropped by [`tokenize`].
pub const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "in", "on", "at", "to", "for", "of", "with", "by", "from",
    "is", "it", "this", "that", "be",
];

/// Tokens longer than this are never spell-corrected.
pub const MAX_CORRECTABLE_LEN: usize = 8;

/// Minimum `ratio` (0–100) for a vocabulary word to replace a query token.
pub const CORRECTION_CUTOFF: f64 = 70.0;

static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Lowercase, strip punctuation, split on whitespace, drop stopwords.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned = PUNCTUATION.replace_all(&lowered, " ");
    cleaned
        .split_whitespace()
        .filter(|token| !STOPWORDS.contains(token))
        .map(ToString::to_string)
        .collect()
}

/// Number of alphanumeric characters, the "length" used by the short-query
/// rules in ranking.
pub fn alnum_len(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphanumeric()).count()
}

/// Title plus category.
pub fn title_text(listing: &ListingDocument) -> String {
    format!(
        "{} {}",
        listing.title,
        listing.category.as_deref().unwrap_or_default()
    )
    .trim()
    .to_string()
}

/// City plus description.
pub fn desc_text(listing: &ListingDocument) -> String {
    format!(
        "{} {}",
        listing.city.as_deref().unwrap_or_default(),
        listing.description
    )
    .trim()
    .to_string()
}

/// Text indexed for BM25 and embedded as the full-text vector.
///
/// The title text is repeated three times so its terms carry more weight in
/// the term statistics, mirroring the 3:1 title weighting of the dense score.
pub fn full_text(listing: &ListingDocument) -> String {
    let title = title_text(listing);
    let desc = desc_text(listing);
    format!("{title} {title} {title} {desc}").trim().to_string()
}

/// Sorted, de-duplicated title words used to correct query typos.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    words: Vec<String>,
}

impl Vocabulary {
    /// Build from the title text of every listing.
    pub fn from_listings<'a>(listings: impl IntoIterator<Item = &'a ListingDocument>) -> Self {
        let mut words: Vec<String> = listings
            .into_iter()
            .flat_map(|listing| tokenize(&title_text(listing)))
            .collect();
        words.sort();
        words.dedup();
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Closest word scoring at least [`CORRECTION_CUTOFF`]. Ties keep the
    /// first word in sort order.
    pub fn closest(&self, token: &str) -> Option<&str> {
        let mut best: Option<(&str, f64)> = None;
        for word in &self.words {
            let score = fuzzy::ratio(token, word);
            if score < CORRECTION_CUTOFF {
                continue;
            }
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((word, score));
                if score >= 100.0 {
                    break;
                }
            }
        }
        best.map(|(word, _)| word)
    }
}

/// Clean a raw query and correct short tokens against the vocabulary.
///
/// Unmatched tokens pass through verbatim.
pub fn normalize_query(raw: &str, vocabulary: &Vocabulary) -> String {
    let lowered = raw.trim().to_lowercase();
    let cleaned = WHITESPACE.replace_all(&lowered, " ");

    let corrected: Vec<&str> = cleaned
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(|token| {
            if token.chars().count() <= MAX_CORRECTABLE_LEN {
                vocabulary.closest(token).unwrap_or(token)
            } else {
                token
            }
        })
        .collect();

    let result = corrected.join(" ");
    if result != cleaned {
        tracing::debug!(from = %cleaned, to = %result, "query normalised");
    }
    result
}
