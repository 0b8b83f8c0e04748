//! Character n-gram boost
//!
//! Dense and BM25 scores under-reward very short or misspelled queries
//! ("mobil" against "Mobile Phone"). The boost rewards a query token that
//! matches a window of the title closely, bounded so it cannot dominate.

use crate::search::fuzzy::partial_ratio;
use crate::search::text::title_text;
use crate::storage::ListingDocument;

/// Token similarity (0–1) must exceed this to count.
pub const NGRAM_MIN_SIMILARITY: f32 = 0.7;

/// Scale applied to the retained similarity; the boost lives in `[0, 0.5]`.
pub const NGRAM_SCALE: f32 = 0.5;

/// Boost at or above which a candidate counts as an exact match.
pub const EXACT_MATCH_BOOST: f32 = 0.35;

/// Best partial match of any query token inside the listing's title text,
/// scaled into `[0, 0.5]`.
pub fn ngram_boost(query_tokens: &[String], listing: &ListingDocument) -> f32 {
    let title = title_text(listing).to_lowercase();
    ngram_boost_text(query_tokens, &title)
}

/// [`ngram_boost`] against an already lowercased title text.
pub fn ngram_boost_text(query_tokens: &[String], title: &str) -> f32 {
    if title.is_empty() || query_tokens.is_empty() {
        return 0.0;
    }

    let mut best = 0.0f32;
    for token in query_tokens {
        #[allow(clippy::cast_possible_truncation)]
        let score = (partial_ratio(token, title) / 100.0) as f32;
        if score > NGRAM_MIN_SIMILARITY {
            best = best.max(score);
        }
    }

    best * NGRAM_SCALE
}
