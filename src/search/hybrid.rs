//! Signal fusion and ranking for hybrid search
//!
//! Each listing gets three signals: a dense similarity `D`, a max-normalized
//! BM25 score `B` and an n-gram boost `N`. They are fused as
//!
//! ```text
//! fused = w * D + (1 - w) * B + N
//! ```
//!
//! where `w` is the dense weight (default 0.5). Ranking then runs:
//!
//! 1. keep the best `candidate_window` candidates (stable, so ties keep
//!    corpus order)
//! 2. drop dense-only matches for very short queries
//! 3. optionally re-rank the top slice with a cross-encoder
//! 4. apply a length-dependent threshold, with an exact-match override
//! 5. sort and truncate to `top_k`

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;
use crate::error::{ExoError, Result};
use crate::search::boost::EXACT_MATCH_BOOST;
use crate::search::rerank::sigmoid;
use crate::storage::ListingId;

/// Lexical score above which a non-exact hit counts as hybrid.
pub const HYBRID_LEXICAL_MIN: f32 = 0.01;

/// Score given to exact matches that fused lower.
pub const EXACT_MATCH_SCORE: f32 = 0.96;

/// Queries this short (alphanumeric chars) get the junk filter.
pub const SHORT_QUERY_LEN: usize = 4;

/// Queries at least this long are re-ranked.
pub const RERANK_MIN_QUERY_LEN: usize = 5;

const JUNK_LEXICAL_MIN: f32 = 0.05;
const JUNK_NGRAM_MIN: f32 = 0.10;

/// How a hit matched the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Strong n-gram match in the title
    Exact,
    /// Lexical terms matched
    Hybrid,
    /// Dense similarity only
    Semantic,
}

impl MatchType {
    pub fn classify(lexical: f32, ngram: f32) -> Self {
        if ngram >= EXACT_MATCH_BOOST {
            Self::Exact
        } else if lexical > HYBRID_LEXICAL_MIN {
            Self::Hybrid
        } else {
            Self::Semantic
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Hybrid => "hybrid",
            Self::Semantic => "semantic",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scored listing moving through the ranking pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Position of the listing in the snapshot
    pub position: usize,
    pub listing_id: ListingId,
    pub dense: f32,
    pub lexical: f32,
    pub ngram: f32,
    /// Fused score, replaced by the re-ranker or the exact-match floor
    pub score: f32,
}

impl Candidate {
    pub fn new(
        position: usize,
        listing_id: ListingId,
        dense: f32,
        lexical: f32,
        ngram: f32,
        dense_weight: f32,
    ) -> Self {
        Self {
            position,
            listing_id,
            dense,
            lexical,
            ngram,
            score: fuse(dense, lexical, ngram, dense_weight),
        }
    }

    pub fn match_type(&self) -> MatchType {
        MatchType::classify(self.lexical, self.ngram)
    }

    pub fn is_exact(&self) -> bool {
        self.ngram >= EXACT_MATCH_BOOST
    }
}

/// A ranked search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub listing_id: ListingId,
    pub title: String,
    pub score: f32,
    pub dense: f32,
    pub lexical: f32,
    pub ngram: f32,
    pub match_type: MatchType,
}

/// Ranking knobs taken from `[search]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingConfig {
    pub dense_weight: f32,
    pub candidate_window: usize,
    pub rerank_top_n: usize,
    /// Configured `min_score`; the threshold for queries longer than six chars
    pub base_threshold: f32,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for RankingConfig {
    fn from(config: &SearchConfig) -> Self {
        Self {
            dense_weight: config.dense_weight,
            candidate_window: config.candidate_window,
            rerank_top_n: config.rerank_top_n,
            base_threshold: config.min_score,
        }
    }
}

/// Per-query inputs to [`rank`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankRequest {
    /// Alphanumeric length of the normalized query
    pub query_len: usize,
    pub min_score: f32,
    pub top_k: usize,
}

/// Re-ranking callback: raw logits for the given candidates, in order.
pub type RerankFn<'a> = dyn Fn(&[Candidate]) -> Result<Vec<f32>> + 'a;

pub fn fuse(dense: f32, lexical: f32, ngram: f32, dense_weight: f32) -> f32 {
    dense_weight.mul_add(dense, (1.0 - dense_weight) * lexical) + ngram
}

/// Minimum score demanded of a query of `query_len` alphanumeric chars.
pub fn length_floor(query_len: usize, base: f32) -> f32 {
    match query_len {
        0..=2 => 0.55,
        3..=4 => 0.45,
        5..=6 => 0.38,
        _ => base,
    }
}

/// The caller's `min_score` can raise the length floor but never lower it.
pub fn dynamic_threshold(query_len: usize, min_score: f32, base: f32) -> f32 {
    min_score.max(length_floor(query_len, base))
}

fn by_score_desc(a: &Candidate, b: &Candidate) -> Ordering {
    b.score.total_cmp(&a.score)
}

/// Best `window` candidates by fused score; equal scores keep input order.
pub fn select_candidates(mut candidates: Vec<Candidate>, window: usize) -> Vec<Candidate> {
    candidates.sort_by(by_score_desc);
    candidates.truncate(window);
    candidates
}

/// Drop candidates with neither a lexical nor an n-gram signal when the
/// query is short enough that dense similarity alone is unreliable.
pub fn junk_filter(candidates: Vec<Candidate>, query_len: usize) -> Vec<Candidate> {
    if query_len > SHORT_QUERY_LEN {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|c| !(c.lexical < JUNK_LEXICAL_MIN && c.ngram < JUNK_NGRAM_MIN))
        .collect()
}

/// Replace the scores of the first `top_n` candidates with sigmoid-squashed
/// re-ranker scores and re-sort that slice; the remainder stays behind it
/// untouched.
pub fn apply_rerank(
    mut candidates: Vec<Candidate>,
    top_n: usize,
    rerank: &RerankFn<'_>,
) -> Result<Vec<Candidate>> {
    let split = top_n.min(candidates.len());
    if split == 0 {
        return Ok(candidates);
    }

    let logits = rerank(&candidates[..split])?;
    if logits.len() != split {
        return Err(ExoError::Rerank(format!(
            "expected {split} scores, got {}",
            logits.len()
        )));
    }

    let head = &mut candidates[..split];
    for (candidate, logit) in head.iter_mut().zip(logits) {
        candidate.score = sigmoid(logit);
    }
    head.sort_by(by_score_desc);
    Ok(candidates)
}

/// Keep exact matches (score floored at [`EXACT_MATCH_SCORE`]) and anything
/// scoring at least `threshold`.
pub fn apply_threshold(candidates: Vec<Candidate>, threshold: f32) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter_map(|mut c| {
            if c.is_exact() {
                c.score = c.score.max(EXACT_MATCH_SCORE);
                Some(c)
            } else if c.score >= threshold {
                Some(c)
            } else {
                None
            }
        })
        .collect()
}

pub fn finalize(mut candidates: Vec<Candidate>, top_k: usize) -> Vec<Candidate> {
    candidates.sort_by(by_score_desc);
    candidates.truncate(top_k);
    candidates
}

/// Run the ranking pipeline over fused candidates in corpus order.
///
/// Re-ranking only happens when `rerank` is given and the query is long
/// enough; a failing re-ranker is logged and the fused order is kept.
pub fn rank(
    candidates: Vec<Candidate>,
    config: &RankingConfig,
    request: &RankRequest,
    rerank: Option<&RerankFn<'_>>,
) -> Vec<Candidate> {
    let candidates = select_candidates(candidates, config.candidate_window);
    let mut candidates = junk_filter(candidates, request.query_len);
    if candidates.is_empty() {
        return candidates;
    }

    if let Some(rerank) = rerank.filter(|_| request.query_len >= RERANK_MIN_QUERY_LEN) {
        candidates = match apply_rerank(candidates.clone(), config.rerank_top_n, rerank) {
            Ok(reranked) => reranked,
            Err(err) => {
                tracing::warn!(error = %err, "re-ranking failed, keeping fused order");
                candidates
            }
        };
    }

    let threshold =
        dynamic_threshold(request.query_len, request.min_score, config.base_threshold);
    tracing::debug!(
        threshold,
        candidates = candidates.len(),
        "applying score threshold"
    );
    finalize(apply_threshold(candidates, threshold), request.top_k)
}
