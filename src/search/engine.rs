//! Hybrid search engine facade
//!
//! [`SearchEngine`] ties the listing source, the embedding and re-ranking
//! backends and the [`IndexManager`] together. It is `Send + Sync` and meant
//! to be shared behind an `Arc` by every request handler of a process.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::{Config, SearchConfig};
use crate::error::{ExoError, Result};
use crate::search::boost::ngram_boost;
use crate::search::embeddings::{Embedder, build_embedder_or_null};
use crate::search::hybrid::{Candidate, RankRequest, RankingConfig, RerankFn, SearchHit, rank};
use crate::search::index::{IndexManager, Snapshot};
use crate::search::rerank::{Reranker, build_reranker};
use crate::search::tantivy::LexicalScores;
use crate::search::text::{alnum_len, full_text, normalize_query, tokenize};
use crate::storage::{ListingId, ListingSource};

/// Per-call search parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub top_k: usize,
    pub min_score: f32,
    /// Allow the re-ranking pass, if a re-ranker is configured
    pub rerank: bool,
}

impl From<&SearchConfig> for SearchOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            top_k: config.top_k,
            min_score: config.min_score,
            rerank: config.use_reranker,
        }
    }
}

/// Index and backend statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Active listings in the last lexical build
    pub listings: usize,
    /// Listings with cached vectors
    pub embedded: usize,
    pub vocabulary: usize,
    pub lexical_docs: u64,
    pub rebuilds: u64,
    pub query_cache_entries: usize,
    pub embedder: String,
    pub reranker: String,
}

pub struct SearchEngine {
    source: Arc<dyn ListingSource>,
    embedder: Box<dyn Embedder>,
    reranker: Box<dyn Reranker>,
    index: IndexManager,
    config: SearchConfig,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("embedder", &self.embedder.name())
            .field("reranker", &self.reranker.name())
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl SearchEngine {
    /// Engine with backends built from `config`. Unavailable backends degrade
    /// to their null variants.
    pub fn new(source: Arc<dyn ListingSource>, config: &Config) -> Self {
        let embedder = build_embedder_or_null(&config.embedding);
        let reranker = build_reranker(&config.rerank);
        Self::with_backends(source, config, embedder, reranker)
    }

    pub fn with_backends(
        source: Arc<dyn ListingSource>,
        config: &Config,
        embedder: Box<dyn Embedder>,
        reranker: Box<dyn Reranker>,
    ) -> Self {
        tracing::debug!(
            embedder = embedder.name(),
            reranker = reranker.name(),
            "search engine created"
        );
        Self {
            source,
            embedder,
            reranker,
            index: IndexManager::new(&config.embedding),
            config: config.search.clone(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn default_options(&self) -> SearchOptions {
        SearchOptions::from(&self.config)
    }

    /// Rank active listings against `query`.
    ///
    /// Best effort: an internal failure is logged and yields no results.
    pub fn search(&self, query: &str, top_k: usize, min_score: f32) -> Vec<SearchHit> {
        let options = SearchOptions {
            top_k,
            min_score,
            ..self.default_options()
        };
        self.search_with(query, &options)
    }

    pub fn search_with(&self, query: &str, options: &SearchOptions) -> Vec<SearchHit> {
        match self.try_search_with(query, options) {
            Ok(hits) => hits,
            Err(err) => {
                tracing::error!(error = %err, query, "search failed");
                Vec::new()
            }
        }
    }

    pub fn try_search(&self, query: &str, top_k: usize, min_score: f32) -> Result<Vec<SearchHit>> {
        let options = SearchOptions {
            top_k,
            min_score,
            ..self.default_options()
        };
        self.try_search_with(query, &options)
    }

    /// Like [`search_with`](Self::search_with) but returns the error instead
    /// of an empty list.
    pub fn try_search_with(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let raw = query.trim();
        if raw.is_empty() || options.top_k == 0 {
            return Ok(Vec::new());
        }
        if !options.min_score.is_finite() {
            return Err(ExoError::Config(format!(
                "min_score must be finite, got {}",
                options.min_score
            )));
        }

        let started = Instant::now();
        let listings = self.source.fetch_active_listings()?;
        let snapshot = self.index.refresh(listings, self.embedder.as_ref())?;
        if snapshot.is_empty() {
            tracing::debug!("no active listings");
            return Ok(Vec::new());
        }

        let normalized = normalize_query(raw, &snapshot.vocabulary);
        let tokens = tokenize(&normalized);
        let query_len = alnum_len(&normalized);

        let query_vector = self.index.query_embedding(&normalized, self.embedder.as_ref());
        let lexical = match &snapshot.bm25 {
            Some(bm25) => bm25.score(&tokens)?,
            None => LexicalScores::new(),
        };

        let candidates = score_snapshot(
            &snapshot,
            query_vector.as_deref(),
            &lexical,
            &tokens,
            self.config.dense_weight,
        );

        let ranking = RankingConfig::from(&self.config);
        let request = RankRequest {
            query_len,
            min_score: options.min_score,
            top_k: options.top_k,
        };

        let rerank = |head: &[Candidate]| -> Result<Vec<f32>> {
            let documents: Vec<String> = head
                .iter()
                .map(|c| full_text(&snapshot.listings[c.position]))
                .collect();
            self.reranker.score(&normalized, &documents)
        };
        let rerank: Option<&RerankFn<'_>> = if options.rerank && self.reranker.is_enabled() {
            Some(&rerank)
        } else {
            None
        };
        let ranked = rank(candidates, &ranking, &request, rerank);

        let hits: Vec<SearchHit> = ranked
            .into_iter()
            .map(|c| SearchHit {
                listing_id: c.listing_id,
                title: snapshot.listings[c.position].title.clone(),
                score: c.score,
                dense: c.dense,
                lexical: c.lexical,
                ngram: c.ngram,
                match_type: c.match_type(),
            })
            .collect();

        tracing::debug!(
            query = %normalized,
            results = hits.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "search complete"
        );
        Ok(hits)
    }

    /// Forget cached state for a listing after it was created, edited or
    /// deleted. Never fails; unknown ids are ignored.
    pub fn invalidate(&self, listing_id: ListingId) {
        self.index.invalidate(listing_id);
    }

    /// Warm up both backends and build the index ahead of the first search.
    /// Failures are logged; the engine stays usable in degraded mode.
    pub fn preload(&self) {
        let started = Instant::now();
        if let Err(err) = self.embedder.warm_up() {
            tracing::warn!(error = %err, backend = self.embedder.name(), "embedding warm-up failed");
        }
        if let Err(err) = self.reranker.warm_up() {
            tracing::warn!(error = %err, backend = self.reranker.name(), "re-ranker warm-up failed");
        }

        let refreshed = self
            .source
            .fetch_active_listings()
            .and_then(|listings| self.index.refresh(listings, self.embedder.as_ref()));
        match refreshed {
            Ok(snapshot) => tracing::info!(
                listings = snapshot.len(),
                elapsed_ms = started.elapsed().as_millis(),
                "search index preloaded"
            ),
            Err(err) => tracing::warn!(error = %err, "index preload failed"),
        }
    }

    pub fn stats(&self) -> IndexStats {
        let stats = self.index.stats();
        IndexStats {
            listings: stats.listings,
            embedded: stats.embedded,
            vocabulary: stats.vocabulary,
            lexical_docs: stats.lexical_docs,
            rebuilds: stats.rebuilds,
            query_cache_entries: stats.query_cache_entries,
            embedder: self.embedder.name().to_string(),
            reranker: self.reranker.name().to_string(),
        }
    }
}

/// Fused candidates for every listing of the snapshot, in snapshot order.
/// A listing that fails to score is logged and left out.
fn score_snapshot(
    snapshot: &Snapshot,
    query_vector: Option<&[f32]>,
    lexical: &LexicalScores,
    tokens: &[String],
    dense_weight: f32,
) -> Vec<Candidate> {
    snapshot
        .listings
        .par_iter()
        .enumerate()
        .filter_map(|(position, listing)| {
            let dense = match (query_vector, snapshot.vectors(listing.id)) {
                (Some(query), Some(vectors)) => vectors.field_weighted_score(query),
                _ => Ok(0.0),
            };
            let scored = dense.and_then(|dense| {
                let lexical = lexical.get(&listing.id).copied().unwrap_or(0.0);
                let ngram = ngram_boost(tokens, listing);
                let candidate =
                    Candidate::new(position, listing.id, dense, lexical, ngram, dense_weight);
                if candidate.score.is_finite() {
                    Ok(candidate)
                } else {
                    Err(ExoError::Scoring(format!(
                        "non-finite score {}",
                        candidate.score
                    )))
                }
            });

            match scored {
                Ok(candidate) => Some(candidate),
                Err(err) => {
                    tracing::warn!(listing_id = listing.id, error = %err, "skipping listing");
                    None
                }
            }
        })
        .collect()
}
