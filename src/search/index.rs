//! Cache and invalidation manager
//!
//! Owns every mutable search structure behind one `parking_lot::Mutex`:
//! listing vectors, the BM25 index, the title vocabulary and the query
//! embedding cache. A search calls [`IndexManager::refresh`] with the current
//! active listings and gets back an immutable [`Snapshot`]; scoring then runs
//! against the snapshot without holding the lock.
//!
//! Refresh sequence:
//!
//! ```text
//! lock   diff ids, evict stale vectors, collect listings missing vectors
//! unlock embed missing listings (may be slow, remote)
//! lock   re-check and insert vectors, rebuild BM25 + vocabulary if dirty,
//!        capture snapshot
//! ```
//!
//! Two refreshes racing may both embed the same listing; the second insert
//! simply replaces the first.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::EmbeddingConfig;
use crate::error::Result;
use crate::search::cache::{CacheStats, QueryEmbeddingCache};
use crate::search::embeddings::{Embedder, ListingVectors, VectorIndex};
use crate::search::tantivy::Bm25Index;
use crate::search::text::{Vocabulary, desc_text, full_text, title_text};
use crate::storage::{ListingDocument, ListingId};

/// Immutable view of the index taken at the end of a refresh.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Active listings in source order, ids unique
    pub listings: Vec<ListingDocument>,
    pub bm25: Option<Arc<Bm25Index>>,
    pub vocabulary: Arc<Vocabulary>,
    vectors: Arc<VectorIndex>,
    /// Vectors embedded by this refresh but not stored in the shared index
    fresh: HashMap<ListingId, ListingVectors>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Cached vectors of a listing, if it has any.
    pub fn vectors(&self, id: ListingId) -> Option<&ListingVectors> {
        self.fresh.get(&id).or_else(|| self.vectors.get(id))
    }
}

/// Counters reported by [`IndexManager::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStats {
    pub listings: usize,
    pub embedded: usize,
    pub vocabulary: usize,
    pub lexical_docs: u64,
    pub rebuilds: u64,
    pub query_cache_entries: usize,
    pub query_cache: CacheStats,
}

struct IndexState {
    vectors: Arc<VectorIndex>,
    /// Id set the BM25 index and vocabulary were built from
    indexed_ids: HashSet<ListingId>,
    bm25: Option<Arc<Bm25Index>>,
    vocabulary: Arc<Vocabulary>,
    query_cache: QueryEmbeddingCache,
    dirty: bool,
    /// Bumped by every invalidation; embeddings started under an older epoch
    /// are not stored.
    epoch: u64,
    rebuilds: u64,
}

pub struct IndexManager {
    state: Mutex<IndexState>,
    clear_query_cache_on_rebuild: bool,
}

impl std::fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl IndexManager {
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            state: Mutex::new(IndexState {
                vectors: Arc::new(VectorIndex::new(config.dims)),
                indexed_ids: HashSet::new(),
                bm25: None,
                vocabulary: Arc::new(Vocabulary::default()),
                query_cache: QueryEmbeddingCache::new(
                    config.query_cache_size,
                    config.query_cache_ttl,
                ),
                dirty: true,
                epoch: 0,
                rebuilds: 0,
            }),
            clear_query_cache_on_rebuild: config.clear_query_cache_on_rebuild,
        }
    }

    /// Bring the caches in line with `active` and return a snapshot of them.
    ///
    /// Duplicate ids keep their first occurrence. Embedding failures leave the
    /// affected listings without vectors for this search only; they are
    /// retried on the next refresh.
    pub fn refresh(
        &self,
        active: Vec<ListingDocument>,
        embedder: &dyn Embedder,
    ) -> Result<Arc<Snapshot>> {
        let listings = dedup_by_id(active);
        let live: HashSet<ListingId> = listings.iter().map(|l| l.id).collect();

        let (missing, epoch) = {
            let mut state = self.state.lock();
            let evicted = if state.vectors.ids().all(|id| live.contains(&id)) {
                0
            } else {
                Arc::make_mut(&mut state.vectors).retain(|id| live.contains(&id))
            };
            if live != state.indexed_ids {
                state.dirty = true;
            }

            let missing: Vec<ListingDocument> = if embedder.is_enabled() {
                listings
                    .iter()
                    .filter(|l| !state.vectors.contains(l.id))
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };

            tracing::debug!(
                active = live.len(),
                evicted,
                missing = missing.len(),
                dirty = state.dirty,
                "index refresh diff"
            );
            (missing, state.epoch)
        };

        let embedded = embed_listings(&missing, embedder);

        let mut state = self.state.lock();
        let mut fresh = HashMap::new();
        if state.epoch == epoch {
            if !embedded.is_empty() {
                let vectors = Arc::make_mut(&mut state.vectors);
                for (id, listing_vectors) in embedded {
                    if !vectors.contains(id) && !vectors.insert(id, listing_vectors) {
                        tracing::warn!(listing_id = id, "embedding has wrong dimension, skipped");
                    }
                }
            }
        } else {
            // Invalidated while embedding: use the vectors for this search only
            fresh = embedded.into_iter().collect();
        }

        // Another refresh may have indexed a different listing set meanwhile
        if live != state.indexed_ids {
            state.dirty = true;
        }

        if state.dirty {
            let bm25 = Bm25Index::build(&listings)?;
            state.bm25 = Some(Arc::new(bm25));
            state.vocabulary = Arc::new(Vocabulary::from_listings(&listings));
            state.indexed_ids = live;
            state.dirty = false;
            state.rebuilds += 1;
            if self.clear_query_cache_on_rebuild {
                state.query_cache.clear();
            }
            tracing::info!(
                listings = listings.len(),
                vocabulary = state.vocabulary.len(),
                rebuilds = state.rebuilds,
                "rebuilt lexical index"
            );
        }

        Ok(Arc::new(Snapshot {
            listings,
            bm25: state.bm25.clone(),
            vocabulary: Arc::clone(&state.vocabulary),
            vectors: Arc::clone(&state.vectors),
            fresh,
        }))
    }

    /// Drop a listing's vectors and force a lexical rebuild on the next
    /// refresh. Unknown ids are fine; repeating the call changes nothing more.
    ///
    /// Also clears the query embedding cache, whose entries may have been
    /// normalized against a vocabulary containing this listing.
    pub fn invalidate(&self, id: ListingId) {
        let mut state = self.state.lock();
        let removed = state.vectors.contains(id)
            && Arc::make_mut(&mut state.vectors).remove(id).is_some();
        state.dirty = true;
        state.epoch += 1;
        state.query_cache.clear();
        tracing::debug!(listing_id = id, removed, "listing invalidated");
    }

    /// Embedding of a normalized query, from cache when possible.
    ///
    /// `None` when the embedder is disabled. A failing backend yields a zero
    /// vector that is not cached.
    pub fn query_embedding(&self, query: &str, embedder: &dyn Embedder) -> Option<Vec<f32>> {
        if !embedder.is_enabled() {
            return None;
        }

        if let Some(cached) = self.state.lock().query_cache.get(query) {
            return Some(cached);
        }

        match embedder.embed(query) {
            Ok(embedding) => {
                self.state.lock().query_cache.put(query, embedding.clone());
                Some(embedding)
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    backend = embedder.name(),
                    "query embedding failed, dense scores disabled for this search"
                );
                Some(vec![0.0; embedder.dims()])
            }
        }
    }

    pub fn clear_query_cache(&self) {
        self.state.lock().query_cache.clear();
    }

    pub fn stats(&self) -> ManagerStats {
        let state = self.state.lock();
        ManagerStats {
            listings: state.indexed_ids.len(),
            embedded: state.vectors.len(),
            vocabulary: state.vocabulary.len(),
            lexical_docs: state.bm25.as_ref().map_or(0, |bm25| bm25.num_docs()),
            rebuilds: state.rebuilds,
            query_cache_entries: state.query_cache.len(),
            query_cache: state.query_cache.stats(),
        }
    }
}

fn dedup_by_id(listings: Vec<ListingDocument>) -> Vec<ListingDocument> {
    let mut seen = HashSet::with_capacity(listings.len());
    let total = listings.len();
    let unique: Vec<ListingDocument> = listings
        .into_iter()
        .filter(|listing| seen.insert(listing.id))
        .collect();
    if unique.len() != total {
        tracing::warn!(
            duplicates = total - unique.len(),
            "listing source returned duplicate ids"
        );
    }
    unique
}

/// Full, title and description vectors for each listing. On backend failure
/// the whole batch is skipped.
fn embed_listings(
    listings: &[ListingDocument],
    embedder: &dyn Embedder,
) -> Vec<(ListingId, ListingVectors)> {
    if listings.is_empty() {
        return Vec::new();
    }

    let full: Vec<String> = listings.iter().map(full_text).collect();
    let titles: Vec<String> = listings.iter().map(title_text).collect();
    let descriptions: Vec<String> = listings.iter().map(desc_text).collect();

    let batches = embedder.embed_batch(&full).and_then(|full| {
        let titles = embedder.embed_batch(&titles)?;
        let descriptions = embedder.embed_batch(&descriptions)?;
        Ok((full, titles, descriptions))
    });

    match batches {
        Ok((full, titles, descriptions)) => listings
            .iter()
            .zip(full)
            .zip(titles)
            .zip(descriptions)
            .map(|(((listing, full), title), description)| {
                (listing.id, ListingVectors::new(full, title, description))
            })
            .collect(),
        Err(err) => {
            tracing::warn!(
                error = %err,
                backend = embedder.name(),
                listings = listings.len(),
                "listing embedding failed, dense scores are zero until the next refresh"
            );
            Vec::new()
        }
    }
}
