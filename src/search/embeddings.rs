//! Embedding backends and the per-listing vector store
//!
//! Three backends implement [`Embedder`]:
//!
//! - [`HashEmbedder`]: FNV-1a hash embeddings. No model dependencies, fully
//!   deterministic.
//! - [`ApiEmbedder`](crate::search::embeddings_api::ApiEmbedder): a remote
//!   OpenAI-compatible embeddings endpoint, bounded by a request timeout.
//! - [`NullEmbedder`]: the disabled backend. Every vector is zero, so the
//!   dense signal drops out of fusion and ranking falls back to lexical and
//!   n-gram scores.

use std::collections::HashMap;

use crate::config::EmbeddingConfig;
use crate::error::{ExoError, Result};
use crate::search::embeddings_api::ApiEmbedder;
use crate::search::text::tokenize;
use crate::storage::ListingId;

/// Pluggable embedding backend interface
///
/// Implementations must be safe to call from several threads at once; the
/// index manager embeds new listings outside its lock.
pub trait Embedder: Send + Sync {
    /// Embed one text into an L2-normalized vector of length [`dims`](Self::dims).
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, one vector per input in order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn dims(&self) -> usize;

    fn name(&self) -> &str;

    /// False for the disabled backend.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Load weights or open connections ahead of the first search.
    fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}

/// Build an embedder from config.
///
/// An `api` backend without an endpoint is a configuration error; callers
/// that prefer to degrade use [`build_embedder_or_null`].
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let backend = config.backend.trim().to_lowercase();
    let dims = config.dims;
    if dims == 0 {
        return Err(ExoError::Config(
            "embedding.dims must be greater than 0".to_string(),
        ));
    }

    match backend.as_str() {
        "" | "hash" => Ok(Box::new(HashEmbedder::new(dims))),
        "none" | "disabled" | "null" => Ok(Box::new(NullEmbedder::new(dims))),
        "api" => Ok(Box::new(ApiEmbedder::from_config(config)?)),
        other => Err(ExoError::Config(format!(
            "unknown embedding backend: {other}"
        ))),
    }
}

/// Build an embedder, falling back to [`NullEmbedder`] when the configured
/// backend is unavailable.
pub fn build_embedder_or_null(config: &EmbeddingConfig) -> Box<dyn Embedder> {
    match build_embedder(config) {
        Ok(embedder) => embedder,
        Err(err) => {
            tracing::warn!(
                backend = %config.backend,
                error = %err,
                "embedding backend unavailable, dense scores disabled"
            );
            Box::new(NullEmbedder::new(config.dims.max(1)))
        }
    }
}

/// Disabled backend: zero vectors of the configured dimension.
#[derive(Debug, Clone)]
pub struct NullEmbedder {
    dim: usize,
}

impl Default for NullEmbedder {
    fn default() -> Self {
        Self { dim: 384 }
    }
}

impl NullEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Embedder for NullEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.0; self.dim])
    }

    fn dims(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &str {
        "none"
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Hash embedder using FNV-1a
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    /// Embedding dimension (default: 384)
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dim: 384 }
    }
}

impl HashEmbedder {
    /// Create embedder with specified dimension
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Embedding dimension
    pub fn dims(&self) -> usize {
        self.dim
    }

    /// Embed text into vector
    pub fn embed(&self, text: &str) -> Vec<f32> {
        if self.dim == 0 {
            return Vec::new();
        }

        let tokens = tokenize(text);
        let mut embedding = vec![0.0; self.dim];

        if tokens.is_empty() {
            return embedding;
        }

        for token in &tokens {
            accumulate_embedding(&mut embedding, token, 1.0);
        }

        for window in tokens.windows(2) {
            let bigram = format!("{} {}", window[0], window[1]);
            accumulate_embedding(&mut embedding, &bigram, 0.5);
        }

        l2_normalize(&mut embedding);
        embedding
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::embed(self, text))
    }

    fn dims(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// The three cached vectors of one listing.
///
/// Vectors are replaced wholesale on re-embedding, never patched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingVectors {
    pub full: Option<Vec<f32>>,
    pub title: Option<Vec<f32>>,
    pub description: Option<Vec<f32>>,
}

impl ListingVectors {
    pub fn new(full: Vec<f32>, title: Vec<f32>, description: Vec<f32>) -> Self {
        Self {
            full: Some(full),
            title: Some(title),
            description: Some(description),
        }
    }

    /// Title-weighted dense similarity against a normalized query vector.
    ///
    /// `(3 * title + description) / 4` when both field vectors exist, else the
    /// full-text similarity, else zero. A length mismatch is an error so the
    /// caller can skip just this listing.
    pub fn field_weighted_score(&self, query: &[f32]) -> Result<f32> {
        if let (Some(title), Some(description)) = (&self.title, &self.description) {
            let title_score = checked_dot(query, title)?;
            let desc_score = checked_dot(query, description)?;
            return Ok(3.0f32.mul_add(title_score, desc_score) / 4.0);
        }

        match &self.full {
            Some(full) => checked_dot(query, full),
            None => Ok(0.0),
        }
    }
}

/// In-memory store of listing vectors, keyed by listing id.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    vectors: HashMap<ListingId, ListingVectors>,
    dims: usize,
}

impl VectorIndex {
    /// Create a new empty vector index
    pub fn new(dims: usize) -> Self {
        Self {
            vectors: HashMap::new(),
            dims,
        }
    }

    /// Current embedding dimension
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Number of listings with cached vectors
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn contains(&self, id: ListingId) -> bool {
        self.vectors.contains_key(&id)
    }

    pub fn get(&self, id: ListingId) -> Option<&ListingVectors> {
        self.vectors.get(&id)
    }

    /// Insert or replace a listing's vectors. Vectors of the wrong length are
    /// dropped; returns false if nothing usable was stored.
    pub fn insert(&mut self, id: ListingId, vectors: ListingVectors) -> bool {
        let dims = self.dims;
        let keep = |v: Option<Vec<f32>>| v.filter(|v| v.len() == dims);
        let vectors = ListingVectors {
            full: keep(vectors.full),
            title: keep(vectors.title),
            description: keep(vectors.description),
        };
        if vectors.full.is_none() && vectors.title.is_none() && vectors.description.is_none() {
            return false;
        }
        self.vectors.insert(id, vectors);
        true
    }

    /// Remove all vectors of a listing
    pub fn remove(&mut self, id: ListingId) -> Option<ListingVectors> {
        self.vectors.remove(&id)
    }

    /// Drop every listing not accepted by `keep`; returns how many were evicted.
    pub fn retain(&mut self, mut keep: impl FnMut(ListingId) -> bool) -> usize {
        let before = self.vectors.len();
        self.vectors.retain(|id, _| keep(*id));
        before - self.vectors.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = ListingId> + '_ {
        self.vectors.keys().copied()
    }
}

fn accumulate_embedding(embedding: &mut [f32], token: &str, weight: f32) {
    let token_hash = fnv1a_hash(token.as_bytes());

    for i in 0..embedding.len() {
        let dim_hash = splitmix64(token_hash ^ i as u64);
        let sign = if dim_hash & 1 == 0 { weight } else { -weight };
        #[allow(clippy::cast_possible_truncation)]
        let dim = ((dim_hash >> 1) as usize) % embedding.len();
        embedding[dim] += sign;
    }
}

/// SplitMix64 finalizer; every input bit affects every output bit.
const fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn fnv1a_hash(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Scale to unit length in place; zero vectors stay zero.
pub fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vec.iter_mut() {
            *value /= norm;
        }
    }
}

/// Dot product of two equally long vectors.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn checked_dot(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(ExoError::Scoring(format!(
            "vector length mismatch: query {} vs listing {}",
            a.len(),
            b.len()
        )));
    }
    Ok(dot_product(a, b))
}
