//! Hybrid search engine for marketplace listings
//!
//! Fuses dense embeddings, BM25 and character n-gram matching, with optional
//! cross-encoder re-ranking of the top slice.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │              Search Query (normalize_query, tokenize)          │
//! └────────────────────────────────────────────────────────────────┘
//!           │                      │                      │
//!           ▼                      ▼                      ▼
//! ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐
//! │   VectorIndex    │  │    Bm25Index     │  │   ngram_boost    │
//! │ (title 3:1 desc) │  │ (Tantivy, RAM)   │  │ (partial_ratio)  │
//! └──────────────────┘  └──────────────────┘  └──────────────────┘
//!           │                      │                      │
//!           └──────────────────────┼──────────────────────┘
//!                                  ▼
//!                ┌───────────────────────────────────┐
//!                │  Fusion + ranking (hybrid.rs)     │
//!                │  junk filter, re-rank, threshold  │
//!                └───────────────────────────────────┘
//!                                  │
//!                                  ▼
//!                         Ranked SearchHits
//! ```
//!
//! All mutable state (vectors, BM25, vocabulary, query cache) lives in one
//! [`IndexManager`] behind a single lock; see [`index`].

pub mod boost;
pub mod cache;
pub mod embeddings;
pub mod embeddings_api;
pub mod engine;
pub mod fuzzy;
pub mod hybrid;
pub mod index;
pub mod rerank;
pub mod tantivy;
pub mod text;

// Re-export main types
pub use embeddings::{
    Embedder, HashEmbedder, ListingVectors, NullEmbedder, VectorIndex, build_embedder,
    build_embedder_or_null,
};
pub use embeddings_api::ApiEmbedder;
pub use engine::{IndexStats, SearchEngine, SearchOptions};
pub use hybrid::{Candidate, MatchType, RankingConfig, SearchHit};
pub use index::{IndexManager, Snapshot};
pub use rerank::{ApiReranker, NullReranker, Reranker, build_reranker};
pub use self::tantivy::Bm25Index;
pub use text::{Vocabulary, normalize_query, tokenize};
