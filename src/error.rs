use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExoError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Search index error: {0}")]
    SearchIndex(#[from] tantivy::TantivyError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Embedding backend error: {0}")]
    Embedding(String),

    #[error("Re-ranking backend error: {0}")]
    Rerank(String),

    #[error("Scoring failed: {0}")]
    Scoring(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ExoError {
    /// Whether this error means a model backend could not be reached or loaded.
    ///
    /// These are the failures the search pipeline degrades around instead of
    /// surfacing to the caller.
    #[must_use]
    pub const fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::Embedding(_) | Self::Rerank(_) | Self::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, ExoError>;
