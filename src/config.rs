use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ExoError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration: defaults, then the explicit file (or `EXO_CONFIG`,
    /// or the global config file), then `EXO_*` environment overrides.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("EXO_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            match Self::load_patch(&path)? {
                Some(patch) => config.merge_patch(patch),
                None => {
                    return Err(ExoError::MissingConfig(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
            }
        } else if let Some(global) = Self::load_global()? {
            config.merge_patch(global);
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document on top of the defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let patch: ConfigPatch =
            toml::from_str(raw).map_err(|err| ExoError::Config(format!("parse config: {err}")))?;
        let mut config = Self::default();
        config.merge_patch(patch);
        config.validate()?;
        Ok(config)
    }

    /// Default location of the global config file.
    #[must_use]
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("exo-search/config.toml"))
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        match Self::global_path() {
            Some(path) => Self::load_patch(&path),
            None => Ok(None),
        }
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| ExoError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| ExoError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.search {
            self.search.merge(patch);
        }
        if let Some(patch) = patch.embedding {
            self.embedding.merge(patch);
        }
        if let Some(patch) = patch.rerank {
            self.rerank.merge(patch);
        }
        if let Some(patch) = patch.store {
            self.store.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_f32("EXO_SEARCH_DENSE_WEIGHT")? {
            self.search.dense_weight = value;
        }
        if let Some(value) = env_f32("EXO_SEARCH_MIN_SCORE")? {
            self.search.min_score = value;
        }
        if let Some(value) = env_usize("EXO_SEARCH_TOP_K")? {
            self.search.top_k = value;
        }
        if let Some(value) = env_usize("EXO_SEARCH_CANDIDATE_WINDOW")? {
            self.search.candidate_window = value;
        }
        if let Some(value) = env_bool("EXO_SEARCH_USE_RERANKER") {
            self.search.use_reranker = value;
        }

        if let Some(value) = env_string("EXO_EMBEDDING_BACKEND") {
            self.embedding.backend = value;
        }
        if let Some(value) = env_usize("EXO_EMBEDDING_DIMS")? {
            self.embedding.dims = value;
        }
        if let Some(value) = env_string("EXO_EMBEDDING_ENDPOINT") {
            self.embedding.endpoint = value;
        }
        if let Some(value) = env_string("EXO_EMBEDDING_MODEL") {
            self.embedding.model = value;
        }
        if let Some(value) = env_u64("EXO_EMBEDDING_TIMEOUT_SECS")? {
            self.embedding.timeout_secs = value;
        }
        if let Some(value) = env_usize("EXO_EMBEDDING_QUERY_CACHE_SIZE")? {
            self.embedding.query_cache_size = value;
        }
        if let Some(value) = env_u64("EXO_EMBEDDING_QUERY_CACHE_TTL_SECS")? {
            self.embedding.query_cache_ttl = (value > 0).then(|| Duration::from_secs(value));
        }

        if let Some(value) = env_string("EXO_RERANK_BACKEND") {
            self.rerank.backend = value;
        }
        if let Some(value) = env_string("EXO_RERANK_ENDPOINT") {
            self.rerank.endpoint = value;
        }
        if let Some(value) = env_u64("EXO_RERANK_TIMEOUT_SECS")? {
            self.rerank.timeout_secs = value;
        }

        if let Some(value) = env_string("EXO_DATABASE") {
            self.store.database = Some(PathBuf::from(value));
        }

        Ok(())
    }

    /// Reject values the ranking pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.search.dense_weight) {
            return Err(ExoError::Config(format!(
                "search.dense_weight must be within [0, 1], got {}",
                self.search.dense_weight
            )));
        }
        if !self.search.min_score.is_finite() || self.search.min_score < 0.0 {
            return Err(ExoError::Config(format!(
                "search.min_score must be a non-negative number, got {}",
                self.search.min_score
            )));
        }
        if self.search.candidate_window == 0 {
            return Err(ExoError::Config(
                "search.candidate_window must be greater than 0".to_string(),
            ));
        }
        if self.search.rerank_top_n == 0 {
            return Err(ExoError::Config(
                "search.rerank_top_n must be greater than 0".to_string(),
            ));
        }
        if self.embedding.dims == 0 {
            return Err(ExoError::Config(
                "embedding.dims must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Weight of the dense score; lexical gets `1 - dense_weight`.
    pub dense_weight: f32,
    /// Caller's base score threshold.
    pub min_score: f32,
    /// Default number of results returned.
    pub top_k: usize,
    /// Number of top fused candidates kept before filtering.
    pub candidate_window: usize,
    /// Re-rank the top slice when a re-ranking backend is configured.
    pub use_reranker: bool,
    pub rerank_top_n: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            dense_weight: 0.5,
            min_score: 0.35,
            top_k: 20,
            candidate_window: 100,
            use_reranker: true,
            rerank_top_n: 10,
        }
    }
}

impl SearchConfig {
    fn merge(&mut self, patch: SearchPatch) {
        if let Some(value) = patch.dense_weight {
            self.dense_weight = value;
        }
        if let Some(value) = patch.min_score {
            self.min_score = value;
        }
        if let Some(value) = patch.top_k {
            self.top_k = value;
        }
        if let Some(value) = patch.candidate_window {
            self.candidate_window = value;
        }
        if let Some(value) = patch.use_reranker {
            self.use_reranker = value;
        }
        if let Some(value) = patch.rerank_top_n {
            self.rerank_top_n = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `hash`, `api` or `none`.
    pub backend: String,
    pub dims: usize,
    /// OpenAI-compatible embeddings endpoint, used by the `api` backend.
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
    pub query_cache_size: usize,
    /// Expire cached query embeddings after this long.
    #[serde(default, with = "humantime_serde")]
    pub query_cache_ttl: Option<Duration>,
    /// Drop cached query embeddings whenever the lexical index and
    /// vocabulary are rebuilt.
    pub clear_query_cache_on_rebuild: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "hash".to_string(),
            dims: 384,
            endpoint: String::new(),
            model: "all-MiniLM-L6-v2".to_string(),
            api_key_env: None,
            timeout_secs: 10,
            query_cache_size: 256,
            query_cache_ttl: None,
            clear_query_cache_on_rebuild: false,
        }
    }
}

impl EmbeddingConfig {
    fn merge(&mut self, patch: EmbeddingPatch) {
        if let Some(value) = patch.backend {
            self.backend = value;
        }
        if let Some(value) = patch.dims {
            self.dims = value;
        }
        if let Some(value) = patch.endpoint {
            self.endpoint = value;
        }
        if let Some(value) = patch.model {
            self.model = value;
        }
        if let Some(value) = patch.api_key_env {
            self.api_key_env = Some(value);
        }
        if let Some(value) = patch.timeout_secs {
            self.timeout_secs = value;
        }
        if let Some(value) = patch.query_cache_size {
            self.query_cache_size = value;
        }
        if let Some(value) = patch.query_cache_ttl {
            self.query_cache_ttl = Some(value);
        }
        if let Some(value) = patch.clear_query_cache_on_rebuild {
            self.clear_query_cache_on_rebuild = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// `none` or `api`.
    pub backend: String,
    /// Cross-encoder `/rerank` endpoint, used by the `api` backend.
    pub endpoint: String,
    pub model: String,
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            backend: "none".to_string(),
            endpoint: String::new(),
            model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
            api_key_env: None,
            timeout_secs: 10,
        }
    }
}

impl RerankConfig {
    fn merge(&mut self, patch: RerankPatch) {
        if let Some(value) = patch.backend {
            self.backend = value;
        }
        if let Some(value) = patch.endpoint {
            self.endpoint = value;
        }
        if let Some(value) = patch.model {
            self.model = value;
        }
        if let Some(value) = patch.api_key_env {
            self.api_key_env = Some(value);
        }
        if let Some(value) = patch.timeout_secs {
            self.timeout_secs = value;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database holding the `listings` table.
    pub database: Option<PathBuf>,
}

impl StoreConfig {
    fn merge(&mut self, patch: StorePatch) {
        if let Some(value) = patch.database {
            self.database = Some(value);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub search: Option<SearchPatch>,
    pub embedding: Option<EmbeddingPatch>,
    pub rerank: Option<RerankPatch>,
    pub store: Option<StorePatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchPatch {
    pub dense_weight: Option<f32>,
    pub min_score: Option<f32>,
    pub top_k: Option<usize>,
    pub candidate_window: Option<usize>,
    pub use_reranker: Option<bool>,
    pub rerank_top_n: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EmbeddingPatch {
    pub backend: Option<String>,
    pub dims: Option<usize>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_secs: Option<u64>,
    pub query_cache_size: Option<usize>,
    #[serde(default, with = "humantime_serde")]
    pub query_cache_ttl: Option<Duration>,
    pub clear_query_cache_on_rebuild: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RerankPatch {
    pub backend: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StorePatch {
    pub database: Option<PathBuf>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|value| {
        matches!(
            value.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<u64>().map(Some).map_err(|err| {
            ExoError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_usize(key: &str) -> Result<Option<usize>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<usize>().map(Some).map_err(|err| {
            ExoError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_f32(key: &str) -> Result<Option<f32>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<f32>().map(Some).map_err(|err| {
            ExoError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}
