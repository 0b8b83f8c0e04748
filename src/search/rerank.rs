//! Precision re-ranking of the top candidate slice
//!
//! A re-ranker scores (query, document) pairs jointly, cross-encoder style.
//! Raw model outputs are logits; [`sigmoid`] squashes them into `[0, 1]` so
//! they can replace fused scores directly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::RerankConfig;
use crate::error::{ExoError, Result};
use crate::search::embeddings_api::map_http_error;

pub trait Reranker: Send + Sync {
    /// Raw relevance logits, one per document, in input order.
    fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>>;

    fn name(&self) -> &str;

    /// False for the disabled backend; ranking then skips the re-rank step.
    fn is_enabled(&self) -> bool {
        true
    }

    fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}

/// Build a re-ranker from config, falling back to [`NullReranker`] when the
/// configured backend is unusable.
pub fn build_reranker(config: &RerankConfig) -> Box<dyn Reranker> {
    let backend = config.backend.trim().to_lowercase();
    let built: Result<Box<dyn Reranker>> = match backend.as_str() {
        "" | "none" | "disabled" | "null" => Ok(Box::new(NullReranker)),
        "api" => ApiReranker::from_config(config).map(|r| Box::new(r) as Box<dyn Reranker>),
        other => Err(ExoError::Config(format!("unknown rerank backend: {other}"))),
    };

    built.unwrap_or_else(|err| {
        tracing::warn!(
            backend = %config.backend,
            error = %err,
            "re-ranking backend unavailable, re-ranking disabled"
        );
        Box::new(NullReranker)
    })
}

/// Disabled backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReranker;

impl Reranker for NullReranker {
    fn score(&self, _query: &str, documents: &[String]) -> Result<Vec<f32>> {
        Ok(vec![0.0; documents.len()])
    }

    fn name(&self) -> &str {
        "none"
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Remote cross-encoder speaking the text-embeddings-inference `/rerank`
/// protocol:
///
/// ```text
/// POST {endpoint}
/// {"query": "...", "texts": ["...", ...], "raw_scores": true}
///
/// 200 OK
/// [{"index": 1, "score": 4.2}, {"index": 0, "score": -1.3}]
/// ```
pub struct ApiReranker {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for ApiReranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiReranker")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    texts: &'a [String],
    raw_scores: bool,
}

#[derive(Debug, Deserialize)]
struct RerankScore {
    index: usize,
    score: f32,
}

impl ApiReranker {
    pub fn from_config(config: &RerankConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(ExoError::Config(
                "rerank endpoint is empty; set [rerank].endpoint".to_string(),
            ));
        }

        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|key| std::env::var(key).ok())
            .filter(|key| !key.trim().is_empty());

        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ExoError::Config(format!("rerank http client: {err}")))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            client,
        })
    }
}

impl Reranker for ApiReranker {
    fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client.post(&self.endpoint).json(&RerankRequest {
            model: &self.model,
            query,
            texts: documents,
            raw_scores: true,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|err| match map_http_error(err) {
            ExoError::Embedding(msg) => ExoError::Rerank(msg),
            other => other,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExoError::Rerank(format!(
                "rerank endpoint returned {status}"
            )));
        }

        let scores: Vec<RerankScore> = response
            .json()
            .map_err(|err| ExoError::Rerank(format!("invalid rerank response: {err}")))?;

        let mut out = vec![None; documents.len()];
        for item in scores {
            let slot = out.get_mut(item.index).ok_or_else(|| {
                ExoError::Rerank(format!("rerank index {} out of range", item.index))
            })?;
            *slot = Some(item.score);
        }
        out.into_iter()
            .enumerate()
            .map(|(i, score)| {
                score.ok_or_else(|| ExoError::Rerank(format!("no score for document {i}")))
            })
            .collect()
    }

    fn name(&self) -> &str {
        "api"
    }

    fn warm_up(&self) -> Result<()> {
        self.score("warm up", &["warm up".to_string()]).map(|_| ())
    }
}

/// Logistic squashing of a raw logit into `[0, 1]`.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
