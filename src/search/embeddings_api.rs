//! Remote embedding backend
//!
//! Talks to an OpenAI-compatible embeddings endpoint:
//!
//! ```text
//! POST {endpoint}
//! {"model": "all-MiniLM-L6-v2", "input": ["text", ...]}
//!
//! 200 OK
//! {"data": [{"index": 0, "embedding": [0.1, ...]}, ...]}
//! ```
//!
//! Every request is bounded by the configured timeout. Errors are returned to
//! the caller; the index manager turns them into zero vectors that are never
//! cached, so a recovered backend is used again on the next refresh.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::error::{ExoError, Result};
use crate::search::embeddings::{Embedder, l2_normalize};

pub struct ApiEmbedder {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dims: usize,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for ApiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiEmbedder")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("dims", &self.dims)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl ApiEmbedder {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(ExoError::Config(
                "embedding endpoint is empty; set [embedding].endpoint".to_string(),
            ));
        }
        if config.endpoint.starts_with("http://") {
            tracing::debug!(endpoint = %config.endpoint, "embedding endpoint uses plain HTTP");
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
            .map_err(|err| ExoError::Config(format!("embedding http client: {err}")))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            dims: config.dims,
            client,
        })
    }

    fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(map_http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExoError::Embedding(format!(
                "embedding endpoint returned {status}"
            )));
        }

        let body: EmbeddingResponse = response.json().map_err(map_http_error)?;
        if body.data.len() != texts.len() {
            return Err(ExoError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }

        let mut data = body.data;
        if data.iter().all(|datum| datum.index.is_some()) {
            data.sort_by_key(|datum| datum.index);
        }

        data.into_iter()
            .map(|datum| {
                let mut embedding = datum.embedding;
                if embedding.len() != self.dims {
                    return Err(ExoError::Embedding(format!(
                        "expected {} dimensions, got {}",
                        self.dims,
                        embedding.len()
                    )));
                }
                l2_normalize(&mut embedding);
                Ok(embedding)
            })
            .collect()
    }
}

impl Embedder for ApiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| ExoError::Embedding("empty embedding response".to_string()))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts)
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn name(&self) -> &str {
        "api"
    }

    fn warm_up(&self) -> Result<()> {
        self.embed("warm up").map(|_| ())
    }
}

pub(crate) fn map_http_error(err: reqwest::Error) -> ExoError {
    if err.is_timeout() {
        ExoError::Timeout(format!("model backend request timed out: {err}"))
    } else {
        ExoError::Embedding(format!("model backend request failed: {err}"))
    }
}
