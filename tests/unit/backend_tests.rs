use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;

use exo_search::config::{Config, EmbeddingConfig, RerankConfig};
use exo_search::search::rerank::sigmoid;
use exo_search::search::{
    ApiEmbedder, ApiReranker, Embedder, HashEmbedder, MatchType, Reranker, SearchEngine,
};
use exo_search::storage::{InMemoryListingStore, ListingDocument};

fn embedding_config(endpoint: String, timeout_secs: u64) -> EmbeddingConfig {
    EmbeddingConfig {
        backend: "api".to_string(),
        endpoint,
        dims: 3,
        timeout_secs,
        ..EmbeddingConfig::default()
    }
}

fn rerank_config(endpoint: String) -> RerankConfig {
    RerankConfig {
        backend: "api".to_string(),
        endpoint,
        timeout_secs: 2,
        ..RerankConfig::default()
    }
}

fn single_listing_store(title: &str, description: &str) -> Arc<InMemoryListingStore> {
    Arc::new(InMemoryListingStore::with_listings([ListingDocument::new(
        1,
        title,
        description,
    )]))
}

#[test]
fn api_embedder_parses_and_normalizes() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200)
            .json_body(json!({"data": [{"index": 0, "embedding": [3.0, 4.0, 0.0]}]}));
    });

    let embedder =
        ApiEmbedder::from_config(&embedding_config(server.url("/v1/embeddings"), 5)).unwrap();
    let vector = embedder.embed("mobile").unwrap();

    assert_eq!(vector.len(), 3);
    assert!((vector[0] - 0.6).abs() < 1e-6);
    assert!((vector[1] - 0.8).abs() < 1e-6);
}

#[test]
fn api_embedder_rejects_wrong_dimension() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200)
            .json_body(json!({"data": [{"embedding": [1.0, 0.0]}]}));
    });

    let embedder =
        ApiEmbedder::from_config(&embedding_config(server.url("/v1/embeddings"), 5)).unwrap();
    let err = embedder.embed("mobile").unwrap_err();
    assert!(err.is_backend_unavailable());
}

#[test]
fn api_embedder_server_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(503);
    });

    let embedder =
        ApiEmbedder::from_config(&embedding_config(server.url("/v1/embeddings"), 5)).unwrap();
    assert!(embedder.embed("mobile").is_err());
}

#[test]
fn engine_uses_remote_embeddings() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200)
            .json_body(json!({"data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]}));
    });

    let mut config = Config::default();
    config.embedding = embedding_config(server.url("/v1/embeddings"), 5);
    let engine = SearchEngine::new(single_listing_store("Mobile Phone", "Used"), &config);

    let hits = engine.search("mobile", 10, 0.35);

    assert_eq!(hits.len(), 1);
    assert!((hits[0].dense - 1.0).abs() < 1e-5);
    let stats = engine.stats();
    assert_eq!(stats.embedder, "api");
    assert_eq!(stats.embedded, 1);
}

#[test]
fn embedding_timeout_degrades_to_lexical() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200)
            .delay(Duration::from_secs(3))
            .json_body(json!({"data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]}));
    });

    let mut config = Config::default();
    config.embedding = embedding_config(server.url("/v1/embeddings"), 1);
    let engine = SearchEngine::new(single_listing_store("Mobile Phone", "Used"), &config);

    let hits = engine.search("mobile", 10, 0.35);

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].dense, 0.0);
    assert_eq!(hits[0].match_type, MatchType::Exact);
    // Zero vectors from a failed backend are never cached
    let stats = engine.stats();
    assert_eq!(stats.embedded, 0);
    assert_eq!(stats.query_cache_entries, 0);
}

#[test]
fn unreachable_embedding_backend_at_startup() {
    let mut config = Config::default();
    config.embedding.backend = "api".to_string();
    config.embedding.endpoint = String::new();
    let engine = SearchEngine::new(single_listing_store("Mobile Phone", "Used"), &config);

    assert_eq!(engine.stats().embedder, "none");
    assert_eq!(engine.search("mobile", 10, 0.35).len(), 1);
}

#[test]
fn api_reranker_orders_scores_by_index() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path("/rerank")
            .json_body_includes(r#"{"raw_scores": true}"#);
        then.status(200)
            .json_body(json!([{"index": 1, "score": 2.5}, {"index": 0, "score": -1.0}]));
    });

    let reranker = ApiReranker::from_config(&rerank_config(server.url("/rerank"))).unwrap();
    let scores = reranker
        .score("phone", &["first".to_string(), "second".to_string()])
        .unwrap();

    assert_eq!(scores, vec![-1.0, 2.5]);
}

#[test]
fn reranker_replaces_top_scores() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/rerank");
        then.status(200).json_body(json!([{"index": 0, "score": 3.0}]));
    });

    let store = single_listing_store("Gaming Laptop", "Fast notebook with charger");
    let mut config = Config::default();
    config.rerank = rerank_config(server.url("/rerank"));
    let engine = SearchEngine::with_backends(
        store,
        &config,
        Box::new(HashEmbedder::new(config.embedding.dims)),
        Box::new(ApiReranker::from_config(&config.rerank).unwrap()),
    );

    let hits = engine.search("notebook", 10, 0.35);

    assert_eq!(hits.len(), 1);
    assert!((hits[0].score - sigmoid(3.0)).abs() < 1e-5);
    assert_eq!(hits[0].match_type, MatchType::Hybrid);
    assert_eq!(engine.stats().reranker, "api");
}

#[test]
fn reranker_failure_keeps_fused_order() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/rerank");
        then.status(500);
    });

    let mut config = Config::default();
    config.rerank = rerank_config(server.url("/rerank"));
    let engine = SearchEngine::new(
        single_listing_store("Gaming Laptop", "Fast notebook with charger"),
        &config,
    );

    let hits = engine.search("notebook", 10, 0.35);

    assert_eq!(hits.len(), 1);
    assert!(hits[0].lexical > 0.99);
    assert!((hits[0].score - sigmoid(3.0)).abs() > 1e-3);
}

#[test]
fn short_queries_skip_reranker() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/rerank");
        then.status(200).json_body(json!([{"index": 0, "score": -10.0}]));
    });

    let mut config = Config::default();
    config.rerank = rerank_config(server.url("/rerank"));
    let engine = SearchEngine::new(single_listing_store("Gaming Laptop", "Fast"), &config);

    let hits = engine.search("gam", 10, 0.35);

    assert_eq!(hits.len(), 1);
    assert!(hits[0].score >= 0.96);
    mock.assert_hits(0);
}
