use std::time::Duration;

use exo_search::ExoError;
use exo_search::config::Config;
use exo_search::test_utils::fixtures::DatabaseFixture;

#[test]
fn load_explicit_file_merges_over_defaults() {
    let fixture = DatabaseFixture::new().unwrap();
    let path = fixture
        .write_config(
            r#"
[search]
dense_weight = 0.6
top_k = 5

[embedding]
backend = "none"
query_cache_size = 32
query_cache_ttl = "30s"

[store]
database = "/tmp/market.db"
"#,
        )
        .unwrap();

    let config = Config::load(Some(&path)).unwrap();

    assert!((config.search.dense_weight - 0.6).abs() < f32::EPSILON);
    assert_eq!(config.search.top_k, 5);
    assert_eq!(config.search.candidate_window, 100);
    assert_eq!(config.embedding.query_cache_size, 32);
    assert_eq!(
        config.embedding.query_cache_ttl,
        Some(Duration::from_secs(30))
    );
    assert_eq!(
        config.store.database.as_deref(),
        Some(std::path::Path::new("/tmp/market.db"))
    );
}

#[test]
fn missing_explicit_file_is_an_error() {
    let fixture = DatabaseFixture::new().unwrap();
    let path = fixture.temp_dir.path().join("absent.toml");

    let err = Config::load(Some(&path)).unwrap_err();

    assert!(matches!(err, ExoError::MissingConfig(_)));
}

#[test]
fn invalid_values_are_rejected_on_load() {
    let fixture = DatabaseFixture::new().unwrap();
    let path = fixture
        .write_config("[search]\ndense_weight = -0.1\n")
        .unwrap();

    let err = Config::load(Some(&path)).unwrap_err();

    assert!(matches!(err, ExoError::Config(_)));
    assert!(err.to_string().contains("dense_weight"));
}

#[test]
fn unparsable_file_names_the_path() {
    let fixture = DatabaseFixture::new().unwrap();
    let path = fixture.write_config("[search]\ntop_k = \"many\"\n").unwrap();

    let err = Config::load(Some(&path)).unwrap_err();

    assert!(err.to_string().contains("config.toml"));
}

#[test]
fn config_round_trips_through_toml() {
    let mut config = Config::default();
    config.search.rerank_top_n = 4;
    config.embedding.query_cache_ttl = Some(Duration::from_secs(120));
    config.rerank.backend = "api".to_string();
    config.rerank.endpoint = "http://localhost:8080/rerank".to_string();

    let rendered = toml::to_string_pretty(&config).unwrap();
    let parsed = Config::from_toml_str(&rendered).unwrap();

    assert_eq!(parsed.search.rerank_top_n, 4);
    assert_eq!(
        parsed.embedding.query_cache_ttl,
        Some(Duration::from_secs(120))
    );
    assert_eq!(parsed.rerank.endpoint, "http://localhost:8080/rerank");
}
