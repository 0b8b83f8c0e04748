use std::collections::HashSet;
use std::sync::Arc;

use exo_search::config::Config;
use exo_search::search::{MatchType, SearchEngine, SearchHit, SearchOptions};
use exo_search::storage::{InMemoryListingStore, ListingDocument};
use exo_search::test_utils::fixtures::{EngineFixture, sample_listings};
use exo_search::test_utils::logging::TestLogger;

fn assert_sorted_unique(hits: &[SearchHit]) {
    for pair in hits.windows(2) {
        assert!(
            pair[0].score >= pair[1].score,
            "results not sorted: {} before {}",
            pair[0].score,
            pair[1].score
        );
    }
    let ids: HashSet<_> = hits.iter().map(|hit| hit.listing_id).collect();
    assert_eq!(ids.len(), hits.len(), "duplicate listing ids in results");
}

fn ids(hits: &[SearchHit]) -> Vec<i64> {
    hits.iter().map(|hit| hit.listing_id).collect()
}

#[test]
fn mobile_round_trip() {
    let log = TestLogger::new("mobile_round_trip");
    let fixture = EngineFixture::new(vec![ListingDocument::new(
        1,
        "Mobile Phone",
        "Used, good condition",
    )]);

    let hits = fixture.engine.search("mobile", 10, 0.35);
    log.log_actual(&hits);

    assert!(ids(&hits).contains(&1));
    let hit = &hits[0];
    assert!(matches!(hit.match_type, MatchType::Exact | MatchType::Hybrid));
    assert_eq!(hit.title, "Mobile Phone");
    log.pass();
}

#[test]
fn typo_is_tolerated() {
    let fixture = EngineFixture::new(vec![ListingDocument::new(
        1,
        "Mobile Phone",
        "Used, good condition",
    )]);

    let hits = fixture.engine.search("mobil", 10, 0.35);

    assert_eq!(ids(&hits), vec![1]);
    assert!(hits[0].ngram > 0.0);
}

#[test]
fn typo_corrected_against_vocabulary() {
    let fixture = EngineFixture::sample();
    let hits = fixture.engine.search("labtop", 10, 0.35);

    assert_eq!(hits.first().map(|hit| hit.listing_id), Some(2));
    assert_eq!(hits[0].match_type, MatchType::Exact);
}

#[test]
fn exact_title_word_is_floored() {
    let log = TestLogger::new("exact_title_word_is_floored");
    let fixture = EngineFixture::sample();

    let hits = fixture.engine.search("phone", 20, 0.35);
    log.log_input("query", &"phone");
    log.log_expected(&[1, 5]);
    log.log_actual(&ids(&hits));

    for id in [1, 5] {
        let hit = hits
            .iter()
            .find(|hit| hit.listing_id == id)
            .unwrap_or_else(|| panic!("listing {id} missing"));
        assert_eq!(hit.match_type, MatchType::Exact);
        assert!(hit.score >= 0.96);
    }
    assert_sorted_unique(&hits);
    log.pass();
}

#[test]
fn category_word_matches() {
    let fixture = EngineFixture::sample();
    let hits = fixture.engine.search("furniture", 10, 0.35);
    assert_eq!(hits.first().map(|hit| hit.listing_id), Some(3));
}

#[test]
fn short_query_without_signal_is_filtered() {
    let fixture = EngineFixture::sample();
    assert!(fixture.engine.search("tv", 10, 0.0).is_empty());
}

#[test]
fn unrelated_query_returns_nothing() {
    let fixture = EngineFixture::sample();
    for query in ["winter jacket", "acoustic guitar"] {
        let hits = fixture.engine.search(query, 10, 0.35);
        assert!(hits.is_empty(), "{query}: {:?}", ids(&hits));
    }
}

#[test]
fn stopword_only_query_returns_nothing() {
    let fixture = EngineFixture::new(vec![
        ListingDocument::new(1, "The Who Poster", "Framed, 1971 tour"),
        ListingDocument::new(2, "Mobile Phone", "Used, good condition"),
    ]);

    assert!(fixture.engine.search("the", 10, 0.0).is_empty());
    assert!(fixture.engine.search("The  And", 10, 0.0).is_empty());

    let hits = fixture.engine.search("the who", 10, 0.35);
    assert_eq!(hits.first().map(|hit| hit.listing_id), Some(1));
    assert_eq!(hits[0].match_type, MatchType::Exact);
}

#[test]
fn blank_queries_return_nothing() {
    let fixture = EngineFixture::sample();
    for query in ["", " ", "\t\n  "] {
        assert!(fixture.engine.search(query, 10, 0.35).is_empty());
        assert!(fixture.engine.try_search(query, 10, 0.35).unwrap().is_empty());
    }
}

#[test]
fn empty_corpus_returns_nothing() {
    let fixture = EngineFixture::new(Vec::new());
    assert!(fixture.engine.search("mobile", 10, 0.35).is_empty());
    assert!(fixture.engine.try_search("mobile", 10, 0.35).unwrap().is_empty());
}

#[test]
fn results_sorted_and_unique_for_many_queries() {
    let fixture = EngineFixture::sample();
    for query in [
        "phone",
        "mobile phone case",
        "gaming laptop",
        "used",
        "pune",
        "wooden table",
        "front",
        "xyz",
        "mob",
    ] {
        let hits = fixture.engine.search(query, 20, 0.0);
        assert_sorted_unique(&hits);
    }
}

#[test]
fn top_k_truncates() {
    let fixture = EngineFixture::sample();
    let all = fixture.engine.search("phone", 20, 0.0);
    let one = fixture.engine.search("phone", 1, 0.0);

    assert!(all.len() >= 2);
    assert_eq!(one.len(), 1);
    assert_eq!(one[0].listing_id, all[0].listing_id);
    assert!(fixture.engine.search("phone", 0, 0.0).is_empty());
}

#[test]
fn raising_min_score_never_adds_results() {
    let fixture = EngineFixture::sample();
    for query in ["phone", "used laptop", "mountain"] {
        let mut previous = usize::MAX;
        for step in 0..=10 {
            let min_score = step as f32 / 10.0;
            let count = fixture.engine.search(query, 50, min_score).len();
            assert!(count <= previous, "{query}: {count} > {previous} at {min_score}");
            previous = count;
        }
    }
}

#[test]
fn null_embedder_falls_back_to_lexical() {
    let mut config = Config::default();
    config.embedding.backend = "none".to_string();
    let store = Arc::new(InMemoryListingStore::with_listings(sample_listings()));
    let engine = SearchEngine::new(store, &config);

    let hits = engine.search("gaming laptop", 10, 0.35);

    assert_eq!(hits.first().map(|hit| hit.listing_id), Some(2));
    assert!(hits.iter().all(|hit| hit.dense == 0.0));
    let stats = engine.stats();
    assert_eq!(stats.embedder, "none");
    assert_eq!(stats.embedded, 0);
}

#[test]
fn lexical_only_match_is_hybrid() {
    let fixture = EngineFixture::new(vec![
        ListingDocument::new(1, "Gaming Laptop", "Fast notebook with charger"),
        ListingDocument::new(2, "Wooden Table", "Solid teak"),
    ]);

    let hits = fixture.engine.search("notebook", 10, 0.35);

    assert_eq!(ids(&hits), vec![1]);
    assert_eq!(hits[0].match_type, MatchType::Hybrid);
    assert!(hits[0].lexical > 0.99);
}

#[test]
fn search_options_disable_rerank() {
    let fixture = EngineFixture::sample();
    let options = SearchOptions {
        rerank: false,
        ..fixture.engine.default_options()
    };
    let hits = fixture.engine.search_with("washing machine", &options);
    assert_eq!(hits.first().map(|hit| hit.listing_id), Some(6));
}

#[test]
fn hits_serialize_with_lowercase_match_type() {
    let fixture = EngineFixture::sample();
    let hits = fixture.engine.search("bicycle", 5, 0.35);
    let json = serde_json::to_value(&hits).unwrap();

    assert_eq!(json[0]["listing_id"], 4);
    assert_eq!(json[0]["match_type"], "exact");
    assert!(json[0]["score"].as_f64().unwrap() >= 0.96);
}
