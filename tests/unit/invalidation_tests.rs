use std::sync::Arc;
use std::thread;

use exo_search::storage::ListingDocument;
use exo_search::test_utils::fixtures::{EngineFixture, sample_listings};
use exo_search::test_utils::logging::TestLogger;

fn contains(hits: &[exo_search::search::SearchHit], id: i64) -> bool {
    hits.iter().any(|hit| hit.listing_id == id)
}

#[test]
fn laptop_invalidation_scenario() {
    let log = TestLogger::new("laptop_invalidation_scenario");
    let fixture = EngineFixture::new(vec![ListingDocument::new(
        1,
        "Mobile Phone",
        "Used, good condition",
    )]);

    fixture
        .store
        .upsert(ListingDocument::new(2, "Laptop", "Lightly used"));
    fixture.engine.invalidate(2);
    let hits = fixture.engine.search("laptop", 10, 0.35);
    log.log_actual(&hits);
    assert!(contains(&hits, 2));

    fixture.engine.invalidate(2);
    fixture.store.delete(2);
    let hits = fixture.engine.search("laptop", 10, 0.35);
    log.log_actual(&hits);
    assert!(!contains(&hits, 2));
    log.pass();
}

#[test]
fn deactivated_listing_disappears() {
    let fixture = EngineFixture::sample();
    assert!(contains(&fixture.engine.search("bicycle", 10, 0.35), 4));

    assert!(fixture.store.deactivate(4));
    fixture.engine.invalidate(4);

    assert!(!contains(&fixture.engine.search("bicycle", 10, 0.35), 4));
    assert_eq!(fixture.engine.stats().listings, sample_listings().len() - 1);
}

#[test]
fn edited_listing_is_re_embedded() {
    let fixture = EngineFixture::sample();
    assert!(contains(&fixture.engine.search("bicycle", 10, 0.35), 4));

    fixture.store.upsert(
        ListingDocument::new(4, "Electric Scooter", "Foldable, 25 km range").with_category("Sports"),
    );
    fixture.engine.invalidate(4);

    assert!(!contains(&fixture.engine.search("bicycle", 10, 0.35), 4));
    let hits = fixture.engine.search("scooter", 10, 0.35);
    assert_eq!(hits.first().map(|hit| hit.listing_id), Some(4));
    assert_eq!(fixture.engine.stats().embedded, sample_listings().len());
}

#[test]
fn invalidate_twice_equals_once() {
    let once = EngineFixture::sample();
    let twice = EngineFixture::sample();
    once.engine.search("phone", 10, 0.35);
    twice.engine.search("phone", 10, 0.35);

    once.engine.invalidate(1);
    twice.engine.invalidate(1);
    twice.engine.invalidate(1);

    for query in ["phone", "mobile", "used laptop"] {
        assert_eq!(
            once.engine.search(query, 10, 0.35),
            twice.engine.search(query, 10, 0.35)
        );
    }
    assert_eq!(once.engine.stats(), twice.engine.stats());
}

#[test]
fn invalidate_unknown_id_is_harmless() {
    let fixture = EngineFixture::sample();
    fixture.engine.invalidate(9_999);
    fixture.engine.invalidate(-1);
    assert!(!fixture.engine.search("phone", 10, 0.35).is_empty());
}

#[test]
fn new_listing_found_without_invalidate() {
    let fixture = EngineFixture::sample();
    fixture.engine.search("phone", 10, 0.35);

    fixture
        .store
        .upsert(ListingDocument::new(7, "Acoustic Guitar", "Six strings, with case"));
    let hits = fixture.engine.search("guitar", 10, 0.35);
    assert_eq!(hits.first().map(|hit| hit.listing_id), Some(7));
}

#[test]
fn concurrent_search_and_invalidate() {
    let fixture = EngineFixture::sample();
    let engine = Arc::new(fixture.engine);
    let store = fixture.store;

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let engine = Arc::clone(&engine);
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for round in 0..20i64 {
                    if worker % 2 == 0 {
                        let id = 100 + worker * 100 + round;
                        store.upsert(ListingDocument::new(id, "Mobile Charger", "Fast charging"));
                        engine.invalidate(id);
                    } else {
                        let hits = engine.search("mobile", 50, 0.35);
                        for pair in hits.windows(2) {
                            assert!(pair[0].score >= pair[1].score);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let hits = engine.search("charger", 200, 0.35);
    assert_eq!(hits.iter().filter(|hit| hit.title == "Mobile Charger").count(), 80);
}
