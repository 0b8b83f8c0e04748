use std::sync::Arc;

use exo_search::config::Config;
use exo_search::search::SearchEngine;
use exo_search::storage::{ListingDocument, ListingSource, SqliteListingStore};
use exo_search::test_utils::fixtures::{DatabaseFixture, sample_listings};
use exo_search::test_utils::logging::TestLogger;

fn engine_over(store: &Arc<SqliteListingStore>) -> SearchEngine {
    SearchEngine::new(store.clone(), &Config::default())
}

#[test]
fn sqlite_backed_search() {
    let log = TestLogger::new("sqlite_backed_search");
    let fixture = DatabaseFixture::with_sample_listings().unwrap();
    let engine = engine_over(&fixture.store);

    let hits = engine.search("washing machine", 5, 0.35);
    log.log_actual(&hits);

    assert_eq!(hits.first().map(|hit| hit.listing_id), Some(6));
    assert_eq!(engine.stats().listings, sample_listings().len());
    log.pass();
}

#[test]
fn deactivate_then_invalidate() {
    let fixture = DatabaseFixture::with_sample_listings().unwrap();
    let engine = engine_over(&fixture.store);
    assert!(engine.search("bicycle", 5, 0.35).iter().any(|hit| hit.listing_id == 4));

    assert!(fixture.store.deactivate(4).unwrap());
    engine.invalidate(4);

    assert!(engine.search("bicycle", 5, 0.35).iter().all(|hit| hit.listing_id != 4));
    let row = fixture.store.get(4).unwrap().unwrap();
    assert!(!row.active);
}

#[test]
fn delete_then_invalidate() {
    let fixture = DatabaseFixture::with_sample_listings().unwrap();
    let engine = engine_over(&fixture.store);
    assert!(!engine.search("table", 5, 0.35).is_empty());

    engine.invalidate(3);
    assert!(fixture.store.delete(3).unwrap());

    assert!(engine.search("table", 5, 0.35).iter().all(|hit| hit.listing_id != 3));
    assert!(fixture.store.get(3).unwrap().is_none());
    assert!(!fixture.store.delete(3).unwrap());
}

#[test]
fn inserted_row_is_searchable() {
    let fixture = DatabaseFixture::with_sample_listings().unwrap();
    let engine = engine_over(&fixture.store);
    engine.search("phone", 5, 0.35);

    fixture
        .store
        .upsert(&ListingDocument::new(42, "Office Chair", "Ergonomic, adjustable").with_city("Pune"))
        .unwrap();
    engine.invalidate(42);

    let hits = engine.search("chair", 5, 0.35);
    assert_eq!(hits.first().map(|hit| hit.listing_id), Some(42));
}

#[test]
fn listings_persist_across_reopen() {
    let fixture = DatabaseFixture::with_sample_listings().unwrap();
    let reopened = Arc::new(SqliteListingStore::open(&fixture.db_path).unwrap());

    assert_eq!(
        reopened.fetch_active_listings().unwrap().len(),
        sample_listings().len()
    );
    let engine = engine_over(&reopened);
    assert_eq!(
        engine.search("laptop", 5, 0.35).first().map(|hit| hit.listing_id),
        Some(2)
    );
}

#[test]
fn preload_builds_index() {
    let fixture = DatabaseFixture::with_sample_listings().unwrap();
    let engine = engine_over(&fixture.store);

    engine.preload();

    let stats = engine.stats();
    assert_eq!(stats.listings, sample_listings().len());
    assert_eq!(stats.embedded, sample_listings().len());
    assert!(stats.vocabulary > 0);
}
