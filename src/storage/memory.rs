use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::Result;
use crate::storage::{ListingDocument, ListingId, ListingSource};

/// Thread-safe in-process listing store.
#[derive(Debug, Default)]
pub struct InMemoryListingStore {
    listings: RwLock<BTreeMap<ListingId, ListingDocument>>,
}

impl InMemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listings(listings: impl IntoIterator<Item = ListingDocument>) -> Self {
        let store = Self::new();
        for listing in listings {
            store.upsert(listing);
        }
        store
    }

    /// Insert or replace a listing.
    pub fn upsert(&self, listing: ListingDocument) {
        self.listings.write().insert(listing.id, listing);
    }

    /// Mark a listing inactive. Returns false if it does not exist.
    pub fn deactivate(&self, id: ListingId) -> bool {
        match self.listings.write().get_mut(&id) {
            Some(listing) => {
                listing.active = false;
                true
            }
            None => false,
        }
    }

    pub fn delete(&self, id: ListingId) -> Option<ListingDocument> {
        self.listings.write().remove(&id)
    }

    pub fn get(&self, id: ListingId) -> Option<ListingDocument> {
        self.listings.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.listings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.read().is_empty()
    }
}

impl ListingSource for InMemoryListingStore {
    fn fetch_active_listings(&self) -> Result<Vec<ListingDocument>> {
        Ok(self
            .listings
            .read()
            .values()
            .filter(|listing| listing.active)
            .cloned()
            .collect())
    }
}
