//! Listing store layer
//!
//! The search engine never owns listings. It reads snapshots of the active
//! set through [`ListingSource`], implemented here for the marketplace SQLite
//! database and for an in-process store.

pub mod memory;
pub mod sqlite;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use memory::InMemoryListingStore;
pub use sqlite::SqliteListingStore;

/// Stable listing identifier (SQLite `INTEGER PRIMARY KEY`).
pub type ListingId = i64;

/// A marketplace listing as seen by the search engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDocument {
    pub id: ListingId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl ListingDocument {
    /// Active listing with no category or city.
    pub fn new(id: ListingId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            category: None,
            city: None,
            active: true,
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }
}

/// Source of truth for the active listing set.
///
/// Identifiers must be unique and stable within one snapshot; iteration order
/// is not significant.
pub trait ListingSource: Send + Sync {
    fn fetch_active_listings(&self) -> Result<Vec<ListingDocument>>;
}
