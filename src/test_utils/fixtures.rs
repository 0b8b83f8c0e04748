use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use crate::config::Config;
use crate::error::Result;
use crate::search::{HashEmbedder, NullReranker, SearchEngine};
use crate::storage::{InMemoryListingStore, ListingDocument, SqliteListingStore};

/// A small marketplace corpus covering the usual query shapes.
pub fn sample_listings() -> Vec<ListingDocument> {
    vec![
        ListingDocument::new(1, "Mobile Phone", "Used, good condition")
            .with_category("Electronics")
            .with_city("Pune"),
        ListingDocument::new(2, "Gaming Laptop", "RTX graphics, fast SSD, charger included")
            .with_category("Computers")
            .with_city("Mumbai"),
        ListingDocument::new(3, "Wooden Dining Table", "Solid teak, seats six")
            .with_category("Furniture")
            .with_city("Delhi"),
        ListingDocument::new(4, "Mountain Bicycle", "21 gears, front suspension")
            .with_category("Sports")
            .with_city("Pune"),
        ListingDocument::new(5, "Phone Case", "Fits most mobile phones, shockproof")
            .with_category("Accessories"),
        ListingDocument::new(6, "Washing Machine", "Front load, 7 kg, barely used")
            .with_category("Appliances")
            .with_city("Chennai"),
    ]
}

/// In-memory store plus an engine with deterministic backends.
pub struct EngineFixture {
    pub store: Arc<InMemoryListingStore>,
    pub engine: SearchEngine,
}

impl EngineFixture {
    pub fn new(listings: Vec<ListingDocument>) -> Self {
        Self::with_config(listings, &Config::default())
    }

    pub fn with_config(listings: Vec<ListingDocument>, config: &Config) -> Self {
        let store = Arc::new(InMemoryListingStore::with_listings(listings));
        let engine = SearchEngine::with_backends(
            store.clone(),
            config,
            Box::new(HashEmbedder::new(config.embedding.dims)),
            Box::new(NullReranker),
        );
        println!("[FIXTURE] Engine over {} listings", store.len());
        Self { store, engine }
    }

    pub fn sample() -> Self {
        Self::new(sample_listings())
    }
}

/// Test fixture providing an isolated SQLite listing database.
pub struct DatabaseFixture {
    pub temp_dir: TempDir,
    pub db_path: PathBuf,
    pub store: Arc<SqliteListingStore>,
}

impl DatabaseFixture {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("listings.db");
        let store = Arc::new(SqliteListingStore::open(&db_path)?);

        println!("[FIXTURE] Created database: {}", db_path.display());

        Ok(Self {
            temp_dir,
            db_path,
            store,
        })
    }

    /// Database pre-filled with [`sample_listings`].
    pub fn with_sample_listings() -> Result<Self> {
        let fixture = Self::new()?;
        for listing in sample_listings() {
            fixture.store.upsert(&listing)?;
        }
        Ok(fixture)
    }

    /// Write a config file next to the database and return its path.
    pub fn write_config(&self, content: &str) -> Result<PathBuf> {
        let path = self.temp_dir.path().join("config.toml");
        std::fs::write(&path, content)?;
        println!(
            "[FIXTURE] Created file: {} ({} bytes)",
            path.display(),
            content.len()
        );
        Ok(path)
    }
}

impl Drop for DatabaseFixture {
    fn drop(&mut self) {
        println!(
            "[FIXTURE] Cleaning up temp directory: {}",
            self.temp_dir.path().display()
        );
    }
}
