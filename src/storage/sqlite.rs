//! SQLite listing store

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, Row, params};

use crate::error::Result;
use crate::storage::{ListingDocument, ListingId, ListingSource};

/// Reads the marketplace `listings` table.
///
/// The connection is shared behind a mutex so the store can be handed to the
/// search engine as a `ListingSource`.
pub struct SqliteListingStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteListingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteListingStore").finish_non_exhaustive()
    }
}

impl SqliteListingStore {
    /// Open the database at the given path, creating the `listings` table if
    /// it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::configure_pragmas(&conn)?;
        Self::ensure_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::ensure_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn upsert(&self, listing: &ListingDocument) -> Result<()> {
        self.conn.lock().execute(
            "INSERT INTO listings (id, title, description, category, city, is_active) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(id) DO UPDATE SET \
             title = excluded.title, description = excluded.description, \
             category = excluded.category, city = excluded.city, \
             is_active = excluded.is_active",
            params![
                listing.id,
                listing.title,
                listing.description,
                listing.category,
                listing.city,
                listing.active,
            ],
        )?;
        Ok(())
    }

    /// Mark a listing inactive. Returns false if no row matched.
    pub fn deactivate(&self, id: ListingId) -> Result<bool> {
        let changed = self
            .conn
            .lock()
            .execute("UPDATE listings SET is_active = 0 WHERE id = ?", [id])?;
        Ok(changed > 0)
    }

    pub fn delete(&self, id: ListingId) -> Result<bool> {
        let changed = self
            .conn
            .lock()
            .execute("DELETE FROM listings WHERE id = ?", [id])?;
        Ok(changed > 0)
    }

    pub fn get(&self, id: ListingId) -> Result<Option<ListingDocument>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, title, description, category, city, is_active \
             FROM listings WHERE id = ?",
        )?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(listing_from_row(row)?));
        }
        Ok(None)
    }

    fn configure_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;",
        )?;
        Ok(())
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS listings (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT,
                city TEXT,
                is_active BOOLEAN DEFAULT 1
             );",
        )?;
        Ok(())
    }
}

impl ListingSource for SqliteListingStore {
    fn fetch_active_listings(&self) -> Result<Vec<ListingDocument>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, title, description, category, city, is_active \
             FROM listings WHERE is_active = 1 ORDER BY id",
        )?;
        let rows = stmt.query_map([], listing_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<ListingDocument> {
    Ok(ListingDocument {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        city: row.get(4)?,
        active: row.get::<_, Option<i64>>(5)?.unwrap_or(1) != 0,
    })
}
