//! `SQLite` schema definitions for the local store.
//!
//! Each [`Collection`] gets its own table so that clearing one collection never
//! touches another. Table names come from the fixed collection set, never from
//! user input.

use crate::record::Collection;

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// SQL statement to create the in-flight queue.
///
/// Rows hold records that a full drain has taken out of their collection but
/// whose batch has not yet been settled.
pub const CREATE_QUEUE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    record_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    fields TEXT NOT NULL,
    staged_at TEXT NOT NULL
)
";

/// SQL statement to create a collection table.
///
/// `AUTOINCREMENT` keeps identifiers from ever being reused, so a record put
/// back after a failed sync can keep its original id.
#[must_use]
pub fn create_collection_table(collection: Collection) -> String {
    format!(
        r"
CREATE TABLE IF NOT EXISTS {collection} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    fields TEXT NOT NULL
)
"
    )
}
