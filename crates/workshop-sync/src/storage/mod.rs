//! Local store for workshop-sync.
//!
//! This module provides `SQLite`-based durable storage for records captured
//! while offline. Records wait in their [`Collection`] until a sync drains
//! them; a full drain parks them in the `queue` table until the remote
//! service has answered.
//!
//! All operations are `async`. The connection sits behind a mutex and every
//! statement runs on tokio's blocking pool, so callers yield while `SQLite`
//! works and operations are applied one at a time in the order they acquire
//! the connection.

pub mod migrations;
pub mod schema;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::record::{Collection, Fields, Record};

/// Durable client-side storage for pending records.
///
/// Cloning is cheap; clones share the one open connection.
#[derive(Debug, Clone)]
pub struct LocalStore {
    /// Path to the database file.
    path: PathBuf,
    /// Shared database connection.
    conn: Arc<Mutex<Connection>>,
}

/// A record a full drain has moved into the in-flight queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRecord {
    /// Row id in the queue table.
    pub queue_id: i64,
    /// Collection the record was drained from.
    pub collection: Collection,
    /// The record, with its original id and timestamp.
    pub record: Record,
}

impl LocalStore {
    /// Open or create a store at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// and brings the schema up to date. Opening the same path again is safe.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails; see [`Error::is_storage_unavailable`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening local store at {}", path.display());
        let mut conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|source| Error::DatabaseOpen {
                path: path.clone(),
                source,
            })?;

        migrations::initialize_schema(&mut conn).map_err(|err| match err {
            Error::DatabaseQuery(source) => Error::DatabaseOpen {
                path: path.clone(),
                source,
            },
            other => other,
        })?;

        info!("Local store opened at {}", path.display());
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&mut conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::internal("local store connection lock poisoned"))?;
            op(&mut guard)
        })
        .await
        .map_err(|e| Error::internal(format!("local store task failed: {e}")))?
    }

    /// Append a record to a collection.
    ///
    /// The record is stamped with the current time and an identifier, and is
    /// committed before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot commit.
    pub async fn add(&self, collection: Collection, fields: Fields) -> Result<Record> {
        let record = Record::new(fields);
        self.with_conn(move |conn| {
            let fields_json = serde_json::to_string(&record.fields)?;
            conn.execute(
                &format!("INSERT INTO {collection} (created_at, fields) VALUES (?1, ?2)"),
                params![encode_timestamp(record.created_at), fields_json],
            )?;

            let id = conn.last_insert_rowid();
            debug!("Queued {} record with id {}", collection, id);
            Ok(Record {
                id: Some(id),
                ..record
            })
        })
        .await
    }

    /// Get every pending record in a collection, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn get_all(&self, collection: Collection) -> Result<Vec<Record>> {
        self.with_conn(move |conn| select_all(conn, collection))
            .await
    }

    /// Remove every record from a collection.
    ///
    /// Returns the number of records removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn clear(&self, collection: Collection) -> Result<usize> {
        self.with_conn(move |conn| {
            let removed = conn.execute(&format!("DELETE FROM {collection}"), [])?;
            debug!("Cleared {} record(s) from {}", removed, collection);
            Ok(removed)
        })
        .await
    }

    /// Read and clear a collection in one transaction.
    ///
    /// A record added concurrently lands either in the returned set or in the
    /// collection afterwards, never in neither.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; the collection is left untouched.
    pub async fn drain(&self, collection: Collection) -> Result<Vec<Record>> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let records = select_all(&tx, collection)?;
            tx.execute(&format!("DELETE FROM {collection}"), [])?;
            tx.commit()?;
            Ok(records)
        })
        .await
    }

    /// Count pending records per collection.
    ///
    /// Every collection appears in the result, including empty ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn pending_counts(&self) -> Result<BTreeMap<Collection, usize>> {
        self.with_conn(|conn| {
            let mut counts = BTreeMap::new();
            for collection in Collection::ALL {
                counts.insert(collection, count_rows(conn, collection.as_str())?);
            }
            Ok(counts)
        })
        .await
    }

    /// Move every pending record into the in-flight queue.
    ///
    /// Collections are visited in [`Collection::ALL`] order and records in
    /// insertion order, all inside one transaction. Rows already in the queue
    /// (left behind by an interrupted sync) are returned first.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; nothing is moved in that case.
    pub async fn stage_all(&self) -> Result<Vec<StagedRecord>> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let staged_at = encode_timestamp(Utc::now());
            let mut moved = 0usize;

            for collection in Collection::ALL {
                let records = select_all(&tx, collection)?;
                if records.is_empty() {
                    continue;
                }
                for record in &records {
                    tx.execute(
                        r"
                        INSERT INTO queue (collection, record_id, created_at, fields, staged_at)
                        VALUES (?1, ?2, ?3, ?4, ?5)
                        ",
                        params![
                            collection.as_str(),
                            record.id,
                            encode_timestamp(record.created_at),
                            serde_json::to_string(&record.fields)?,
                            staged_at,
                        ],
                    )?;
                }
                tx.execute(&format!("DELETE FROM {collection}"), [])?;
                moved += records.len();
            }

            let staged = select_queue(&tx)?;
            tx.commit()?;

            if staged.len() > moved {
                warn!(
                    "Resuming {} record(s) left in flight by an earlier sync",
                    staged.len() - moved
                );
            }
            debug!("Staged {} record(s) for sync", staged.len());
            Ok(staged)
        })
        .await
    }

    /// Drop queue rows whose batch has been handed off for good.
    ///
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails.
    pub async fn settle(&self, queue_ids: Vec<i64>) -> Result<usize> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut removed = 0;
            for queue_id in &queue_ids {
                removed += tx.execute("DELETE FROM queue WHERE id = ?1", [queue_id])?;
            }
            tx.commit()?;
            Ok(removed)
        })
        .await
    }

    /// Put queue rows back into their collections.
    ///
    /// Records keep their original id and timestamp, so they sort back into
    /// their original position. Returns the number of records restored.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; the queue is left untouched.
    pub async fn restore(&self, queue_ids: Vec<i64>) -> Result<usize> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let mut restored = 0;
            for queue_id in &queue_ids {
                let row: Option<(String, i64, String, String)> = tx
                    .query_row(
                        "SELECT collection, record_id, created_at, fields FROM queue WHERE id = ?1",
                        [queue_id],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                    )
                    .optional()?;
                let Some((name, record_id, created_at, fields)) = row else {
                    continue;
                };

                let collection: Collection = name.parse()?;
                restored += tx.execute(
                    &format!(
                        "INSERT OR IGNORE INTO {collection} (id, created_at, fields) VALUES (?1, ?2, ?3)"
                    ),
                    params![record_id, created_at, fields],
                )?;
                tx.execute("DELETE FROM queue WHERE id = ?1", [queue_id])?;
            }
            tx.commit()?;
            info!("Restored {} record(s) to their collections", restored);
            Ok(restored)
        })
        .await
    }

    /// Count records currently parked in the in-flight queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn in_flight(&self) -> Result<usize> {
        self.with_conn(|conn| count_rows(conn, "queue")).await
    }

    /// Read a persisted setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn setting(&self, key: &str) -> Result<Option<String>> {
        let key = setting_key(key);
        self.with_conn(move |conn| {
            let value = conn
                .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value)
        })
        .await
    }

    /// Persist a setting, replacing any earlier value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let key = setting_key(key);
        let value = value.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
            Ok(())
        })
        .await
    }

    /// Remove a persisted setting.
    ///
    /// Returns `true` if a value was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn remove_setting(&self, key: &str) -> Result<bool> {
        let key = setting_key(key);
        self.with_conn(move |conn| {
            let affected = conn.execute("DELETE FROM metadata WHERE key = ?1", [key])?;
            Ok(affected > 0)
        })
        .await
    }

    /// Get store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn stats(&self) -> Result<StorageStats> {
        let path = self.path.clone();
        self.with_conn(move |conn| {
            let mut total_pending = 0;
            let mut oldest_pending: Option<DateTime<Utc>> = None;

            for collection in Collection::ALL {
                total_pending += count_rows(conn, collection.as_str())?;

                let oldest: Option<String> = conn
                    .query_row(
                        &format!("SELECT created_at FROM {collection} ORDER BY id ASC LIMIT 1"),
                        [],
                        |row| row.get(0),
                    )
                    .optional()?;
                let oldest = oldest.and_then(|s| decode_timestamp(&s));
                oldest_pending = match (oldest_pending, oldest) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                };
            }

            let db_size_bytes = if path.to_string_lossy() == ":memory:" {
                0
            } else {
                std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0)
            };

            Ok(StorageStats {
                total_pending,
                in_flight: count_rows(conn, "queue")?,
                oldest_pending,
                db_size_bytes,
            })
        })
        .await
    }
}

/// Statistics about the local store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Records waiting in collections.
    pub total_pending: usize,
    /// Records parked in the in-flight queue.
    pub in_flight: usize,
    /// Timestamp of the oldest pending record.
    pub oldest_pending: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

/// Settings share the metadata table with the schema version.
fn setting_key(key: &str) -> String {
    format!("setting.{key}")
}

fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(usize::try_from(count).unwrap_or(0))
}

fn select_all(conn: &Connection, collection: Collection) -> Result<Vec<Record>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, created_at, fields FROM {collection} ORDER BY id ASC"
    ))?;
    let records = stmt
        .query_map([], row_to_record)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}

fn select_queue(tx: &Transaction<'_>) -> Result<Vec<StagedRecord>> {
    let mut stmt = tx.prepare(
        "SELECT id, collection, record_id, created_at, fields FROM queue ORDER BY id ASC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let queue_id: i64 = row.get(0)?;
            let collection: String = row.get(1)?;
            let record = Record {
                id: Some(row.get(2)?),
                created_at: parse_created_at(&row.get::<_, String>(3)?),
                fields: parse_fields(4, &row.get::<_, String>(4)?)?,
            };
            Ok((queue_id, collection, record))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(queue_id, collection, record)| {
            Ok(StagedRecord {
                queue_id,
                collection: collection.parse()?,
                record,
            })
        })
        .collect()
}

/// Convert a collection row to a Record.
fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<Record> {
    let id: i64 = row.get(0)?;
    let created_at: String = row.get(1)?;
    let fields: String = row.get(2)?;

    Ok(Record {
        id: Some(id),
        created_at: parse_created_at(&created_at),
        fields: parse_fields(2, &fields)?,
    })
}

fn parse_created_at(s: &str) -> DateTime<Utc> {
    decode_timestamp(s).unwrap_or_else(|| {
        warn!("Unreadable record timestamp {}, using now", s);
        Utc::now()
    })
}

fn parse_fields(column: usize, json: &str) -> rusqlite::Result<Fields> {
    serde_json::from_str(json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}
