//! Database migration system for the local store.
//!
//! The schema version lives in the metadata table. Opening a store on an older
//! version runs each missing migration in order; every statement is
//! `IF NOT EXISTS`, so re-running is harmless.

use rusqlite::Connection;

use crate::error::{Error, Result};
use crate::record::Collection;

use super::schema::{create_collection_table, CREATE_METADATA_TABLE, CREATE_QUEUE_TABLE};

/// The current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Initialize the database schema.
///
/// Creates the metadata table, then runs any pending migrations to bring the
/// schema up to the current version.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn initialize_schema(conn: &mut Connection) -> Result<()> {
    conn.execute(CREATE_METADATA_TABLE, [])?;

    let version = get_schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }
    if version < CURRENT_VERSION {
        run_migrations(conn, version)?;
    }

    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run migrations from the given version to the current version.
///
/// All steps share one transaction; a failure leaves the old version intact.
fn run_migrations(conn: &mut Connection, from_version: i32) -> Result<()> {
    let tx = conn.transaction()?;
    let mut current = from_version;

    while current < CURRENT_VERSION {
        current += 1;
        run_migration(&tx, current)?;
    }

    set_schema_version(&tx, CURRENT_VERSION)?;
    tx.commit()?;
    Ok(())
}

/// Run a specific migration version.
fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        2 => migrate_v2(conn),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

/// Version 1: one table per collection.
fn migrate_v1(conn: &Connection) -> Result<()> {
    for collection in Collection::ALL {
        conn.execute(&create_collection_table(collection), [])?;
    }
    Ok(())
}

/// Version 2: the in-flight queue used by full drains.
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_QUEUE_TABLE, [])?;
    Ok(())
}
