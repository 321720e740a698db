//! Database migrations

use rusqlite::Connection;

use crate::error::Result;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    tracing::debug!("Document store schema at version {}", CURRENT_VERSION);
    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Migration to version 1: one table holding every collection's documents
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (collection, id)
        );
        CREATE INDEX IF NOT EXISTS idx_documents_updated ON documents(collection, updated_at DESC);
        INSERT INTO schema_version (version) VALUES (1);
        COMMIT;",
    )?;
    Ok(())
}

/// Migration to version 2: index the fields the list views filter and sort on
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;
        CREATE INDEX IF NOT EXISTS idx_visits_client
            ON documents(json_extract(data, '$.clientId'), json_extract(data, '$.dt'))
            WHERE collection = 'visits';
        CREATE INDEX IF NOT EXISTS idx_clients_customer_number
            ON documents(json_extract(data, '$.customerNumber'))
            WHERE collection = 'clients';
        CREATE INDEX IF NOT EXISTS idx_clients_pet_name
            ON documents(json_extract(data, '$.petName'))
            WHERE collection = 'clients';
        INSERT INTO schema_version (version) VALUES (2);
        COMMIT;",
    )?;
    Ok(())
}
