//! `SQLite`-backed document store

mod migrations;
mod sql;

use std::path::Path;

use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::Mutex;

use super::{DocumentStore, Fields, Query, StoredDocument, WriteBatch, WriteOp};
use crate::error::{Error, Result};
use crate::models::RecordId;
use crate::util::unix_timestamp_millis;

/// Document store persisted in a local `SQLite` file.
///
/// Every collection shares one `documents` table; bodies are JSON and the
/// query layer reaches into them with `json_extract`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a store at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let journal_mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("SQLite journal mode: {}", journal_mode);
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        migrations::run(&conn)?;

        tracing::debug!("Opened document store at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn parse_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, Value)> {
        Ok((row.get(0)?, row.get(1)?))
    }

    fn into_document(id: String, data: Value) -> Result<StoredDocument> {
        StoredDocument::from_json(RecordId::from(id), data)
    }

    fn load_fields(conn: &Connection, collection: &str, id: &RecordId) -> Result<Option<Fields>> {
        let data: Option<Value> = conn
            .query_row(
                "SELECT data FROM documents WHERE collection = ? AND id = ?",
                params![collection, id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(Value::Object(fields)) => Ok(Some(fields)),
            Some(other) => Err(Error::Store(format!(
                "document {collection}/{id} has a non-object body: {other}"
            ))),
            None => Ok(None),
        }
    }

    fn write(conn: &Connection, op: WriteOp, now: i64) -> Result<()> {
        match op {
            WriteOp::Set {
                collection,
                id,
                fields,
            } => {
                conn.execute(
                    "INSERT INTO documents (collection, id, data, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?4)
                     ON CONFLICT(collection, id)
                     DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
                    params![collection, id.as_str(), Value::Object(fields), now],
                )?;
            }
            WriteOp::Update {
                collection,
                id,
                fields,
            } => {
                let mut existing = Self::load_fields(conn, &collection, &id)?
                    .ok_or_else(|| Error::not_found(&collection, &id))?;
                existing.extend(fields);
                conn.execute(
                    "UPDATE documents SET data = ?, updated_at = ? WHERE collection = ? AND id = ?",
                    params![Value::Object(existing), now, collection, id.as_str()],
                )?;
            }
            WriteOp::Delete { collection, id } => {
                conn.execute(
                    "DELETE FROM documents WHERE collection = ? AND id = ?",
                    params![collection, id.as_str()],
                )?;
            }
        }
        Ok(())
    }

    async fn write_one(&self, op: WriteOp) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.push(op);
        self.commit(batch).await
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn run_query(&self, query: &Query) -> Result<Vec<StoredDocument>> {
        query.validate()?;
        let compiled = sql::select(query);

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&compiled.sql)?;
        let rows = stmt
            .query_map(params_from_iter(compiled.params.iter()), Self::parse_document)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, data)| Self::into_document(id, data))
            .collect()
    }

    async fn count(&self, query: &Query) -> Result<usize> {
        query.validate()?;
        let compiled = sql::count(query);

        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(
            &compiled.sql,
            params_from_iter(compiled.params.iter()),
            |row| row.get(0),
        )?;
        usize::try_from(count).map_err(|_| Error::Store(format!("invalid row count {count}")))
    }

    async fn get(&self, collection: &str, id: &RecordId) -> Result<Option<StoredDocument>> {
        let conn = self.conn.lock().await;
        Ok(Self::load_fields(&conn, collection, id)?
            .map(|fields| StoredDocument::new(id.clone(), fields)))
    }

    async fn set(&self, collection: &str, id: &RecordId, fields: Fields) -> Result<()> {
        self.write_one(WriteOp::Set {
            collection: collection.to_string(),
            id: id.clone(),
            fields,
        })
        .await
    }

    async fn update(&self, collection: &str, id: &RecordId, fields: Fields) -> Result<()> {
        self.write_one(WriteOp::Update {
            collection: collection.to_string(),
            id: id.clone(),
            fields,
        })
        .await
    }

    async fn delete(&self, collection: &str, id: &RecordId) -> Result<bool> {
        let conn = self.conn.lock().await;
        let removed = conn.execute(
            "DELETE FROM documents WHERE collection = ? AND id = ?",
            params![collection, id.as_str()],
        )?;
        Ok(removed > 0)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let now = unix_timestamp_millis();
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for op in batch.into_ops() {
            Self::write(&tx, op, now)?;
        }
        tx.commit()?;
        Ok(())
    }
}
