//! Document store boundary.
//!
//! The records of every collection live in a document store that offers
//! filtered, ordered, cursor-bounded queries plus per-document writes. The
//! [`DocumentStore`] trait is the only thing the rest of the crate knows about
//! it; [`MemoryStore`] and [`SqliteStore`] are the two implementations.

mod memory;
mod query;
mod sqlite;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::RecordId;

pub use memory::{MemoryStore, StoreOp};
pub use query::{
    compare_values, CursorMarker, Direction, Filter, OrderBy, Query, StartBound, ID_FIELD,
};
pub use sqlite::SqliteStore;

/// Named field values of one document
pub type Fields = Map<String, Value>;

static NULL: Value = Value::Null;

/// A document as returned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: RecordId,
    pub fields: Fields,
}

impl StoredDocument {
    pub const fn new(id: RecordId, fields: Fields) -> Self {
        Self { id, fields }
    }

    /// Build a document from a JSON object literal
    pub fn from_json(id: impl Into<RecordId>, value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self::new(id.into(), fields)),
            other => Err(Error::InvalidInput(format!(
                "document body must be an object, got {other}"
            ))),
        }
    }

    /// Field value, `null` when absent
    pub fn value(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&NULL)
    }
}

/// One write inside a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set {
        collection: String,
        id: RecordId,
        fields: Fields,
    },
    Update {
        collection: String,
        id: RecordId,
        fields: Fields,
    },
    Delete {
        collection: String,
        id: RecordId,
    },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            Self::Set { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. } => collection,
        }
    }
}

/// Writes that a store applies all together or not at all
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, collection: &str, id: RecordId, fields: Fields) -> &mut Self {
        self.ops.push(WriteOp::Set {
            collection: collection.to_string(),
            id,
            fields,
        });
        self
    }

    pub fn update(&mut self, collection: &str, id: RecordId, fields: Fields) -> &mut Self {
        self.ops.push(WriteOp::Update {
            collection: collection.to_string(),
            id,
            fields,
        });
        self
    }

    pub fn delete(&mut self, collection: &str, id: RecordId) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.to_string(),
            id,
        });
        self
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Trait for document storage operations
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Allocate an identifier for a document about to be created
    fn allocate_id(&self) -> RecordId {
        RecordId::generate()
    }

    /// Run an ordered, filtered, cursor-bounded query
    async fn run_query(&self, query: &Query) -> Result<Vec<StoredDocument>>;

    /// Count documents matching the query's filters (cursors and limit ignored)
    async fn count(&self, query: &Query) -> Result<usize>;

    /// Get a document by ID
    async fn get(&self, collection: &str, id: &RecordId) -> Result<Option<StoredDocument>>;

    /// Create or replace a document
    async fn set(&self, collection: &str, id: &RecordId, fields: Fields) -> Result<()>;

    /// Merge the given fields into an existing document
    async fn update(&self, collection: &str, id: &RecordId, fields: Fields) -> Result<()>;

    /// Delete a document, returning whether one was stored under `id`.
    ///
    /// Deleting a missing document succeeds with `false`.
    async fn delete(&self, collection: &str, id: &RecordId) -> Result<bool>;

    /// Apply every write of the batch atomically
    async fn commit(&self, batch: WriteBatch) -> Result<()>;
}
