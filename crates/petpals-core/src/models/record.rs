//! Record identity and the trait every stored record type implements

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::{Direction, Fields, OrderBy, StoredDocument};

/// Opaque identifier assigned by the document store before a record is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Allocate a new time-sortable identifier (UUID v7, simple form)
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    /// Wrap an existing identifier
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Records that were never written carry an empty id
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("record id cannot be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A flat record stored as one document in a named collection.
///
/// The serialized form must be a JSON object with an `id` member; the id is
/// kept inside the document fields as well as being its key.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection the records live in
    const COLLECTION: &'static str;

    /// Field the list views sort by
    const SORT_FIELD: &'static str;

    /// Direction of the default sort
    const SORT_DIRECTION: Direction;

    fn id(&self) -> &RecordId;

    /// Return the record carrying `id`
    #[must_use]
    fn with_id(self, id: RecordId) -> Self;

    /// Default ordering for list views
    fn default_order() -> OrderBy {
        OrderBy::new(Self::SORT_FIELD, Self::SORT_DIRECTION)
    }

    /// Serialize into document fields
    fn to_fields(&self) -> Result<Fields> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(fields) => Ok(fields),
            other => Err(Error::InvalidInput(format!(
                "{} record did not serialize to an object: {other}",
                Self::COLLECTION
            ))),
        }
    }

    /// Rebuild a record from a stored document, trusting the document key
    fn from_document(document: &StoredDocument) -> Result<Self> {
        let mut fields = document.fields.clone();
        fields.insert(
            "id".to_string(),
            serde_json::Value::String(document.id.as_str().to_string()),
        );
        Ok(serde_json::from_value(serde_json::Value::Object(fields))?)
    }

    /// Serialize into a stored document keyed by the record's id
    fn to_document(&self) -> Result<StoredDocument> {
        Ok(StoredDocument::new(self.id().clone(), self.to_fields()?))
    }
}
