//! Error types for petpals-core

use thiserror::Error;

use crate::models::RecordId;

/// Result type alias using petpals-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in petpals-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Document store error
    #[error("Store error: {0}")]
    Store(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record not found
    #[error("Record not found: {collection}/{id}")]
    NotFound { collection: String, id: RecordId },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Cursor marker used with a query it was not taken for
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// The store refused or could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Dependents could not be removed, so the parent was left in place
    #[error("Could not delete dependents of {parent}: {source}")]
    CascadeFailed {
        parent: RecordId,
        #[source]
        source: Box<Error>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn not_found(collection: &str, id: &RecordId) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.clone(),
        }
    }
}
