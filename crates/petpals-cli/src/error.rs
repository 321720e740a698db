use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] petpals_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Record ID cannot be empty")]
    EmptyRecordId,
    #[error("Client not found: {0}")]
    ClientNotFound(String),
    #[error("Page number must be at least 1")]
    InvalidPage,
    #[error("Page {0} does not exist")]
    PageOutOfRange(usize),
    #[error("Missing required field --{0}")]
    MissingField(&'static str),
    #[error("Nothing to change")]
    NothingToUpdate,
}
