//! Runtime configuration shared by PetPals front ends.
//!
//! Values come from an optional JSON file, then environment overrides:
//! `PETPALS_PAGE_SIZE`, `PETPALS_VISITS_PAGE_SIZE` and `PETPALS_DB_PATH`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{compact_text, is_valid_field_name, normalize_text_option};

pub const PAGE_SIZE_ENV: &str = "PETPALS_PAGE_SIZE";
pub const VISITS_PAGE_SIZE_ENV: &str = "PETPALS_VISITS_PAGE_SIZE";
pub const DB_PATH_ENV: &str = "PETPALS_DB_PATH";

const DEFAULT_CLIENTS_PAGE_SIZE: usize = 10;
const DEFAULT_VISITS_PAGE_SIZE: usize = 10;
const DEFAULT_SEARCH_FIELD: &str = "petName";

/// Page sizes, search field and database location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PetPalsConfig {
    #[serde(default = "default_clients_page_size")]
    pub clients_page_size: usize,
    #[serde(default = "default_visits_page_size")]
    pub visits_page_size: usize,
    /// Client field the search box filters on (prefix match)
    #[serde(default = "default_search_field")]
    pub client_search_field: String,
    /// `SQLite` file; front ends pick a platform default when unset
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl Default for PetPalsConfig {
    fn default() -> Self {
        Self {
            clients_page_size: DEFAULT_CLIENTS_PAGE_SIZE,
            visits_page_size: DEFAULT_VISITS_PAGE_SIZE,
            client_search_field: default_search_field(),
            database_path: None,
        }
    }
}

impl PetPalsConfig {
    /// Parse a JSON config document
    pub fn from_json(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload).map_err(|error| {
            Error::Config(format!("invalid config JSON: {}", compact_text(&error.to_string())))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(payload) => Self::from_json(&payload),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Apply environment overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps variable names to values
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = normalize_text_option(lookup(PAGE_SIZE_ENV)) {
            self.clients_page_size = parse_page_size(PAGE_SIZE_ENV, &value)?;
        }
        if let Some(value) = normalize_text_option(lookup(VISITS_PAGE_SIZE_ENV)) {
            self.visits_page_size = parse_page_size(VISITS_PAGE_SIZE_ENV, &value)?;
        }
        if let Some(value) = normalize_text_option(lookup(DB_PATH_ENV)) {
            self.database_path = Some(PathBuf::from(value));
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.clients_page_size == 0 || self.visits_page_size == 0 {
            return Err(Error::Config("page sizes must be at least 1".into()));
        }
        if !is_valid_field_name(&self.client_search_field) {
            return Err(Error::Config(format!(
                "client_search_field '{}' is not a valid field name",
                self.client_search_field
            )));
        }
        Ok(())
    }
}

fn parse_page_size(name: &str, value: &str) -> Result<usize> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("{name} must be a positive integer, got '{value}'")))
}

const fn default_clients_page_size() -> usize {
    DEFAULT_CLIENTS_PAGE_SIZE
}

const fn default_visits_page_size() -> usize {
    DEFAULT_VISITS_PAGE_SIZE
}

fn default_search_field() -> String {
    DEFAULT_SEARCH_FIELD.to_string()
}
