use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use petpals_core::config::PetPalsConfig;
use petpals_core::mirror::MirrorSnapshot;
use petpals_core::pagination::PageOutcome;
use petpals_core::services::{ClientsService, CollectionService, VisitsService};
use petpals_core::store::{DocumentStore, SqliteStore};
use petpals_core::util::normalize_text_option;
use petpals_core::{Client, Record, RecordId, Visit};
use serde::Serialize;

use crate::error::CliError;

/// Services over one opened database
pub struct App {
    pub clients: ClientsService<SqliteStore>,
    pub visits: Arc<VisitsService<SqliteStore>>,
}

impl App {
    pub fn new(store: SqliteStore, config: &PetPalsConfig) -> Result<Self, CliError> {
        let store = Arc::new(store);
        let visits = Arc::new(VisitsService::new(
            Arc::clone(&store),
            config.visits_page_size,
        )?);
        let clients = ClientsService::from_config(store, visits.clone(), config)?;
        Ok(Self { clients, visits })
    }

    pub fn open(db_path: &Path, config: &PetPalsConfig) -> Result<Self, CliError> {
        Self::new(SqliteStore::open(db_path)?, config)
    }
}

/// One page of records as printed by `--json`
#[derive(Debug, Serialize)]
pub struct PageListing<'a, T> {
    /// One-based page number
    pub page: usize,
    pub total: usize,
    pub can_go_next: bool,
    pub can_go_previous: bool,
    pub items: &'a [T],
}

impl<'a, T> PageListing<'a, T> {
    pub fn new(snapshot: &'a MirrorSnapshot<T>) -> Self {
        Self {
            page: snapshot.page.position + 1,
            total: snapshot.total,
            can_go_next: snapshot.page.can_go_next,
            can_go_previous: snapshot.page.can_go_previous,
            items: &snapshot.items,
        }
    }
}

pub fn load_config(cli_config_path: Option<&Path>) -> Result<PetPalsConfig, CliError> {
    let path = cli_config_path
        .map(Path::to_path_buf)
        .or_else(|| env::var_os("PETPALS_CONFIG").map(PathBuf::from))
        .unwrap_or_else(default_config_path);
    Ok(PetPalsConfig::load_from_path(path)?.with_env_overrides()?)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("petpals")
        .join("config.json")
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>, config: &PetPalsConfig) -> PathBuf {
    cli_db_path
        .or_else(|| config.database_path.clone())
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("petpals")
        .join("petpals.db")
}

pub fn parse_record_id(raw: &str) -> Result<RecordId, CliError> {
    normalize_text_option(Some(raw.to_string()))
        .map(RecordId::from)
        .ok_or(CliError::EmptyRecordId)
}

pub async fn resolve_client(app: &App, raw_id: &str) -> Result<Client, CliError> {
    let id = parse_record_id(raw_id)?;
    app.clients
        .get_by_id(&id)
        .await?
        .ok_or_else(|| CliError::ClientNotFound(id.to_string()))
}

/// Step forward from the first page until `page` (one-based) is shown
pub async fn advance_to_page<R, S>(
    records: &CollectionService<R, S>,
    page: usize,
) -> Result<(), CliError>
where
    R: Record,
    S: DocumentStore + ?Sized,
{
    if page == 0 {
        return Err(CliError::InvalidPage);
    }
    for _ in 1..page {
        if records.load_next_page().await? == PageOutcome::Unchanged {
            return Err(CliError::PageOutOfRange(page));
        }
    }
    Ok(())
}

pub fn format_client_lines(clients: &[Client]) -> Vec<String> {
    clients
        .iter()
        .map(|client| {
            format!(
                "{}  {:<12}  {}",
                client.id,
                client.customer_number,
                client.display_label()
            )
        })
        .collect()
}

pub fn format_visit_lines(visits: &[Visit]) -> Vec<String> {
    visits
        .iter()
        .map(|visit| {
            let name = if visit.name.trim().is_empty() {
                "-"
            } else {
                visit.name.trim()
            };
            format!("{}  {}  {name}", visit.id, visit.dt)
        })
        .collect()
}

/// Status line under a page of records
pub fn page_footer<T>(snapshot: &MirrorSnapshot<T>, noun: &str) -> String {
    let mut footer = format!(
        "Page {} | {} {noun} in total",
        snapshot.page.position + 1,
        snapshot.total
    );
    if snapshot.page.can_go_previous {
        footer.push_str(" | p: previous");
    }
    if snapshot.page.can_go_next {
        footer.push_str(" | n: next");
    }
    footer
}

pub fn print_lines(lines: &[String], empty_message: &str) {
    if lines.is_empty() {
        println!("{empty_message}");
    }
    for line in lines {
        println!("{line}");
    }
}
