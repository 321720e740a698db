use std::path::Path;

use petpals_core::export::{self, render_visits_export};
use petpals_core::selection::Selection;
use petpals_core::Visit;

use crate::cli::ExportFormat;
use crate::commands::common::{parse_record_id, resolve_client, App};
use crate::error::CliError;

/// Which of a client's visits go into the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportSelection {
    All,
    Ids(Vec<String>),
    Between(String, String),
}

impl ExportSelection {
    pub fn from_args(all: bool, ids: Vec<String>, between: Vec<String>) -> Self {
        if all {
            return Self::All;
        }
        match <[String; 2]>::try_from(between) {
            Ok([from, to]) => Self::Between(from, to),
            Err(_) => Self::Ids(ids),
        }
    }

    /// Check the chosen visits of `visits` (listed newest first)
    pub fn apply(&self, visits: &[Visit]) -> Result<Selection, CliError> {
        let mut selection = Selection::new();
        match self {
            Self::All => selection.select_all(visits.iter().map(|visit| &visit.id)),
            Self::Ids(ids) => {
                for id in ids {
                    selection.check(parse_record_id(id)?);
                }
            }
            Self::Between(from, to) => {
                selection.check(parse_record_id(from)?);
                selection.check(parse_record_id(to)?);
                selection.select_between(visits.iter().map(|visit| &visit.id));
            }
        }
        Ok(selection)
    }
}

pub async fn run_export(
    app: &App,
    client: &str,
    selection: &ExportSelection,
    format: ExportFormat,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let client = resolve_client(app, client).await?;
    let visits = app.visits.visits_for_client(&client.id).await?;
    let checked = selection.apply(&visits)?;
    let rendered = render_visits_export(&checked.checked_in_order(&visits), core_format(format))?;

    if let Some(path) = output_path {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        print!("{rendered}");
    }

    Ok(())
}

pub const fn core_format(format: ExportFormat) -> export::ExportFormat {
    match format {
        ExportFormat::Text => export::ExportFormat::Text,
        ExportFormat::Json => export::ExportFormat::Json,
    }
}
