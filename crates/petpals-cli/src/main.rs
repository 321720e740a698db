//! `PetPals` CLI - client and visit records from the terminal
//!
//! Browse clients page by page, log visits and export visit reports.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{ClientCommands, Cli, Commands, VisitCommands};
use crate::commands::common::{load_config, resolve_db_path, App};
use crate::commands::export::ExportSelection;
use crate::commands::{clients, completions, export, visits};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("petpals=info")),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return completions::run_completions(*shell, output.as_deref());
    }

    let config = load_config(cli.config.as_deref())?;
    let db_path = resolve_db_path(cli.db_path, &config);
    tracing::debug!("Using database {}", db_path.display());
    let app = App::open(&db_path, &config)?;

    match cli.command {
        Commands::Clients { command } => run_clients(&app, command).await?,
        Commands::Visits { command } => run_visits(&app, command).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

async fn run_clients(app: &App, command: ClientCommands) -> Result<(), CliError> {
    match command {
        ClientCommands::List { search, page, json } => {
            clients::run_list(app, search.as_deref(), page, json).await
        }
        ClientCommands::Browse { search } => clients::run_browse(app, search.as_deref()).await,
        ClientCommands::Add { fields } => clients::run_add(app, fields).await,
        ClientCommands::Show { id, json } => clients::run_show(app, &id, json).await,
        ClientCommands::Edit { id, fields } => clients::run_edit(app, &id, fields).await,
        ClientCommands::Delete { id } => clients::run_delete(app, &id).await,
        ClientCommands::SeedDummy { count } => clients::run_seed_dummy(app, count).await,
        ClientCommands::PurgeDummy => clients::run_purge_dummy(app).await,
    }
}

async fn run_visits(app: &App, command: VisitCommands) -> Result<(), CliError> {
    match command {
        VisitCommands::List { client, page, json } => {
            visits::run_list(app, &client, page, json).await
        }
        VisitCommands::Add {
            client,
            date,
            fields,
        } => visits::run_add(app, &client, date, fields).await,
        VisitCommands::Delete { ids } => visits::run_delete(app, &ids).await,
        VisitCommands::Export {
            client,
            all,
            ids,
            between,
            format,
            output,
        } => {
            let selection = ExportSelection::from_args(all, ids, between);
            export::run_export(app, &client, &selection, format, output.as_deref()).await
        }
    }
}
