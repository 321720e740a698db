use std::io::Cursor;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use petpals_core::config::PetPalsConfig;
use petpals_core::store::SqliteStore;
use petpals_core::{Client, Record, RecordId};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::cli::{ClientCommands, ClientFields, Cli, Commands, CompletionShell, VisitFields};
use crate::commands::clients::{browse, build_client, client_changes};
use crate::commands::common::{
    advance_to_page, page_footer, parse_record_id, resolve_db_path, App,
};
use crate::commands::completions::completion_script;
use crate::commands::export::ExportSelection;
use crate::commands::visits::build_visit;
use crate::error::CliError;

fn app(page_size: usize) -> App {
    let config = PetPalsConfig {
        clients_page_size: page_size,
        visits_page_size: page_size,
        ..PetPalsConfig::default()
    };
    App::new(SqliteStore::open_in_memory().unwrap(), &config).unwrap()
}

async fn seeded_app(page_size: usize) -> App {
    let app = app(page_size);
    for (number, pet) in [
        ("C1", "Rex"),
        ("C2", "Tom"),
        ("C3", "Rover"),
        ("C4", "Bella"),
        ("C5", "Rusty"),
    ] {
        app.clients
            .add(Client::new(number, "Owner", pet))
            .await
            .unwrap();
    }
    app
}

#[test]
fn parse_record_id_trims_and_rejects_empty() {
    assert_eq!(parse_record_id("  abc ").unwrap(), RecordId::from("abc"));
    assert!(matches!(parse_record_id("   "), Err(CliError::EmptyRecordId)));
}

#[test]
fn resolve_db_path_prefers_flag_then_config() {
    let config = PetPalsConfig {
        database_path: Some(PathBuf::from("/from/config.db")),
        ..PetPalsConfig::default()
    };
    assert_eq!(
        resolve_db_path(Some(PathBuf::from("/from/flag.db")), &config),
        PathBuf::from("/from/flag.db")
    );
    assert_eq!(
        resolve_db_path(None, &config),
        PathBuf::from("/from/config.db")
    );
    assert!(resolve_db_path(None, &PetPalsConfig::default()).ends_with("petpals/petpals.db"));
}

#[test]
fn build_client_requires_number_owner_and_pet() {
    let fields = ClientFields {
        customer_number: Some(" C7 ".into()),
        name: Some("Jo".into()),
        pet_name: Some("Biscuit".into()),
        health: Some("  ".into()),
        ..ClientFields::default()
    };
    let client = build_client(fields).unwrap();
    assert_eq!(client.customer_number, "C7");
    assert_eq!(client.health, "");

    let missing = build_client(ClientFields {
        customer_number: Some("C8".into()),
        ..ClientFields::default()
    });
    assert!(matches!(missing, Err(CliError::MissingField("name"))));
}

#[test]
fn client_changes_use_stored_field_names() {
    let changes = client_changes(ClientFields {
        pet_name: Some("Rex II".into()),
        feeding_routine: Some("Twice a day".into()),
        ..ClientFields::default()
    })
    .unwrap();
    assert_eq!(
        serde_json::Value::Object(changes),
        json!({ "petName": "Rex II", "feedingRoutine": "Twice a day" })
    );

    assert!(matches!(
        client_changes(ClientFields::default()),
        Err(CliError::NothingToUpdate)
    ));
}

#[test]
fn build_visit_defaults_name_to_client_label() {
    let client = Client::new("C1", "Jo", "Rex").with_id("c1".into());
    let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    let visit = build_visit(
        &client,
        date,
        VisitFields {
            notes_pm: Some(" Slept well ".into()),
            visitor_am: Some("".into()),
            ..VisitFields::default()
        },
    );

    assert_eq!(visit.client_id, client.id);
    assert_eq!(visit.name, "Jo (Rex)");
    assert_eq!(visit.notes_pm.as_deref(), Some("Slept well"));
    assert_eq!(visit.visitor_am, None);
    assert_eq!((visit.dt_date, visit.dt_month, visit.dt_year), (29, 2, 2024));
}

#[test]
fn export_selection_between_fills_range() {
    let selection = ExportSelection::from_args(false, Vec::new(), vec!["b".into(), "d".into()]);
    assert_eq!(selection, ExportSelection::Between("b".into(), "d".into()));

    let client = Client::new("C1", "Jo", "Rex").with_id("c1".into());
    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let visits = ["a", "b", "c", "d", "e"]
        .into_iter()
        .map(|id| build_visit(&client, date, VisitFields::default()).with_id(id.into()))
        .collect::<Vec<_>>();

    let checked = selection.apply(&visits).unwrap();
    let ids = checked
        .checked_in_order(&visits)
        .into_iter()
        .map(|visit| visit.id.to_string())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["b", "c", "d"]);

    assert_eq!(
        ExportSelection::from_args(true, vec!["x".into()], Vec::new()),
        ExportSelection::All
    );
}

#[test]
fn cli_parses_nested_commands() {
    let cli = Cli::try_parse_from([
        "petpals", "clients", "list", "--search", "Re", "--page", "2", "--json",
    ])
    .unwrap();
    match cli.command {
        Commands::Clients {
            command: ClientCommands::List { search, page, json },
        } => {
            assert_eq!(search.as_deref(), Some("Re"));
            assert_eq!(page, 2);
            assert!(json);
        }
        _ => panic!("expected clients list"),
    }

    assert!(Cli::try_parse_from(["petpals", "visits", "add", "c1", "--date", "yesterday"]).is_err());
    assert!(Cli::try_parse_from([
        "petpals", "visits", "export", "c1", "--all", "--ids", "v1",
    ])
    .is_err());
}

#[test]
fn completion_script_mentions_binary_name() {
    let script = String::from_utf8(completion_script(CompletionShell::Bash)).unwrap();
    assert!(script.contains("petpals"));
}

#[tokio::test]
async fn advance_to_page_rejects_missing_pages() {
    let app = seeded_app(2).await;
    app.clients.load_first_page().await.unwrap();

    assert!(matches!(
        advance_to_page(app.clients.records(), 0).await,
        Err(CliError::InvalidPage)
    ));
    assert!(matches!(
        advance_to_page(app.clients.records(), 4).await,
        Err(CliError::PageOutOfRange(4))
    ));
}

#[tokio::test]
async fn page_footer_reports_position_and_moves() {
    let app = seeded_app(2).await;
    app.clients.load_first_page().await.unwrap();
    app.clients.load_next_page().await.unwrap();

    assert_eq!(
        page_footer(&app.clients.snapshot(), "clients"),
        "Page 2 | 5 clients in total | p: previous | n: next"
    );
}

#[tokio::test]
async fn browse_walks_pages_and_searches() {
    let app = seeded_app(2).await;
    let input = Cursor::new("n\nn\nn\np\ns Ro\nx\nq\nn\n");
    let mut output = Vec::new();

    browse(&app, None, input, &mut output).await.unwrap();
    let output = String::from_utf8(output).unwrap();

    assert!(output.contains("Page 3 | 5 clients in total | p: previous\n"));
    assert!(output.contains("No more pages in that direction"));
    assert!(output.contains("Search: Ro\n"));
    assert!(output.contains("Unknown command 'x'"));
    assert!(output.ends_with("Page 1 | 1 clients in total\nUnknown command 'x' (n, p, s <term>, r, q)\n"));
    assert_eq!(app.clients.snapshot().items[0].pet_name, "Rover");
}

#[tokio::test]
async fn deleting_a_client_removes_its_visits() {
    let app = seeded_app(10).await;
    app.clients.load_first_page().await.unwrap();
    let rex = app.clients.snapshot().items[0].clone();
    let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    app.visits
        .add(build_visit(&rex, date, VisitFields::default()))
        .await
        .unwrap();

    app.clients.delete(&rex).await.unwrap();
    assert!(app
        .visits
        .visits_for_client(&rex.id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(app.clients.snapshot().total, 4);
}
