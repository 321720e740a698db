use std::io::{self, BufRead, Write};

use petpals_core::pagination::PageOutcome;
use petpals_core::store::Fields;
use petpals_core::util::normalize_text_option;
use petpals_core::Client;
use serde_json::Value;

use crate::cli::ClientFields;
use crate::commands::common::{
    advance_to_page, format_client_lines, page_footer, print_lines, resolve_client, App,
    PageListing,
};
use crate::error::CliError;

pub async fn run_list(
    app: &App,
    search: Option<&str>,
    page: usize,
    as_json: bool,
) -> Result<(), CliError> {
    app.clients.search(search.unwrap_or_default()).await?;
    advance_to_page(app.clients.records(), page).await?;

    let snapshot = app.clients.snapshot();
    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&PageListing::new(&snapshot))?
        );
    } else {
        print_lines(&format_client_lines(&snapshot.items), "No clients found");
        println!("{}", page_footer(&snapshot, "clients"));
    }
    Ok(())
}

pub async fn run_browse(app: &App, search: Option<&str>) -> Result<(), CliError> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    browse(app, search, stdin.lock(), stdout.lock()).await
}

/// Interactive paging loop: `n` next, `p` previous, `s <term>` search,
/// `r` reload, `q` quit
pub async fn browse<I: BufRead, W: Write>(
    app: &App,
    search: Option<&str>,
    input: I,
    mut output: W,
) -> Result<(), CliError> {
    app.clients.search(search.unwrap_or_default()).await?;
    render_page(app, &mut output)?;

    for line in input.lines() {
        let line = line?;
        let (command, argument) = line
            .trim()
            .split_once(' ')
            .map_or((line.trim(), ""), |(command, argument)| {
                (command, argument.trim())
            });

        let outcome = match command {
            "n" | "next" => app.clients.load_next_page().await?,
            "p" | "prev" | "previous" => app.clients.load_previous_page().await?,
            "s" | "search" => app.clients.search(argument).await?,
            "r" | "reload" => app.clients.load_first_page().await?,
            "q" | "quit" | "exit" => break,
            "" => continue,
            other => {
                writeln!(output, "Unknown command '{other}' (n, p, s <term>, r, q)")?;
                continue;
            }
        };

        if outcome == PageOutcome::Unchanged {
            writeln!(output, "No more pages in that direction")?;
        } else {
            render_page(app, &mut output)?;
        }
    }

    Ok(())
}

fn render_page<W: Write>(app: &App, output: &mut W) -> Result<(), CliError> {
    let snapshot = app.clients.snapshot();
    let term = app.clients.search_state().term();
    if !term.is_empty() {
        writeln!(output, "Search: {term}")?;
    }
    let lines = format_client_lines(&snapshot.items);
    if lines.is_empty() {
        writeln!(output, "No clients found")?;
    }
    for line in lines {
        writeln!(output, "{line}")?;
    }
    writeln!(output, "{}", page_footer(&snapshot, "clients"))?;
    Ok(())
}

pub async fn run_add(app: &App, fields: ClientFields) -> Result<(), CliError> {
    let client = app.clients.add(build_client(fields)?).await?;
    println!("{}", client.id);
    Ok(())
}

pub async fn run_show(app: &App, id: &str, as_json: bool) -> Result<(), CliError> {
    let client = resolve_client(app, id).await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&client)?);
        return Ok(());
    }

    let rows = [
        ("ID", client.id.as_str()),
        ("Customer number", client.customer_number.as_str()),
        ("Owner", client.name.as_str()),
        ("Pet", client.pet_name.as_str()),
        ("Address", client.address.as_str()),
        ("Feeding routine", client.feeding_routine.as_str()),
        ("Health", client.health.as_str()),
        ("Other", client.other.as_str()),
    ];
    for (label, value) in rows {
        println!("{label:<16} {value}");
    }
    Ok(())
}

pub async fn run_edit(app: &App, id: &str, fields: ClientFields) -> Result<(), CliError> {
    let client = resolve_client(app, id).await?;
    let changes = client_changes(fields)?;
    app.clients.update_fields(&client.id, changes).await?;
    println!("{}", client.id);
    Ok(())
}

pub async fn run_delete(app: &App, id: &str) -> Result<(), CliError> {
    let client = resolve_client(app, id).await?;
    app.clients.delete(&client).await?;
    println!("{}", client.id);
    Ok(())
}

pub async fn run_seed_dummy(app: &App, count: usize) -> Result<(), CliError> {
    let created = app.clients.seed_dummy(count).await?;
    println!("Created {} dummy clients", created.len());
    Ok(())
}

pub async fn run_purge_dummy(app: &App) -> Result<(), CliError> {
    let deleted = app.clients.purge_dummy().await?;
    println!("Deleted {deleted} dummy clients");
    Ok(())
}

/// New client from command-line fields; number, owner and pet are required
pub fn build_client(fields: ClientFields) -> Result<Client, CliError> {
    let required = |value: Option<String>, name: &'static str| {
        normalize_text_option(value).ok_or(CliError::MissingField(name))
    };

    let mut client = Client::new(
        required(fields.customer_number, "customer-number")?,
        required(fields.name, "name")?,
        required(fields.pet_name, "pet-name")?,
    );
    client.address = normalize_text_option(fields.address).unwrap_or_default();
    client.feeding_routine = normalize_text_option(fields.feeding_routine).unwrap_or_default();
    client.health = normalize_text_option(fields.health).unwrap_or_default();
    client.other = normalize_text_option(fields.other).unwrap_or_default();
    Ok(client)
}

/// Stored field changes for the options that were given
pub fn client_changes(fields: ClientFields) -> Result<Fields, CliError> {
    let pairs = [
        ("customerNumber", fields.customer_number),
        ("name", fields.name),
        ("petName", fields.pet_name),
        ("address", fields.address),
        ("feedingRoutine", fields.feeding_routine),
        ("health", fields.health),
        ("other", fields.other),
    ];

    let changes = pairs
        .into_iter()
        .filter_map(|(key, value)| {
            value.map(|value| (key.to_string(), Value::String(value.trim().to_string())))
        })
        .collect::<Fields>();

    if changes.is_empty() {
        return Err(CliError::NothingToUpdate);
    }
    Ok(changes)
}
