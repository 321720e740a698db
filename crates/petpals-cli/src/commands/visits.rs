use chrono::NaiveDate;
use petpals_core::util::normalize_text_option;
use petpals_core::{Client, Visit};

use crate::cli::VisitFields;
use crate::commands::common::{
    advance_to_page, format_visit_lines, page_footer, parse_record_id, print_lines,
    resolve_client, App, PageListing,
};
use crate::error::CliError;

/// Selects every client's visits in `visits list`
pub const ALL_CLIENTS: &str = "all";

pub async fn run_list(app: &App, client: &str, page: usize, as_json: bool) -> Result<(), CliError> {
    let heading = if client.trim().eq_ignore_ascii_case(ALL_CLIENTS) {
        app.visits.load_all().await?;
        None
    } else {
        let client = resolve_client(app, client).await?;
        app.visits.load_for_client(&client.id).await?;
        Some(client)
    };
    advance_to_page(app.visits.records(), page).await?;

    let snapshot = app.visits.snapshot();
    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&PageListing::new(&snapshot))?
        );
    } else {
        if let Some(client) = heading.as_ref().map(Client::display_label) {
            println!("Visits for {client}");
        }
        print_lines(&format_visit_lines(&snapshot.items), "No visits found");
        println!("{}", page_footer(&snapshot, "visits"));
    }
    Ok(())
}

pub async fn run_add(
    app: &App,
    client: &str,
    date: NaiveDate,
    fields: VisitFields,
) -> Result<(), CliError> {
    let client = resolve_client(app, client).await?;
    let visit = app.visits.add(build_visit(&client, date, fields)).await?;
    println!("{}", visit.id);
    Ok(())
}

pub async fn run_delete(app: &App, ids: &[String]) -> Result<(), CliError> {
    let ids = ids
        .iter()
        .map(|id| parse_record_id(id))
        .collect::<Result<Vec<_>, _>>()?;
    let deleted = app.visits.delete_selected(&ids).await?;
    println!("Deleted {deleted} visits");
    Ok(())
}

/// New visit for `client` on `date`, named after the client when no name is given
pub fn build_visit(client: &Client, date: NaiveDate, fields: VisitFields) -> Visit {
    let mut visit = Visit::new(client.id.clone(), date);
    visit.name = normalize_text_option(fields.name).unwrap_or_else(|| client.display_label());
    visit.liquid_intake = normalize_text_option(fields.liquid_intake).unwrap_or_default();
    visit.visitor_am = normalize_text_option(fields.visitor_am);
    visit.visitor_pm = normalize_text_option(fields.visitor_pm);
    visit.notes_am = normalize_text_option(fields.notes_am);
    visit.notes_pm = normalize_text_option(fields.notes_pm);
    visit.visual_check_am = normalize_text_option(fields.visual_check_am);
    visit.visual_check_pm = normalize_text_option(fields.visual_check_pm);
    visit.food_intake_am = normalize_text_option(fields.food_intake_am);
    visit.food_intake_pm = normalize_text_option(fields.food_intake_pm);
    visit.medication_am = normalize_text_option(fields.medication_am);
    visit.medication_pm = normalize_text_option(fields.medication_pm);
    visit.security_check_am = normalize_text_option(fields.security_check_am);
    visit.security_check_pm = normalize_text_option(fields.security_check_pm);
    visit
}
