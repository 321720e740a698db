//! Visit report export shared by every front end.

use std::fmt::Write as _;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::Visit;

/// Export output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Text,
    Json,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(Error::InvalidInput(format!(
                "unknown export format '{other}' (expected text or json)"
            ))),
        }
    }
}

/// Long-form report date, e.g. `Monday, 03 June 2024`
#[must_use]
pub fn format_report_date(date: NaiveDate) -> String {
    date.format("%A, %d %B %Y").to_string()
}

/// Render visits as the plain-text daily report.
#[must_use]
pub fn render_text_report(visits: &[&Visit]) -> String {
    let mut output = String::new();

    for visit in visits {
        let lines = [
            ("Visitor PM", &visit.visitor_pm),
            ("Visitor AM", &visit.visitor_am),
            ("Notes PM", &visit.notes_pm),
            ("Notes AM", &visit.notes_am),
            ("Visual Check PM", &visit.visual_check_pm),
            ("Visual Check AM", &visit.visual_check_am),
            ("Food Intake PM", &visit.food_intake_pm),
            ("Food Intake AM", &visit.food_intake_am),
            ("Medication PM", &visit.medication_pm),
            ("Medication AM", &visit.medication_am),
            ("Security Check PM", &visit.security_check_pm),
            ("Security Check AM", &visit.security_check_am),
        ];

        let _ = writeln!(output, "Date: {}", format_report_date(visit.dt));
        for (label, value) in lines {
            let _ = writeln!(output, "{label}: {}", value.as_deref().unwrap_or_default());
        }
        output.push_str("\n\n");
    }

    output
}

/// Render visits as pretty-printed JSON.
pub fn render_json_report(visits: &[&Visit]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(visits)
}

/// Render the selected visits; an empty selection is an error.
pub fn render_visits_export(visits: &[&Visit], format: ExportFormat) -> Result<String> {
    if visits.is_empty() {
        return Err(Error::InvalidInput(
            "nothing to export: select which visits to export".into(),
        ));
    }

    match format {
        ExportFormat::Text => Ok(render_text_report(visits)),
        ExportFormat::Json => Ok(render_json_report(visits)?),
    }
}

/// Build a deterministic default file name for exported reports.
#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, timestamp_ms: i64) -> String {
    format!("petpals-visits-{timestamp_ms}.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordId;
    use pretty_assertions::assert_eq;

    fn visit() -> Visit {
        let mut visit = Visit::new(
            RecordId::from("client-1"),
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        );
        visit.visitor_am = Some("Sam".into());
        visit.visitor_pm = Some("Alex".into());
        visit.food_intake_pm = Some("All of it".into());
        visit
    }

    #[test]
    fn text_report_lists_pm_before_am() {
        let visit = visit();
        let report = render_text_report(&[&visit]);

        let expected = "Date: Monday, 03 June 2024\n\
            Visitor PM: Alex\n\
            Visitor AM: Sam\n\
            Notes PM: \n\
            Notes AM: \n\
            Visual Check PM: \n\
            Visual Check AM: \n\
            Food Intake PM: All of it\n\
            Food Intake AM: \n\
            Medication PM: \n\
            Medication AM: \n\
            Security Check PM: \n\
            Security Check AM: \n\n\n";
        assert_eq!(report, expected);
    }

    #[test]
    fn empty_selection_is_rejected() {
        let error = render_visits_export(&[], ExportFormat::Text).unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
    }

    #[test]
    fn json_report_uses_record_field_names() {
        let visit = visit();
        let rendered = render_visits_export(&[&visit], ExportFormat::Json).unwrap();
        assert!(rendered.contains("\"clientId\": \"client-1\""));
        assert!(rendered.contains("\"dt\": \"2024-06-03\""));
        assert!(rendered.contains("\"visitorPm\": \"Alex\""));
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert!("csv".parse::<ExportFormat>().is_err());
        assert_eq!(
            suggested_export_file_name(ExportFormat::Text, 42),
            "petpals-visits-42.txt"
        );
    }
}
