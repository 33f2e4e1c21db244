//! Client-side export of event and student lists.

mod csv;
mod ical;

use std::str::FromStr;

use crate::error::{CampusError, CampusResult};
use crate::event::AcademicEvent;

pub use self::csv::{events_csv, students_csv, EVENT_CSV_HEADER};
pub use self::ical::{events_ical, PRODID};

/// Formats the calendar can produce locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Ical,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Ical => "ics",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Ical => "text/calendar",
            ExportFormat::Json => "application/json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = CampusError;

    /// Spreadsheet and PDF output need real encoders; calendar events do
    /// not pretend to support them by relabelling CSV.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "ics" | "ical" | "icalendar" => Ok(ExportFormat::Ical),
            "json" => Ok(ExportFormat::Json),
            other => Err(CampusError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Render events in the given format.
pub fn export_events(events: &[AcademicEvent], format: ExportFormat) -> CampusResult<String> {
    match format {
        ExportFormat::Csv => events_csv(events),
        ExportFormat::Ical => events_ical(events),
        ExportFormat::Json => Ok(serde_json::to_string_pretty(events)?),
    }
}

/// Default file name such as `academic-calendar-2024-03-01.ics`.
pub fn default_file_name(prefix: &str, format: ExportFormat, today: chrono::NaiveDate) -> String {
    format!("{prefix}-{}.{}", today.format("%Y-%m-%d"), format.extension())
}
