//! Event import from CSV or JSON files.
//!
//! Parsing produces one [`ImportRow`] per record so a bad row never hides
//! the good ones. Sending the drafts is up to the caller; the
//! [`ImportReport`] accumulates per-row outcomes.

use std::path::Path;

use serde::Deserialize;

use crate::error::{CampusError, CampusResult};
use crate::event::{Category, EventDraft, EventPayload, EventStatus, Priority};
use crate::timestamp::parse_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Csv,
    Json,
}

impl ImportFormat {
    /// Guess from the file extension.
    pub fn from_path(path: &Path) -> CampusResult<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("csv") => Ok(ImportFormat::Csv),
            Some("json") => Ok(ImportFormat::Json),
            _ => Err(CampusError::Import(format!(
                "cannot tell the format of {} (expected .csv or .json)",
                path.display()
            ))),
        }
    }
}

/// A parsed record: its 1-based row number and the validated payload or why
/// it was rejected.
#[derive(Debug, Clone)]
pub struct ImportRow {
    pub row: usize,
    pub title: String,
    pub result: Result<EventPayload, String>,
}

/// Tolerant shape of one imported record. Column names follow the export
/// header; JSON may use the API's camelCase names.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(alias = "Title", default)]
    title: String,
    #[serde(alias = "Description", default)]
    description: Option<String>,
    #[serde(alias = "Start", alias = "startDate", default)]
    start: Option<String>,
    #[serde(alias = "End", alias = "endDate", default)]
    end: Option<String>,
    #[serde(alias = "All Day", alias = "allDay", default)]
    all_day: Option<FlexBool>,
    #[serde(alias = "Category", default)]
    category: Option<String>,
    #[serde(alias = "Priority", default)]
    priority: Option<String>,
    #[serde(alias = "Location", default)]
    location: Option<String>,
    #[serde(alias = "Status", default)]
    status: Option<String>,
    #[serde(alias = "Tags", default)]
    tags: Option<FlexTags>,
}

// CSV cells reach untagged enums through `deserialize_any`, which types
// "1" as a number and "true" as a bool, so both enums accept those shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlexBool {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl FlexBool {
    fn value(&self) -> Result<bool, String> {
        match self {
            FlexBool::Bool(b) => Ok(*b),
            FlexBool::Int(0) => Ok(false),
            FlexBool::Int(1) => Ok(true),
            FlexBool::Int(n) => Err(format!("'{n}' is not a yes/no value")),
            FlexBool::Text(s) => match s.trim().to_lowercase().as_str() {
                "" | "false" | "no" | "0" => Ok(false),
                "true" | "yes" | "1" => Ok(true),
                other => Err(format!("'{other}' is not a yes/no value")),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlexTags {
    List(Vec<String>),
    Bool(bool),
    Int(i64),
    Float(f64),
    Joined(String),
}

impl FlexTags {
    fn into_vec(self) -> Vec<String> {
        match self {
            FlexTags::List(tags) => tags,
            FlexTags::Bool(b) => vec![b.to_string()],
            FlexTags::Int(n) => vec![n.to_string()],
            FlexTags::Float(n) => vec![n.to_string()],
            FlexTags::Joined(s) => s.split(';').map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect(),
        }
    }
}

fn parse_optional<T: std::str::FromStr<Err = String> + Default>(value: Option<String>) -> Result<T, String> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(T::default()),
        Some(s) => s.parse(),
    }
}

fn parse_when(value: Option<String>, field: &str) -> Result<Option<chrono::NaiveDateTime>, String> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_timestamp(s)
            .map(Some)
            .ok_or_else(|| format!("{field} '{s}' is not a valid date")),
    }
}

impl RawRecord {
    fn into_draft(self) -> Result<EventDraft, String> {
        Ok(EventDraft {
            start: parse_when(self.start, "start")?,
            end: parse_when(self.end, "end")?,
            all_day: self.all_day.map(|b| b.value()).transpose()?.unwrap_or(false),
            category: parse_optional::<Category>(self.category)?,
            priority: parse_optional::<Priority>(self.priority)?,
            status: parse_optional::<EventStatus>(self.status)?,
            title: self.title,
            description: self.description,
            location: self.location,
            color: None,
            tags: self.tags.map(FlexTags::into_vec).unwrap_or_default(),
            academic_year_id: None,
            semester_id: None,
        })
    }
}

fn to_row(row: usize, record: RawRecord) -> ImportRow {
    let title = record.title.trim().to_string();
    let result = record
        .into_draft()
        .and_then(|draft| draft.into_payload().map_err(|e| e.to_string()));
    ImportRow { row, title, result }
}

/// Parse a CSV export-compatible file. Row numbers count the header as row 1.
pub fn parse_csv(content: &str) -> CampusResult<Vec<ImportRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    if !headers.iter().any(|h| h.eq_ignore_ascii_case("title")) {
        return Err(CampusError::Import("CSV header has no Title column".into()));
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let row = index + 2;
        let parsed = record
            .map_err(|e| e.to_string())
            .and_then(|r| r.deserialize::<RawRecord>(Some(&headers)).map_err(|e| e.to_string()));
        rows.push(match parsed {
            Ok(raw) => to_row(row, raw),
            Err(e) => ImportRow {
                row,
                title: String::new(),
                result: Err(e),
            },
        });
    }
    Ok(rows)
}

/// Parse a JSON array of records. Row numbers are 1-based array positions.
pub fn parse_json(content: &str) -> CampusResult<Vec<ImportRow>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(content)
        .map_err(|e| CampusError::Import(format!("expected a JSON array of events: {e}")))?;

    Ok(values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match serde_json::from_value::<RawRecord>(value) {
            Ok(raw) => to_row(index + 1, raw),
            Err(e) => ImportRow {
                row: index + 1,
                title: String::new(),
                result: Err(e.to_string()),
            },
        })
        .collect())
}

pub fn parse(content: &str, format: ImportFormat) -> CampusResult<Vec<ImportRow>> {
    match format {
        ImportFormat::Csv => parse_csv(content),
        ImportFormat::Json => parse_json(content),
    }
}

/// Mixed result of a sequential import. There is no rollback: rows that
/// succeeded stay created even when later rows fail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl ImportReport {
    pub fn record(&mut self, row: usize, outcome: Result<(), String>) {
        match outcome {
            Ok(()) => self.succeeded += 1,
            Err(e) => {
                self.failed += 1;
                self.errors.push(format!("Row {row}: {e}"));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}
