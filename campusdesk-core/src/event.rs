//! Academic calendar event types.
//!
//! `AcademicEvent` mirrors what `/api/events` returns. `EventDraft` is the
//! editable form of an event: it is what create, edit and import build up
//! before validation turns it into an `EventPayload` for the request body.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{CampusError, CampusResult};
use crate::timestamp;

/// A calendar event as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicEvent {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "timestamp::wire")]
    pub start_date: NaiveDateTime,
    #[serde(with = "timestamp::wire")]
    pub end_date: NaiveDateTime,
    #[serde(default, alias = "isAllDay")]
    pub all_day: bool,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(flatten)]
    pub approval: Approval,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub academic_year_id: Option<i64>,
    #[serde(default)]
    pub semester_id: Option<i64>,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Approval metadata attached to an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    #[serde(default)]
    pub approval_status: Option<ApprovalStatus>,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default, with = "timestamp::wire_opt")]
    pub approved_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl AcademicEvent {
    /// First calendar day the event occupies.
    pub fn first_day(&self) -> NaiveDate {
        self.start_date.date()
    }

    /// Last calendar day the event occupies.
    ///
    /// An end at exactly midnight after the start is exclusive, so an
    /// all-day event stored as `[Mon 00:00, Tue 00:00)` occupies Monday only.
    /// An end before the start collapses to the start day.
    pub fn last_day(&self) -> NaiveDate {
        if self.end_date <= self.start_date {
            return self.first_day();
        }
        let end = self.end_date.date();
        if self.end_date.time() == NaiveTime::MIN && end > self.first_day() {
            end.pred_opt().unwrap_or(end)
        } else {
            end
        }
    }

    /// Whether the event occupies the given day.
    pub fn spans(&self, day: NaiveDate) -> bool {
        self.first_day() <= day && day <= self.last_day()
    }

    /// Number of calendar days the event occupies (at least 1).
    pub fn day_count(&self) -> i64 {
        (self.last_day() - self.first_day()).num_days() + 1
    }

    pub fn is_multi_day(&self) -> bool {
        self.last_day() > self.first_day()
    }

    /// Whether the event overlaps the inclusive day range.
    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.first_day() <= to && self.last_day() >= from
    }

    /// Convert back into an editable draft.
    pub fn to_draft(&self) -> EventDraft {
        EventDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            start: Some(self.start_date),
            end: Some(self.end_date),
            all_day: self.all_day,
            category: self.category,
            priority: self.priority,
            location: self.location.clone(),
            status: self.status,
            color: self.color.clone(),
            tags: self.tags.clone(),
            academic_year_id: self.academic_year_id,
            semester_id: self.semester_id,
        }
    }
}

impl fmt::Display for AcademicEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

// ============================================================================
// Enumerations
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Academic,
    Administrative,
    Holiday,
    Special,
    Deadline,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Academic,
        Category::Administrative,
        Category::Holiday,
        Category::Special,
        Category::Deadline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Academic => "academic",
            Category::Administrative => "administrative",
            Category::Holiday => "holiday",
            Category::Special => "special",
            Category::Deadline => "deadline",
        }
    }
}

/// Ordered from least to most urgent, so sorting by priority is `Ord`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Draft,
    Published,
    Cancelled,
}

impl EventStatus {
    pub const ALL: [EventStatus; 3] = [
        EventStatus::Draft,
        EventStatus::Published,
        EventStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Cancelled => "cancelled",
        }
    }
}

fn parse_variant<T: Copy>(s: &str, all: &[T], name: fn(&T) -> &'static str, kind: &str) -> Result<T, String> {
    let needle = s.trim().to_lowercase();
    all.iter().copied().find(|v| name(v) == needle).ok_or_else(|| {
        let options: Vec<_> = all.iter().map(name).collect();
        format!("unknown {kind} '{s}' (expected one of: {})", options.join(", "))
    })
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(s, &Category::ALL, Category::as_str, "category")
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(s, &Priority::ALL, Priority::as_str, "priority")
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "canceled" shows up in hand-written import files
        let s = if s.eq_ignore_ascii_case("canceled") { "cancelled" } else { s };
        parse_variant(s, &EventStatus::ALL, EventStatus::as_str, "status")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Drafts and request payloads
// ============================================================================

/// An event being created, edited or imported. Nothing is checked until
/// [`EventDraft::into_payload`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub all_day: bool,
    pub category: Category,
    pub priority: Priority,
    pub location: Option<String>,
    pub status: EventStatus,
    pub color: Option<String>,
    pub tags: Vec<String>,
    pub academic_year_id: Option<i64>,
    pub semester_id: Option<i64>,
}

/// Request body for POST /api/events and PUT /api/events/{id}
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "timestamp::wire")]
    pub start_date: NaiveDateTime,
    #[serde(with = "timestamp::wire")]
    pub end_date: NaiveDateTime,
    pub all_day: bool,
    pub category: Category,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub status: EventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_year_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester_id: Option<i64>,
}

impl EventDraft {
    /// Collect every validation problem with the draft.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.title.trim().is_empty() {
            problems.push("title is required".to_string());
        }
        match (self.start, self.end) {
            (None, _) => problems.push("start date is required".to_string()),
            (Some(start), Some(end)) if end < start => {
                problems.push("end date must be after start date".to_string())
            }
            _ => {}
        }
        problems
    }

    /// Validate and fill defaults: all-day events without an end cover their
    /// start day, timed events default to one hour.
    pub fn into_payload(self) -> CampusResult<EventPayload> {
        let problems = self.problems();
        if !problems.is_empty() {
            return Err(CampusError::Validation(problems.join("; ")));
        }
        let start = self
            .start
            .ok_or_else(|| CampusError::Validation("start date is required".into()))?;

        let (start, end) = if self.all_day {
            let first = start.date().and_time(NaiveTime::MIN);
            let end = match self.end {
                Some(end) if end.date() > first.date() || end.time() != NaiveTime::MIN => {
                    let last = if end.time() == NaiveTime::MIN { end.date() } else { end.date() + Duration::days(1) };
                    last.and_time(NaiveTime::MIN)
                }
                _ => first + Duration::days(1),
            };
            (first, end)
        } else {
            (start, self.end.unwrap_or(start + Duration::hours(1)))
        };

        Ok(EventPayload {
            title: self.title.trim().to_string(),
            description: non_blank(self.description),
            start_date: start,
            end_date: end,
            all_day: self.all_day,
            category: self.category,
            priority: self.priority,
            location: non_blank(self.location),
            status: self.status,
            color: non_blank(self.color),
            tags: self.tags.into_iter().filter(|t| !t.trim().is_empty()).collect(),
            academic_year_id: self.academic_year_id,
            semester_id: self.semester_id,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Bulk actions
// ============================================================================

/// An action applied to several selected events at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Publish,
    Unpublish,
    Cancel,
    Delete,
}

impl BulkAction {
    /// Status the action moves events to, or `None` for deletion.
    pub fn target_status(&self) -> Option<EventStatus> {
        match self {
            BulkAction::Publish => Some(EventStatus::Published),
            BulkAction::Unpublish => Some(EventStatus::Draft),
            BulkAction::Cancel => Some(EventStatus::Cancelled),
            BulkAction::Delete => None,
        }
    }
}

impl FromStr for BulkAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "publish" => Ok(BulkAction::Publish),
            "unpublish" | "draft" => Ok(BulkAction::Unpublish),
            "cancel" => Ok(BulkAction::Cancel),
            "delete" => Ok(BulkAction::Delete),
            other => Err(format!(
                "unknown action '{other}' (expected publish, unpublish, cancel or delete)"
            )),
        }
    }
}

/// Patch the local list after a bulk action succeeded for `ids`.
pub fn apply_bulk(events: &mut Vec<AcademicEvent>, ids: &[i64], action: BulkAction) {
    match action.target_status() {
        Some(status) => {
            for event in events.iter_mut().filter(|e| ids.contains(&e.id)) {
                event.status = status;
            }
        }
        None => events.retain(|e| !ids.contains(&e.id)),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date}T{time}"), "%Y-%m-%dT%H:%M").unwrap()
    }

    pub fn event(id: i64, title: &str, start: NaiveDateTime, end: NaiveDateTime) -> AcademicEvent {
        AcademicEvent {
            id,
            title: title.to_string(),
            description: None,
            start_date: start,
            end_date: end,
            all_day: false,
            category: Category::Academic,
            priority: Priority::Medium,
            location: None,
            status: EventStatus::Draft,
            approval: Approval::default(),
            color: None,
            tags: vec![],
            academic_year_id: None,
            semester_id: None,
            created_by: None,
        }
    }

    /// A one-hour event at 09:00 on the given day.
    pub fn on(id: i64, title: &str, date: &str) -> AcademicEvent {
        event(id, title, at(date, "09:00"), at(date, "10:00"))
    }
}
