//! Search, filter and sort derivation for event and student lists.
//!
//! Every derivation rescans the full slice; there is no index. Empty
//! selection sets mean "no constraint" on that dimension.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::attendance::{EnrollmentStatus, RiskLevel, StudentAttendance};
use crate::date_range::{month_bounds, week_bounds, WeekStart};
use crate::event::{AcademicEvent, Category, EventStatus, Priority};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("sort order must be asc or desc, not '{other}'")),
        }
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn compare_ci(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

// ============================================================================
// Events
// ============================================================================

/// Relative date bucket for the event list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateBucket {
    #[default]
    All,
    Today,
    ThisWeek,
    ThisMonth,
    Upcoming,
    Past,
}

impl DateBucket {
    /// Whether the event falls in this bucket relative to `today`.
    pub fn matches(&self, event: &AcademicEvent, today: NaiveDate, week_start: WeekStart) -> bool {
        match self {
            DateBucket::All => true,
            DateBucket::Today => event.spans(today),
            DateBucket::ThisWeek => {
                let (from, to) = week_bounds(today, week_start);
                event.overlaps(from, to)
            }
            DateBucket::ThisMonth => {
                let (from, to) = month_bounds(today);
                event.overlaps(from, to)
            }
            DateBucket::Upcoming => event.first_day() > today,
            DateBucket::Past => event.last_day() < today,
        }
    }
}

impl FromStr for DateBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "all" => Ok(DateBucket::All),
            "today" => Ok(DateBucket::Today),
            "this-week" | "week" => Ok(DateBucket::ThisWeek),
            "this-month" | "month" => Ok(DateBucket::ThisMonth),
            "upcoming" => Ok(DateBucket::Upcoming),
            "past" => Ok(DateBucket::Past),
            other => Err(format!(
                "unknown date range '{other}' (expected all, today, this-week, this-month, upcoming or past)"
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub search: Option<String>,
    pub categories: HashSet<Category>,
    pub priorities: HashSet<Priority>,
    pub statuses: HashSet<EventStatus>,
    pub date_bucket: DateBucket,
    pub week_start: WeekStart,
}

impl EventFilter {
    pub fn matches(&self, event: &AcademicEvent, today: NaiveDate) -> bool {
        self.matches_search(event)
            && (self.categories.is_empty() || self.categories.contains(&event.category))
            && (self.priorities.is_empty() || self.priorities.contains(&event.priority))
            && (self.statuses.is_empty() || self.statuses.contains(&event.status))
            && self.date_bucket.matches(event, today, self.week_start)
    }

    fn matches_search(&self, event: &AcademicEvent) -> bool {
        let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        contains_ci(&event.title, &needle)
            || event.description.as_deref().is_some_and(|d| contains_ci(d, &needle))
            || event.location.as_deref().is_some_and(|l| contains_ci(l, &needle))
            || event.tags.iter().any(|t| contains_ci(t, &needle))
    }

    /// Events matching the filter, in input order.
    pub fn apply(&self, events: &[AcademicEvent], today: NaiveDate) -> Vec<AcademicEvent> {
        events
            .iter()
            .filter(|e| self.matches(e, today))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSortField {
    Title,
    #[default]
    Start,
    Priority,
    Category,
    Status,
}

impl FromStr for EventSortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "title" => Ok(EventSortField::Title),
            "start" | "date" | "startdate" => Ok(EventSortField::Start),
            "priority" => Ok(EventSortField::Priority),
            "category" => Ok(EventSortField::Category),
            "status" => Ok(EventSortField::Status),
            other => Err(format!(
                "cannot sort events by '{other}' (expected title, start, priority, category or status)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventSort {
    pub field: EventSortField,
    pub direction: SortDirection,
}

impl EventSort {
    pub fn compare(&self, a: &AcademicEvent, b: &AcademicEvent) -> Ordering {
        let ordering = match self.field {
            EventSortField::Title => compare_ci(&a.title, &b.title),
            EventSortField::Start => a.start_date.cmp(&b.start_date),
            EventSortField::Priority => a.priority.cmp(&b.priority),
            EventSortField::Category => a.category.as_str().cmp(b.category.as_str()),
            EventSortField::Status => a.status.as_str().cmp(b.status.as_str()),
        };
        self.direction.apply(ordering)
    }

    pub fn sort(&self, events: &mut [AcademicEvent]) {
        events.sort_by(|a, b| self.compare(a, b));
    }
}

// ============================================================================
// Students
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentFilter {
    pub search: Option<String>,
    pub department: Option<String>,
    pub course: Option<String>,
    pub year_level: Option<String>,
    pub risk_levels: HashSet<RiskLevel>,
    pub status: Option<EnrollmentStatus>,
}

impl StudentFilter {
    pub fn matches(&self, student: &StudentAttendance) -> bool {
        self.matches_search(student)
            && field_matches(&self.department, &student.department)
            && field_matches(&self.course, &student.course)
            && field_matches(&self.year_level, &student.year_level)
            && (self.risk_levels.is_empty() || self.risk_levels.contains(&student.risk_level))
            && self.status.is_none_or(|s| s == student.status)
    }

    fn matches_search(&self, student: &StudentAttendance) -> bool {
        let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        contains_ci(&student.full_name(), &needle)
            || contains_ci(&student.student_number, &needle)
            || student.email.as_deref().is_some_and(|e| contains_ci(e, &needle))
            || student.course.as_deref().is_some_and(|c| contains_ci(c, &needle))
    }

    pub fn apply<'a>(&self, students: &'a [StudentAttendance]) -> Vec<&'a StudentAttendance> {
        students.iter().filter(|s| self.matches(s)).collect()
    }

    /// Query-string pairs for the server-side student listing.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            pairs.push(("search", search.trim().to_string()));
        }
        if let Some(department) = &self.department {
            pairs.push(("department", department.clone()));
        }
        if let Some(course) = &self.course {
            pairs.push(("course", course.clone()));
        }
        if let Some(year_level) = &self.year_level {
            pairs.push(("yearLevel", year_level.clone()));
        }
        let mut risks: Vec<_> = self.risk_levels.iter().collect();
        risks.sort();
        if !risks.is_empty() {
            let joined: Vec<_> = risks.iter().map(|r| r.as_str()).collect();
            pairs.push(("riskLevel", joined.join(",")));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        pairs
    }
}

/// Exact, case-insensitive match; `None` selection matches everything.
fn field_matches(selected: &Option<String>, value: &Option<String>) -> bool {
    match selected {
        None => true,
        Some(selected) => value.as_deref().is_some_and(|v| v.eq_ignore_ascii_case(selected)),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StudentSortField {
    #[default]
    Name,
    AttendanceRate,
    Absences,
    RiskLevel,
    Department,
}

impl StudentSortField {
    /// Name the API uses for `sortBy`.
    pub fn as_query(&self) -> &'static str {
        match self {
            StudentSortField::Name => "lastName",
            StudentSortField::AttendanceRate => "attendanceRate",
            StudentSortField::Absences => "absentCount",
            StudentSortField::RiskLevel => "riskLevel",
            StudentSortField::Department => "department",
        }
    }
}

impl FromStr for StudentSortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "name" => Ok(StudentSortField::Name),
            "rate" | "attendancerate" => Ok(StudentSortField::AttendanceRate),
            "absences" | "absent" => Ok(StudentSortField::Absences),
            "risk" | "risklevel" => Ok(StudentSortField::RiskLevel),
            "department" => Ok(StudentSortField::Department),
            other => Err(format!(
                "cannot sort students by '{other}' (expected name, rate, absences, risk or department)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StudentSort {
    pub field: StudentSortField,
    pub direction: SortDirection,
}

impl StudentSort {
    pub fn compare(&self, a: &StudentAttendance, b: &StudentAttendance) -> Ordering {
        let ordering = match self.field {
            StudentSortField::Name => compare_ci(&a.sort_name(), &b.sort_name()),
            StudentSortField::AttendanceRate => a
                .attendance_rate
                .partial_cmp(&b.attendance_rate)
                .unwrap_or(Ordering::Equal),
            StudentSortField::Absences => a.absent_count.cmp(&b.absent_count),
            StudentSortField::RiskLevel => a.risk_level.cmp(&b.risk_level),
            StudentSortField::Department => compare_ci(
                a.department.as_deref().unwrap_or_default(),
                b.department.as_deref().unwrap_or_default(),
            ),
        };
        self.direction.apply(ordering)
    }

    pub fn sort(&self, students: &mut [StudentAttendance]) {
        students.sort_by(|a, b| self.compare(a, b));
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("sortBy", self.field.as_query().to_string()),
            ("sortOrder", self.direction.as_str().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::fixtures::student;
    use crate::date_range::parse_day;
    use crate::event::fixtures::on;

    fn sample_events() -> Vec<AcademicEvent> {
        let mut events = vec![
            on(1, "New Year", "2024-01-01"),
            on(2, "Enrollment opens", "2024-01-02"),
            on(3, "Faculty meeting", "2024-01-02"),
            on(4, "Founders day", "2024-01-20"),
        ];
        events[0].category = Category::Holiday;
        events[3].category = Category::Holiday;
        events[1].priority = Priority::Critical;
        events[2].location = Some("Room 204".into());
        events
    }

    #[test]
    fn category_filter_partitions_list() {
        let events = sample_events();
        let today = parse_day("2024-01-02").unwrap();
        let filter = EventFilter {
            categories: HashSet::from([Category::Holiday]),
            ..Default::default()
        };
        let holidays = filter.apply(&events, today);
        assert!(holidays.iter().all(|e| e.category == Category::Holiday));

        let complement = events.iter().filter(|e| !filter.matches(e, today)).count();
        assert_eq!(holidays.len() + complement, events.len());
    }

    #[test]
    fn today_bucket_matches_same_day_events() {
        let events = vec![
            on(1, "A", "2024-01-01"),
            on(2, "B", "2024-01-02"),
            on(3, "C", "2024-01-02"),
        ];
        let filter = EventFilter {
            date_bucket: DateBucket::Today,
            ..Default::default()
        };
        let today = filter.apply(&events, parse_day("2024-01-02").unwrap());
        let ids: Vec<_> = today.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn search_covers_location_and_is_case_insensitive() {
        let events = sample_events();
        let filter = EventFilter {
            search: Some("room 2".into()),
            ..Default::default()
        };
        let found = filter.apply(&events, parse_day("2024-01-02").unwrap());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 3);
    }

    #[test]
    fn upcoming_and_past_exclude_today() {
        let events = sample_events();
        let today = parse_day("2024-01-02").unwrap();
        let upcoming = EventFilter { date_bucket: DateBucket::Upcoming, ..Default::default() };
        let past = EventFilter { date_bucket: DateBucket::Past, ..Default::default() };
        assert_eq!(upcoming.apply(&events, today).len(), 1);
        assert_eq!(past.apply(&events, today).len(), 1);
    }

    #[test]
    fn sort_by_priority_desc() {
        let mut events = sample_events();
        EventSort {
            field: EventSortField::Priority,
            direction: SortDirection::Desc,
        }
        .sort(&mut events);
        assert_eq!(events[0].id, 2);
    }

    #[test]
    fn sort_by_title_ignores_case() {
        let mut events = vec![on(1, "beta", "2024-01-01"), on(2, "Alpha", "2024-01-01")];
        EventSort {
            field: EventSortField::Title,
            direction: SortDirection::Asc,
        }
        .sort(&mut events);
        assert_eq!(events[0].title, "Alpha");
    }

    #[test]
    fn student_filter_combines_dimensions() {
        let students = vec![
            student(1, "Cruz", "Engineering", 95.0, RiskLevel::None),
            student(2, "Diaz", "Engineering", 55.0, RiskLevel::High),
            student(3, "Evans", "Nursing", 50.0, RiskLevel::High),
        ];
        let filter = StudentFilter {
            department: Some("engineering".into()),
            risk_levels: HashSet::from([RiskLevel::High, RiskLevel::Medium]),
            ..Default::default()
        };
        let matched = filter.apply(&students);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].student_id, 2);
    }

    #[test]
    fn student_search_matches_number_and_name() {
        let students = vec![
            student(1, "Cruz", "Engineering", 95.0, RiskLevel::None),
            student(2, "Diaz", "Engineering", 55.0, RiskLevel::High),
        ];
        let by_number = StudentFilter { search: Some("2024-0002".into()), ..Default::default() };
        assert_eq!(by_number.apply(&students).len(), 1);
        let by_name = StudentFilter { search: Some("sam cruz".into()), ..Default::default() };
        assert_eq!(by_name.apply(&students)[0].student_id, 1);
    }

    #[test]
    fn student_sort_by_rate() {
        let mut students = vec![
            student(1, "Cruz", "Engineering", 95.0, RiskLevel::None),
            student(2, "Diaz", "Engineering", 55.0, RiskLevel::High),
        ];
        StudentSort {
            field: StudentSortField::AttendanceRate,
            direction: SortDirection::Asc,
        }
        .sort(&mut students);
        assert_eq!(students[0].student_id, 2);
    }

    #[test]
    fn student_query_pairs() {
        let filter = StudentFilter {
            search: Some(" ana ".into()),
            risk_levels: HashSet::from([RiskLevel::High, RiskLevel::Low]),
            ..Default::default()
        };
        let pairs = filter.query_pairs();
        assert!(pairs.contains(&("search", "ana".to_string())));
        assert!(pairs.contains(&("riskLevel", "low,high".to_string())));
    }
}
