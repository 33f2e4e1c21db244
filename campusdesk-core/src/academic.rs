//! Academic years and semesters: read-only reference data used to scope
//! event date ranges.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYear {
    pub id: i64,
    pub name: String,
    #[serde(with = "timestamp::date")]
    pub start_date: NaiveDate,
    #[serde(with = "timestamp::date")]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub semesters: Vec<Semester>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Semester {
    pub id: i64,
    #[serde(default)]
    pub academic_year_id: Option<i64>,
    pub name: String,
    #[serde(with = "timestamp::date")]
    pub start_date: NaiveDate,
    #[serde(with = "timestamp::date")]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_current: bool,
}

impl AcademicYear {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }

    /// The year flagged current by the API, otherwise the one containing `today`.
    pub fn current(years: &[AcademicYear], today: NaiveDate) -> Option<&AcademicYear> {
        years
            .iter()
            .find(|y| y.is_current)
            .or_else(|| years.iter().find(|y| y.contains(today)))
    }

    /// Semesters of this year, sorted by start date.
    pub fn semesters_sorted(&self) -> Vec<&Semester> {
        let mut semesters: Vec<_> = self.semesters.iter().collect();
        semesters.sort_by_key(|s| s.start_date);
        semesters
    }
}

impl Semester {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }

    pub fn current(semesters: &[Semester], today: NaiveDate) -> Option<&Semester> {
        semesters
            .iter()
            .find(|s| s.is_current)
            .or_else(|| semesters.iter().find(|s| s.contains(today)))
    }
}

/// Attach separately fetched semesters to their years.
pub fn attach_semesters(years: &mut [AcademicYear], semesters: Vec<Semester>) {
    for semester in semesters {
        let owner = match semester.academic_year_id {
            Some(id) => years.iter_mut().find(|y| y.id == id),
            None => years.iter_mut().find(|y| y.contains(semester.start_date)),
        };
        if let Some(year) = owner {
            if !year.semesters.iter().any(|s| s.id == semester.id) {
                year.semesters.push(semester);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn year(id: i64, start: &str, end: &str, is_current: bool) -> AcademicYear {
        AcademicYear {
            id,
            name: format!("AY {id}"),
            start_date: d(start),
            end_date: d(end),
            is_current,
            semesters: vec![],
        }
    }

    #[test]
    fn current_prefers_flag() {
        let years = vec![
            year(1, "2023-08-01", "2024-07-31", false),
            year(2, "2024-08-01", "2025-07-31", true),
        ];
        let current = AcademicYear::current(&years, d("2024-01-15")).unwrap();
        assert_eq!(current.id, 2);
    }

    #[test]
    fn current_falls_back_to_containing_year() {
        let years = vec![
            year(1, "2023-08-01", "2024-07-31", false),
            year(2, "2024-08-01", "2025-07-31", false),
        ];
        let current = AcademicYear::current(&years, d("2024-01-15")).unwrap();
        assert_eq!(current.id, 1);
    }

    #[test]
    fn attaches_semesters_by_id_or_date() {
        let mut years = vec![year(1, "2024-08-01", "2025-07-31", true)];
        let semesters = vec![
            Semester {
                id: 10,
                academic_year_id: Some(1),
                name: "First".into(),
                start_date: d("2024-08-12"),
                end_date: d("2024-12-20"),
                is_current: false,
            },
            Semester {
                id: 11,
                academic_year_id: None,
                name: "Second".into(),
                start_date: d("2025-01-06"),
                end_date: d("2025-05-23"),
                is_current: false,
            },
        ];
        attach_semesters(&mut years, semesters);
        let names: Vec<_> = years[0].semesters_sorted().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn accepts_timestamp_dates() {
        let json = r#"{"id":3,"name":"2024-2025","startDate":"2024-08-01T00:00:00.000Z","endDate":"2025-07-31"}"#;
        let y: AcademicYear = serde_json::from_str(json).unwrap();
        assert_eq!(y.start_date, d("2024-08-01"));
    }
}
