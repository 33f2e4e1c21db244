//! Student attendance summaries and per-student details.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::timestamp;

/// Denormalized per-student summary from /api/attendance/students
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendance {
    pub student_id: i64,
    #[serde(default)]
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub year_level: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub attendance_rate: f64,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub total_sessions: u32,
    #[serde(default)]
    pub present_count: u32,
    #[serde(default)]
    pub absent_count: u32,
    #[serde(default)]
    pub late_count: u32,
    #[serde(default)]
    pub excused_count: u32,
    #[serde(default, with = "timestamp::date_opt")]
    pub last_attendance: Option<NaiveDate>,
    #[serde(default)]
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub schedules: Vec<ScheduleSummary>,
}

impl StudentAttendance {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// "Last, First" for sorted listings.
    pub fn sort_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

/// One class schedule the student is enrolled in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSummary {
    #[serde(default)]
    pub subject_code: String,
    #[serde(default)]
    pub subject_name: String,
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
}

/// Externally derived risk label. Ordered from no risk to high risk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [RiskLevel::None, RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        RiskLevel::ALL
            .into_iter()
            .find(|r| r.as_str() == needle)
            .ok_or_else(|| format!("unknown risk level '{s}' (expected none, low, medium or high)"))
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    #[default]
    Active,
    Inactive,
    Archived,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Inactive => "inactive",
            EnrollmentStatus::Archived => "archived",
        }
    }
}

impl FromStr for EnrollmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(EnrollmentStatus::Active),
            "inactive" => Ok(EnrollmentStatus::Inactive),
            "archived" => Ok(EnrollmentStatus::Archived),
            other => Err(format!("unknown status '{other}' (expected active, inactive or archived)")),
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Details (fetched lazily per student)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDetails {
    #[serde(flatten)]
    pub summary: StudentAttendance,
    #[serde(default)]
    pub guardian_name: Option<String>,
    #[serde(default)]
    pub guardian_contact: Option<String>,
    #[serde(default, alias = "attendanceRecords")]
    pub recent_records: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(with = "timestamp::date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub subject_code: Option<String>,
    #[serde(default)]
    pub subject_name: Option<String>,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Excused => "excused",
        })
    }
}

/// Body for PATCH /api/students/{id}/status
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: EnrollmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Patch the local page after status updates succeeded for `ids`.
pub fn apply_status(students: &mut [StudentAttendance], ids: &[i64], status: EnrollmentStatus) {
    for student in students.iter_mut().filter(|s| ids.contains(&s.student_id)) {
        student.status = status;
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::student;
    use super::*;

    #[test]
    fn deserializes_details_with_flattened_summary() {
        let json = r#"{
            "studentId": 12,
            "studentNumber": "2023-0012",
            "firstName": "Ana",
            "lastName": "Reyes",
            "attendanceRate": 82.5,
            "riskLevel": "medium",
            "lastAttendance": "2024-03-04T00:00:00.000Z",
            "attendanceRecords": [
                {"date": "2024-03-04", "subjectCode": "CS101", "status": "late"}
            ]
        }"#;
        let details: StudentDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.summary.risk_level, RiskLevel::Medium);
        assert_eq!(details.recent_records.len(), 1);
        assert_eq!(details.recent_records[0].status, AttendanceStatus::Late);
        assert!(details.summary.last_attendance.is_some());
    }

    #[test]
    fn apply_status_only_touches_selected() {
        let mut students = vec![
            student(1, "Cruz", "CS", 90.0, RiskLevel::None),
            student(2, "Diaz", "CS", 60.0, RiskLevel::High),
        ];
        apply_status(&mut students, &[2], EnrollmentStatus::Archived);
        assert_eq!(students[0].status, EnrollmentStatus::Active);
        assert_eq!(students[1].status, EnrollmentStatus::Archived);
    }

    #[test]
    fn risk_levels_are_ordered() {
        assert!(RiskLevel::High > RiskLevel::Medium);
        assert!(RiskLevel::None < RiskLevel::Low);
    }
}
