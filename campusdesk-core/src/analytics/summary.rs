use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::attendance::{RiskLevel, StudentAttendance};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskBreakdown {
    #[serde(default)]
    pub none: usize,
    #[serde(default)]
    pub low: usize,
    #[serde(default)]
    pub medium: usize,
    #[serde(default)]
    pub high: usize,
}

impl RiskBreakdown {
    pub fn count(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::None => self.none,
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
        }
    }

    fn bump(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::None => self.none += 1,
            RiskLevel::Low => self.low += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::High => self.high += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.none + self.low + self.medium + self.high
    }

    /// Students at medium or high risk.
    pub fn at_risk(&self) -> usize {
        self.medium + self.high
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    #[serde(default)]
    pub total_students: usize,
    #[serde(default)]
    pub average_rate: f64,
    #[serde(default)]
    pub present: u64,
    #[serde(default)]
    pub absent: u64,
    #[serde(default)]
    pub late: u64,
    #[serde(default)]
    pub excused: u64,
    #[serde(default)]
    pub risk_counts: RiskBreakdown,
}

impl AttendanceSummary {
    pub fn total_records(&self) -> u64 {
        self.present + self.absent + self.late + self.excused
    }
}

/// Reduce student summaries to dashboard totals in one pass.
pub fn summarize<'a>(students: impl IntoIterator<Item = &'a StudentAttendance>) -> AttendanceSummary {
    let mut summary = AttendanceSummary::default();
    let mut rate_sum = 0.0;

    for s in students {
        summary.total_students += 1;
        rate_sum += s.attendance_rate;
        summary.present += s.present_count as u64;
        summary.absent += s.absent_count as u64;
        summary.late += s.late_count as u64;
        summary.excused += s.excused_count as u64;
        summary.risk_counts.bump(s.risk_level);
    }

    if summary.total_students > 0 {
        summary.average_rate = rate_sum / summary.total_students as f64;
    }
    summary
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentStat {
    pub department: String,
    #[serde(default)]
    pub students: usize,
    #[serde(default)]
    pub average_rate: f64,
    #[serde(default)]
    pub at_risk: usize,
}

/// Per-department bar chart data, sorted by department name. Students
/// without a department are grouped under "Unassigned".
pub fn department_breakdown<'a>(students: impl IntoIterator<Item = &'a StudentAttendance>) -> Vec<DepartmentStat> {
    let mut groups: BTreeMap<String, (usize, f64, usize)> = BTreeMap::new();
    for s in students {
        let key = s.department.clone().unwrap_or_else(|| "Unassigned".to_string());
        let entry = groups.entry(key).or_default();
        entry.0 += 1;
        entry.1 += s.attendance_rate;
        if s.risk_level >= RiskLevel::Medium {
            entry.2 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(department, (students, rate_sum, at_risk))| DepartmentStat {
            department,
            students,
            average_rate: rate_sum / students as f64,
            at_risk,
        })
        .collect()
}
