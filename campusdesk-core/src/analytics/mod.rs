//! Attendance analytics: summaries, time ranges, staged filters,
//! drill-down and pattern analysis.

mod drill;
mod pattern;
mod staged;
mod summary;
mod time_range;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::timestamp;

pub use drill::{drill_down, RateBand, Segment};
pub use pattern::{analyze, find_extrema, moving_average, Extremum, ExtremumKind, PatternAnalysis, TrendDirection};
pub use staged::{AnalyticsFilters, StagedFilters};
pub use summary::{department_breakdown, summarize, AttendanceSummary, DepartmentStat, RiskBreakdown};
pub use time_range::TimeRange;

/// Payload of /api/attendance/analytics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    #[serde(default)]
    pub summary: AttendanceSummary,
    #[serde(default)]
    pub time_series: Vec<TimeSeriesPoint>,
    #[serde(default)]
    pub departments: Vec<DepartmentStat>,
}

/// Daily attendance rate in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    #[serde(with = "timestamp::date")]
    pub date: NaiveDate,
    #[serde(alias = "attendanceRate")]
    pub rate: f64,
    #[serde(default)]
    pub present: u32,
    #[serde(default)]
    pub absent: u32,
    #[serde(default)]
    pub late: u32,
}
