//! Daily per-class attendance aggregates from /api/analytics/trends.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date_range::DateRange;
use crate::timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendRow {
    #[serde(with = "timestamp::date")]
    pub date: NaiveDate,
    pub class_code: String,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub present: u32,
    #[serde(default)]
    pub absent: u32,
    #[serde(default)]
    pub late: u32,
    #[serde(default)]
    pub excused: u32,
}

impl TrendRow {
    pub fn total(&self) -> u32 {
        self.present
            .saturating_add(self.absent)
            .saturating_add(self.late)
            .saturating_add(self.excused)
    }

    /// Share of attended sessions (present or late), in percent.
    pub fn attendance_rate(&self) -> f64 {
        rate(self.present.saturating_add(self.late), self.total())
    }
}

fn rate(attended: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        attended as f64 * 100.0 / total as f64
    }
}

/// Client-side filter for the trends table and chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendFilter {
    pub class_code: Option<String>,
    pub range: DateRange,
}

impl TrendFilter {
    pub fn matches(&self, row: &TrendRow) -> bool {
        let class_ok = self
            .class_code
            .as_deref()
            .is_none_or(|code| row.class_code.eq_ignore_ascii_case(code));
        class_ok && self.range.contains(row.date)
    }

    pub fn apply<'a>(&self, rows: &'a [TrendRow]) -> Vec<&'a TrendRow> {
        let mut filtered: Vec<_> = rows.iter().filter(|r| self.matches(r)).collect();
        filtered.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.class_code.cmp(&b.class_code)));
        filtered
    }
}

/// One point of the daily line chart, summed across classes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub excused: u32,
}

impl DailyPoint {
    pub fn total(&self) -> u32 {
        self.present
            .saturating_add(self.absent)
            .saturating_add(self.late)
            .saturating_add(self.excused)
    }

    pub fn attendance_rate(&self) -> f64 {
        rate(self.present.saturating_add(self.late), self.total())
    }
}

/// Sum rows per day, ascending by date.
pub fn daily_series<'a>(rows: impl IntoIterator<Item = &'a TrendRow>) -> Vec<DailyPoint> {
    let mut by_day: BTreeMap<NaiveDate, DailyPoint> = BTreeMap::new();
    for row in rows {
        let point = by_day.entry(row.date).or_insert(DailyPoint {
            date: row.date,
            present: 0,
            absent: 0,
            late: 0,
            excused: 0,
        });
        point.present = point.present.saturating_add(row.present);
        point.absent = point.absent.saturating_add(row.absent);
        point.late = point.late.saturating_add(row.late);
        point.excused = point.excused.saturating_add(row.excused);
    }
    by_day.into_values().collect()
}

/// Distinct class codes, sorted, for the class selector.
pub fn class_codes(rows: &[TrendRow]) -> Vec<String> {
    let mut codes: Vec<String> = rows.iter().map(|r| r.class_code.clone()).collect();
    codes.sort();
    codes.dedup();
    codes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_range::parse_day;

    fn row(date: &str, class: &str, present: u32, absent: u32) -> TrendRow {
        TrendRow {
            date: parse_day(date).unwrap(),
            class_code: class.to_string(),
            class_name: None,
            present,
            absent,
            late: 0,
            excused: 0,
        }
    }

    #[test]
    fn filters_by_class_and_range() {
        let rows = vec![
            row("2024-02-01", "MATH1", 20, 5),
            row("2024-02-02", "MATH1", 22, 3),
            row("2024-02-02", "SCI2", 18, 7),
            row("2024-02-05", "MATH1", 19, 6),
        ];
        let filter = TrendFilter {
            class_code: Some("math1".into()),
            range: DateRange::from_args(Some("2024-02-01"), Some("2024-02-02")).unwrap(),
        };
        let filtered = filter.apply(&rows);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|r| r.class_code == "MATH1"));
    }

    #[test]
    fn daily_series_sums_classes() {
        let rows = vec![
            row("2024-02-02", "SCI2", 18, 7),
            row("2024-02-01", "MATH1", 20, 5),
            row("2024-02-02", "MATH1", 22, 3),
        ];
        let series = daily_series(&rows);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, parse_day("2024-02-01").unwrap());
        assert_eq!(series[1].present, 40);
        assert_eq!(series[1].total(), 50);
        assert!((series[1].attendance_rate() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn huge_counts_saturate() {
        let mut big = row("2024-02-01", "MATH1", u32::MAX, 1);
        big.late = 1;
        assert_eq!(big.total(), u32::MAX);
        assert!(big.attendance_rate() <= 100.0);

        let rows = vec![big.clone(), row("2024-02-01", "SCI2", 10, 0)];
        let series = daily_series(&rows);
        assert_eq!(series[0].present, u32::MAX);
        assert_eq!(series[0].total(), u32::MAX);
    }

    #[test]
    fn empty_row_has_zero_rate() {
        assert_eq!(row("2024-02-01", "X", 0, 0).attendance_rate(), 0.0);
    }

    #[test]
    fn class_codes_are_distinct() {
        let rows = vec![row("2024-02-01", "B", 1, 0), row("2024-02-02", "A", 1, 0), row("2024-02-03", "B", 1, 0)];
        assert_eq!(class_codes(&rows), vec!["A", "B"]);
    }
}
