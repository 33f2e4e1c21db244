//! Date ranges and calendar-boundary arithmetic.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{CampusError, CampusResult};

/// Inclusive day range for filtering.
/// None values mean unbounded in that direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        DateRange {
            from: Some(from),
            to: Some(to),
        }
    }

    /// Parse optional YYYY-MM-DD bounds from command-line arguments.
    pub fn from_args(from: Option<&str>, to: Option<&str>) -> CampusResult<Self> {
        let range = DateRange {
            from: from.map(parse_day).transpose()?,
            to: to.map(parse_day).transpose()?,
        };

        if let (Some(from), Some(to)) = (range.from, range.to) {
            if to < from {
                return Err(CampusError::Validation(format!(
                    "range end {to} is before range start {from}"
                )));
            }
        }

        Ok(range)
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }

    /// Query-string pairs for endpoints that accept `from`/`to`.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(from) = self.from {
            pairs.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.to {
            pairs.push(("to", to.format("%Y-%m-%d").to_string()));
        }
        pairs
    }
}

/// Parse YYYY-MM-DD
pub fn parse_day(s: &str) -> CampusResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| CampusError::InvalidDate(s.to_string()))
}

/// First day of the week in calendar grids and "this week" ranges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn weekday(&self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }
}

impl std::str::FromStr for WeekStart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sunday" | "sun" => Ok(WeekStart::Sunday),
            "monday" | "mon" => Ok(WeekStart::Monday),
            other => Err(format!("week must start on sunday or monday, not '{other}'")),
        }
    }
}

/// Inclusive bounds of the week containing `day`.
pub fn week_bounds(day: NaiveDate, start: WeekStart) -> (NaiveDate, NaiveDate) {
    let offset = match start {
        WeekStart::Sunday => day.weekday().num_days_from_sunday(),
        WeekStart::Monday => day.weekday().num_days_from_monday(),
    };
    let first = day - Duration::days(offset as i64);
    (first, first + Duration::days(6))
}

/// Inclusive bounds of the month containing `day`.
pub fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = day.with_day(1).unwrap_or(day);
    (first, last_day_of_month(first.year(), first.month()))
}

/// Inclusive bounds of the calendar quarter containing `day`.
pub fn quarter_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first_month = (day.month0() / 3) * 3 + 1;
    let first = NaiveDate::from_ymd_opt(day.year(), first_month, 1).unwrap_or(day);
    (first, last_day_of_month(day.year(), first_month + 2))
}

/// Inclusive bounds of the calendar year containing `day`.
pub fn year_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = NaiveDate::from_ymd_opt(day.year(), 1, 1).unwrap_or(day);
    let last = NaiveDate::from_ymd_opt(day.year(), 12, 31).unwrap_or(day);
    (first, last)
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MIN)
}

/// Same day in the month `delta` months away, clamped to that month's length.
pub fn shift_months(day: NaiveDate, delta: i32) -> NaiveDate {
    let total = day.year() * 12 + day.month0() as i32 + delta;
    let (year, month) = (total.div_euclid(12), total.rem_euclid(12) as u32 + 1);
    let last = last_day_of_month(year, month);
    NaiveDate::from_ymd_opt(year, month, day.day().min(last.day())).unwrap_or(last)
}
