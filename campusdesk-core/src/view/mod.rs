//! Calendar view derivation: which days are visible for a view mode and
//! which events land in each day or hour slot.

mod month;
mod timeline;
mod week;

use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::date_range::{month_bounds, shift_months, week_bounds, WeekStart};

pub use month::{bucket_by_day, month_grid, DayCell, MonthGrid};
pub use timeline::{timeline, timeline_by_month};
pub use week::{day_columns, DayColumn, Placement};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Month,
    Week,
    Day,
    Timeline,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Month => "month",
            ViewMode::Week => "week",
            ViewMode::Day => "day",
            ViewMode::Timeline => "timeline",
        }
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "month" => Ok(ViewMode::Month),
            "week" => Ok(ViewMode::Week),
            "day" => Ok(ViewMode::Day),
            "timeline" => Ok(ViewMode::Timeline),
            other => Err(format!(
                "unknown view '{other}' (expected month, week, day or timeline)"
            )),
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Move the reference date `steps` views forward (negative goes back).
/// Timeline steps by month.
pub fn navigate(reference: NaiveDate, mode: ViewMode, steps: i32) -> NaiveDate {
    match mode {
        ViewMode::Month | ViewMode::Timeline => shift_months(reference, steps),
        ViewMode::Week => reference + Duration::weeks(steps as i64),
        ViewMode::Day => reference + Duration::days(steps as i64),
    }
}

/// Inclusive day range the view shows. Month covers whole weeks around the
/// month, so the range starts and ends on week boundaries.
pub fn visible_range(reference: NaiveDate, mode: ViewMode, week_start: WeekStart) -> (NaiveDate, NaiveDate) {
    match mode {
        ViewMode::Month => {
            let (first, last) = month_bounds(reference);
            (week_bounds(first, week_start).0, week_bounds(last, week_start).1)
        }
        ViewMode::Week => week_bounds(reference, week_start),
        ViewMode::Day => (reference, reference),
        ViewMode::Timeline => month_bounds(reference),
    }
}

/// Every day in the visible range, in order.
pub fn visible_days(reference: NaiveDate, mode: ViewMode, week_start: WeekStart) -> Vec<NaiveDate> {
    let (first, last) = visible_range(reference, mode, week_start);
    first.iter_days().take_while(|d| *d <= last).collect()
}
