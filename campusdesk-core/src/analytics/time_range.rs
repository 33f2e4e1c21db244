use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::date_range::{month_bounds, parse_day, quarter_bounds, week_bounds, year_bounds, DateRange, WeekStart};

/// Analytics time window. Every variant resolves to inclusive day bounds on
/// calendar boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum TimeRange {
    Today,
    Week,
    #[default]
    Month,
    Quarter,
    Year,
    Custom {
        #[serde(with = "crate::timestamp::date")]
        from: NaiveDate,
        #[serde(with = "crate::timestamp::date")]
        to: NaiveDate,
    },
}

impl TimeRange {
    pub fn bounds(&self, today: NaiveDate, week_start: WeekStart) -> (NaiveDate, NaiveDate) {
        match *self {
            TimeRange::Today => (today, today),
            TimeRange::Week => week_bounds(today, week_start),
            TimeRange::Month => month_bounds(today),
            TimeRange::Quarter => quarter_bounds(today),
            TimeRange::Year => year_bounds(today),
            TimeRange::Custom { from, to } => (from.min(to), from.max(to)),
        }
    }

    pub fn to_date_range(&self, today: NaiveDate, week_start: WeekStart) -> DateRange {
        let (from, to) = self.bounds(today, week_start);
        DateRange::new(from, to)
    }

    pub fn label(&self) -> String {
        match self {
            TimeRange::Today => "today".to_string(),
            TimeRange::Week => "this week".to_string(),
            TimeRange::Month => "this month".to_string(),
            TimeRange::Quarter => "this quarter".to_string(),
            TimeRange::Year => "this year".to_string(),
            TimeRange::Custom { from, to } => format!("{from} to {to}"),
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    /// Accepts the named ranges or `YYYY-MM-DD..YYYY-MM-DD`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "today" => Ok(TimeRange::Today),
            "week" => Ok(TimeRange::Week),
            "month" => Ok(TimeRange::Month),
            "quarter" => Ok(TimeRange::Quarter),
            "year" => Ok(TimeRange::Year),
            other => {
                let (from, to) = other.split_once("..").ok_or_else(|| {
                    format!("unknown time range '{other}' (expected today, week, month, quarter, year or FROM..TO)")
                })?;
                let from = parse_day(from).map_err(|e| e.to_string())?;
                let to = parse_day(to).map_err(|e| e.to_string())?;
                if to < from {
                    return Err(format!("time range ends ({to}) before it starts ({from})"));
                }
                Ok(TimeRange::Custom { from, to })
            }
        }
    }
}
