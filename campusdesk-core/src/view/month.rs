use chrono::{Datelike, NaiveDate};

use crate::date_range::WeekStart;
use crate::event::AcademicEvent;

use super::{visible_days, ViewMode};

/// One cell of a month grid.
#[derive(Debug, Clone)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    /// False for the leading/trailing days borrowed from adjacent months.
    pub in_month: bool,
    pub events: Vec<&'a AcademicEvent>,
}

#[derive(Debug, Clone)]
pub struct MonthGrid<'a> {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<Vec<DayCell<'a>>>,
}

impl<'a> MonthGrid<'a> {
    pub fn cells(&self) -> impl Iterator<Item = &DayCell<'a>> {
        self.weeks.iter().flatten()
    }
}

/// Put each event into every day cell it spans.
///
/// Comparison is on time-stripped dates, so an event spanning N days lands
/// in exactly N cells when all N are visible. Within a cell, events keep
/// their start order.
pub fn bucket_by_day<'a>(events: &'a [AcademicEvent], days: &[NaiveDate]) -> Vec<DayCell<'a>> {
    let mut sorted: Vec<&AcademicEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.start_date);

    days.iter()
        .map(|&date| DayCell {
            date,
            in_month: true,
            events: sorted.iter().copied().filter(|e| e.spans(date)).collect(),
        })
        .collect()
}

pub fn month_grid<'a>(events: &'a [AcademicEvent], reference: NaiveDate, week_start: WeekStart) -> MonthGrid<'a> {
    let days = visible_days(reference, ViewMode::Month, week_start);
    let mut cells = bucket_by_day(events, &days);
    for cell in &mut cells {
        cell.in_month = cell.date.month() == reference.month() && cell.date.year() == reference.year();
    }

    let mut weeks = Vec::with_capacity(cells.len() / 7);
    let mut cells = cells.into_iter().peekable();
    while cells.peek().is_some() {
        weeks.push(cells.by_ref().take(7).collect());
    }

    MonthGrid {
        year: reference.year(),
        month: reference.month(),
        weeks,
    }
}
