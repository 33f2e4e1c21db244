use chrono::{NaiveDate, Timelike};

use crate::constants::STACK_OFFSET;
use crate::event::AcademicEvent;

/// A timed event positioned in an hour slot.
#[derive(Debug, Clone)]
pub struct Placement<'a> {
    pub event: &'a AcademicEvent,
    pub hour: u32,
    /// Position among events sharing the same day and start hour.
    pub stack_index: usize,
}

impl Placement<'_> {
    /// Horizontal offset that keeps stacked events from drawing on top of
    /// each other. Index based, no packing.
    pub fn offset(&self) -> usize {
        self.stack_index * STACK_OFFSET
    }
}

/// One day of a week or day view.
#[derive(Debug, Clone)]
pub struct DayColumn<'a> {
    pub date: NaiveDate,
    /// All-day and multi-day events shown above the hour grid.
    pub all_day: Vec<&'a AcademicEvent>,
    pub timed: Vec<Placement<'a>>,
}

impl<'a> DayColumn<'a> {
    pub fn at_hour(&self, hour: u32) -> impl Iterator<Item = &Placement<'a>> {
        self.timed.iter().filter(move |p| p.hour == hour)
    }

    pub fn is_empty(&self) -> bool {
        self.all_day.is_empty() && self.timed.is_empty()
    }
}

pub fn day_columns<'a>(events: &'a [AcademicEvent], days: &[NaiveDate]) -> Vec<DayColumn<'a>> {
    let mut sorted: Vec<&AcademicEvent> = events.iter().collect();
    sorted.sort_by_key(|e| e.start_date);

    days.iter()
        .map(|&date| {
            let mut column = DayColumn {
                date,
                all_day: Vec::new(),
                timed: Vec::new(),
            };
            for event in sorted.iter().copied().filter(|e| e.spans(date)) {
                if event.all_day || event.is_multi_day() {
                    column.all_day.push(event);
                    continue;
                }
                let hour = event.start_date.hour();
                let stack_index = column.timed.iter().filter(|p| p.hour == hour).count();
                column.timed.push(Placement {
                    event,
                    hour,
                    stack_index,
                });
            }
            column
        })
        .collect()
}
