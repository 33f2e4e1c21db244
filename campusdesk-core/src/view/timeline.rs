use chrono::{Datelike, NaiveDate};

use crate::event::AcademicEvent;

/// All events, ascending by start.
pub fn timeline(events: &[AcademicEvent]) -> Vec<&AcademicEvent> {
    let mut sorted: Vec<&AcademicEvent> = events.iter().collect();
    sorted.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.cmp(&b.id)));
    sorted
}

/// Timeline grouped under the first day of each month.
pub fn timeline_by_month(events: &[AcademicEvent]) -> Vec<(NaiveDate, Vec<&AcademicEvent>)> {
    let mut groups: Vec<(NaiveDate, Vec<&AcademicEvent>)> = Vec::new();
    for event in timeline(events) {
        let month = event.first_day().with_day(1).unwrap_or(event.first_day());
        match groups.last_mut() {
            Some((current, group)) if *current == month => group.push(event),
            _ => groups.push((month, vec![event])),
        }
    }
    groups
}
