use chrono::{Duration, NaiveDateTime};
use icalendar::{Calendar, Component, EventLike, Property, ValueType};

use crate::error::CampusResult;
use crate::event::{AcademicEvent, EventStatus, Priority};

pub const PRODID: &str = "-//campusdesk//Academic Calendar//EN";

/// Generate one VCALENDAR holding a VEVENT per event.
pub fn events_ical(events: &[AcademicEvent]) -> CampusResult<String> {
    let mut cal = Calendar::new();

    for event in events {
        cal.push(to_vevent(event));
    }

    let cal = cal.done();
    Ok(strip_ics_bloat(&cal.to_string()))
}

fn to_vevent(event: &AcademicEvent) -> icalendar::Event {
    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&format!("{}@campusdesk", event.id));
    ics_event.summary(&event.title);

    let dtstamp = event
        .approval
        .approved_at
        .unwrap_or_else(|| chrono::Local::now().naive_local());
    ics_event.add_property("DTSTAMP", format_floating(&dtstamp));

    if event.all_day {
        // DTEND is exclusive for VALUE=DATE
        add_date_property(&mut ics_event, "DTSTART", event.first_day());
        add_date_property(&mut ics_event, "DTEND", event.last_day() + Duration::days(1));
    } else {
        ics_event.add_property("DTSTART", format_floating(&event.start_date));
        ics_event.add_property("DTEND", format_floating(&event.end_date.max(event.start_date)));
    }

    if let Some(ref desc) = event.description {
        ics_event.description(desc);
    }

    if let Some(ref loc) = event.location {
        ics_event.location(loc);
    }

    let status = match event.status {
        EventStatus::Published => "CONFIRMED",
        EventStatus::Draft => "TENTATIVE",
        EventStatus::Cancelled => "CANCELLED",
    };
    ics_event.add_property("STATUS", status);
    ics_event.add_property("PRIORITY", ical_priority(event.priority).to_string());

    let mut categories = vec![event.category.as_str().to_uppercase()];
    categories.extend(event.tags.iter().map(|t| t.to_uppercase()));
    ics_event.add_property("CATEGORIES", categories.join(","));

    if let Some(ref color) = event.color {
        ics_event.add_property("COLOR", color);
    }

    ics_event.done()
}

/// RFC 5545 priority: 1 is highest, 9 lowest.
fn ical_priority(priority: Priority) -> u8 {
    match priority {
        Priority::Critical => 1,
        Priority::High => 3,
        Priority::Medium => 5,
        Priority::Low => 9,
    }
}

/// Floating local time (no Z, no TZID): school events happen in school time.
fn format_floating(dt: &NaiveDateTime) -> String {
    dt.format("%Y%m%dT%H%M%S").to_string()
}

fn add_date_property(ics_event: &mut icalendar::Event, name: &str, date: chrono::NaiveDate) {
    let mut prop = Property::new(name, date.format("%Y%m%d").to_string());
    prop.append_parameter(ValueType::Date);
    ics_event.append_property(prop);
}

/// Clean up ICS output from the icalendar crate
/// - Replace PRODID with ours
/// - Remove CALSCALE:GREGORIAN (it's the default)
fn strip_ics_bloat(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(PRODID);
            result.push_str("\r\n");
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::fixtures::{at, event, on};
    use crate::event::Category;

    #[test]
    fn one_vevent_per_event() {
        let events = vec![on(1, "Opening", "2024-06-03"), on(2, "Midterms", "2024-08-12")];
        let ics = events_ical(&events).unwrap();
        assert_eq!(ics.lines().filter(|l| *l == "BEGIN:VEVENT").count(), 2);
        assert!(ics.contains("UID:1@campusdesk"));
        assert!(ics.contains("DTSTART:20240603T090000"));
        assert!(ics.contains(&format!("PRODID:{PRODID}")));
        assert!(!ics.contains("CALSCALE"));
    }

    #[test]
    fn all_day_event_has_value_date_and_exclusive_end() {
        let mut e = event(1, "Holy Week", at("2024-03-25", "00:00"), at("2024-03-30", "00:00"));
        e.all_day = true;
        e.category = Category::Holiday;
        let ics = events_ical(&[e]).unwrap();
        assert!(ics.contains("DTSTART;VALUE=DATE:20240325"), "ICS:\n{ics}");
        assert!(ics.contains("DTEND;VALUE=DATE:20240330"), "ICS:\n{ics}");
        assert!(ics.contains("CATEGORIES:HOLIDAY"));
    }

    #[test]
    fn status_and_priority_mapping() {
        let mut e = on(1, "Enrollment deadline", "2024-07-01");
        e.status = EventStatus::Cancelled;
        e.priority = Priority::Critical;
        let ics = events_ical(&[e]).unwrap();
        assert!(ics.contains("STATUS:CANCELLED"));
        assert!(ics.contains("PRIORITY:1"));
    }
}
