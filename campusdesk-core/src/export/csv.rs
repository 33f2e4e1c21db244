use crate::attendance::StudentAttendance;
use crate::error::{CampusError, CampusResult};
use crate::event::AcademicEvent;
use crate::timestamp::format_timestamp;

/// Column order shared by event export and import.
pub const EVENT_CSV_HEADER: [&str; 10] = [
    "Title",
    "Description",
    "Start",
    "End",
    "All Day",
    "Category",
    "Priority",
    "Location",
    "Status",
    "Tags",
];

fn finish(writer: csv::Writer<Vec<u8>>) -> CampusResult<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| CampusError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CampusError::Export(e.to_string()))
}

/// Header plus one record per event. Tags are joined with `;`.
pub fn events_csv(events: &[AcademicEvent]) -> CampusResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(EVENT_CSV_HEADER)?;

    for event in events {
        writer.write_record([
            event.title.as_str(),
            event.description.as_deref().unwrap_or_default(),
            format_timestamp(&event.start_date).as_str(),
            format_timestamp(&event.end_date).as_str(),
            if event.all_day { "true" } else { "false" },
            event.category.as_str(),
            event.priority.as_str(),
            event.location.as_deref().unwrap_or_default(),
            event.status.as_str(),
            event.tags.join(";").as_str(),
        ])?;
    }

    finish(writer)
}

pub fn students_csv<'a>(students: impl IntoIterator<Item = &'a StudentAttendance>) -> CampusResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record([
        "Student Number",
        "Last Name",
        "First Name",
        "Department",
        "Course",
        "Year Level",
        "Attendance Rate",
        "Present",
        "Absent",
        "Late",
        "Excused",
        "Risk Level",
        "Status",
    ])?;

    for s in students {
        writer.write_record([
            s.student_number.as_str(),
            s.last_name.as_str(),
            s.first_name.as_str(),
            s.department.as_deref().unwrap_or_default(),
            s.course.as_deref().unwrap_or_default(),
            s.year_level.as_deref().unwrap_or_default(),
            format!("{:.1}", s.attendance_rate).as_str(),
            s.present_count.to_string().as_str(),
            s.absent_count.to_string().as_str(),
            s.late_count.to_string().as_str(),
            s.excused_count.to_string().as_str(),
            s.risk_level.as_str(),
            s.status.as_str(),
        ])?;
    }

    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::fixtures::student;
    use crate::attendance::RiskLevel;
    use crate::event::fixtures::on;

    #[test]
    fn one_line_per_event_plus_header() {
        let events = vec![
            on(1, "Opening", "2024-06-03"),
            on(2, "Midterms", "2024-08-12"),
            on(3, "Recognition, Day", "2024-11-04"),
        ];
        let csv = events_csv(&events).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), events.len() + 1);
        assert_eq!(lines[0], EVENT_CSV_HEADER.join(","));
    }

    #[test]
    fn empty_list_is_header_only() {
        assert_eq!(events_csv(&[]).unwrap().lines().count(), 1);
    }

    #[test]
    fn quotes_fields_with_commas() {
        let csv = events_csv(&[on(1, "Recognition, Day", "2024-11-04")]).unwrap();
        assert!(csv.contains("\"Recognition, Day\""));
        assert!(csv.contains("2024-11-04T09:00:00"));
    }

    #[test]
    fn student_rows() {
        let students = vec![student(1, "Cruz", "Engineering", 92.25, RiskLevel::None)];
        let csv = students_csv(&students).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.contains("92.2") || csv.contains("92.3"));
    }
}
