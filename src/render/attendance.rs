use owo_colors::OwoColorize;

use campusdesk_core::attendance::{StudentAttendance, StudentDetails};
use campusdesk_core::paginate::Page;
use campusdesk_core::trends::{DailyPoint, TrendRow};

use super::{bar, render_page_footer, render_rate, truncate, Render};

const CHART_WIDTH: usize = 40;

/// Daily attendance rate as one bar per day, scaled to 100%.
pub fn render_trend_chart(points: &[DailyPoint]) -> String {
    if points.is_empty() {
        return "No attendance recorded in this range".dimmed().to_string();
    }

    let mut lines = vec!["Daily attendance rate".bold().to_string()];
    for point in points {
        let rate = point.attendance_rate();
        lines.push(format!(
            "  {}  {:<CHART_WIDTH$}  {}  {}",
            point.date.format("%a %m-%d"),
            bar(rate, 100.0, CHART_WIDTH),
            render_rate(rate),
            format!(
                "P {} A {} L {} E {}",
                point.present, point.absent, point.late, point.excused
            )
            .dimmed()
        ));
    }
    lines.join("\n")
}

pub fn render_trend_table(page: &Page<&TrendRow>) -> String {
    if page.items.is_empty() {
        return "No trend rows found".dimmed().to_string();
    }

    let mut lines = vec![format!(
        "{:<10}  {:<10}  {:<24}  {:>7}  {:>6}  {:>4}  {:>7}  {:>6}",
        "Date", "Class", "Name", "Present", "Absent", "Late", "Excused", "Rate"
    )
    .dimmed()
    .to_string()];

    for row in &page.items {
        lines.push(format!(
            "{:<10}  {:<10}  {:<24}  {:>7}  {:>6}  {:>4}  {:>7}  {}",
            row.date.to_string(),
            truncate(&row.class_code, 10),
            truncate(row.class_name.as_deref().unwrap_or(""), 24),
            row.present,
            row.absent,
            row.late,
            row.excused,
            render_rate(row.attendance_rate())
        ));
    }

    lines.push(String::new());
    lines.push(render_page_footer(page));
    lines.join("\n")
}

pub fn render_student_table(page: &Page<StudentAttendance>) -> String {
    if page.items.is_empty() {
        return "No students found".dimmed().to_string();
    }

    let mut lines = vec![format!(
        "{:>6}  {:<12}  {:<26}  {:<16}  {:>6}  {:>6}  {:<6}  {}",
        "ID", "Number", "Name", "Department", "Rate", "Absent", "Risk", "Status"
    )
    .dimmed()
    .to_string()];

    for student in &page.items {
        let risk = student.risk_level;
        lines.push(format!(
            "{:>6}  {:<12}  {:<26}  {:<16}  {}  {:>6}  {}{}  {}",
            student.student_id,
            truncate(&student.student_number, 12),
            truncate(&student.sort_name(), 26),
            truncate(student.department.as_deref().unwrap_or("-"), 16),
            render_rate(student.attendance_rate),
            student.absent_count,
            risk.render(),
            " ".repeat(6usize.saturating_sub(risk.as_str().len())),
            student.status.render()
        ));
    }

    lines.push(String::new());
    lines.push(render_page_footer(page));
    lines.join("\n")
}

pub fn render_student_details(details: &StudentDetails) -> String {
    let student = &details.summary;
    let mut lines = vec![format!(
        "{} {}",
        student.full_name().bold(),
        format!("({})", student.student_number).dimmed()
    )];

    let field = |name: &str, value: String| format!("  {:<12} {}", format!("{name}:").dimmed(), value);

    if let Some(email) = &student.email {
        lines.push(field("Email", email.clone()));
    }
    let program: Vec<&str> = [
        student.department.as_deref(),
        student.course.as_deref(),
        student.year_level.as_deref(),
        student.section.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !program.is_empty() {
        lines.push(field("Program", program.join(" / ")));
    }
    lines.push(field("Status", student.status.render()));
    lines.push(field(
        "Attendance",
        format!(
            "{:.1}% over {} sessions",
            student.attendance_rate, student.total_sessions
        ),
    ));
    lines.push(field(
        "Breakdown",
        format!(
            "{} present, {} absent, {} late, {} excused",
            student.present_count, student.absent_count, student.late_count, student.excused_count
        ),
    ));
    lines.push(field("Risk", student.risk_level.render()));
    if let Some(last) = student.last_attendance {
        lines.push(field("Last seen", last.to_string()));
    }
    if let Some(guardian) = &details.guardian_name {
        let contact = details
            .guardian_contact
            .as_deref()
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        lines.push(field("Guardian", format!("{guardian}{contact}")));
    }

    if !student.schedules.is_empty() {
        lines.push(String::new());
        lines.push("Schedule".bold().to_string());
        for schedule in &student.schedules {
            let when = [schedule.day.as_deref(), schedule.start_time.as_deref(), schedule.end_time.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            lines.push(format!(
                "  {:<10} {:<30} {}",
                schedule.subject_code,
                truncate(&schedule.subject_name, 30),
                when.dimmed()
            ));
        }
    }

    if !details.recent_records.is_empty() {
        lines.push(String::new());
        lines.push("Recent attendance".bold().to_string());
        for record in &details.recent_records {
            let subject = record
                .subject_code
                .as_deref()
                .or(record.subject_name.as_deref())
                .unwrap_or("-");
            let remarks = record.remarks.as_deref().unwrap_or("");
            lines.push(format!(
                "  {}  {:<10} {} {}",
                record.date,
                truncate(subject, 10),
                record.status.render(),
                remarks.dimmed()
            ));
        }
    }

    lines.join("\n")
}
