use chrono::{Datelike, NaiveDate, Weekday};
use owo_colors::OwoColorize;

use campusdesk_core::academic::AcademicYear;
use campusdesk_core::event::AcademicEvent;
use campusdesk_core::paginate::Page;
use campusdesk_core::settings::CalendarSettings;
use campusdesk_core::view::{DayColumn, MonthGrid};

use super::{format_time, render_page_footer, truncate, Render};

const CELL_WIDTH: usize = 14;

/// Events listed per month cell before collapsing into "+N more".
const CELL_EVENTS: usize = 2;

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Left-align a colored label by padding on its plain length.
fn pad(plain: &str, colored: String, width: usize) -> String {
    let len = plain.chars().count();
    format!("{colored}{}", " ".repeat(width.saturating_sub(len)))
}

fn event_time(event: &AcademicEvent, use_24_hour_time: bool) -> String {
    if event.all_day {
        "all-day".to_string()
    } else {
        format_time(&event.start_date, use_24_hour_time)
    }
}

fn event_dates(event: &AcademicEvent) -> String {
    if event.is_multi_day() {
        format!("{} to {}", event.first_day(), event.last_day())
    } else {
        event.first_day().to_string()
    }
}

/// Month grid: whole weeks, days outside the month dimmed.
pub fn render_month(grid: &MonthGrid, today: NaiveDate, settings: &CalendarSettings) -> String {
    let mut lines = Vec::new();

    let title = NaiveDate::from_ymd_opt(grid.year, grid.month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_default();
    lines.push(title.bold().to_string());

    let visible = |date: NaiveDate| settings.show_weekends || !is_weekend(date);

    if let Some(first_week) = grid.weeks.first() {
        let header: String = first_week
            .iter()
            .filter(|c| visible(c.date))
            .map(|c| format!("{:<CELL_WIDTH$}", c.date.format("%a").to_string()))
            .collect();
        lines.push(header.dimmed().to_string());
    }

    for week in &grid.weeks {
        let cells: Vec<_> = week.iter().filter(|c| visible(c.date)).collect();

        let mut day_line = String::new();
        for cell in &cells {
            let label = format!("{:<CELL_WIDTH$}", cell.date.day());
            let label = if cell.date == today {
                label.reversed().to_string()
            } else if !cell.in_month {
                label.dimmed().to_string()
            } else {
                label.bold().to_string()
            };
            day_line.push_str(&label);
        }
        lines.push(day_line);

        for slot in 0..=CELL_EVENTS {
            let mut line = String::new();
            let mut any = false;
            for cell in &cells {
                let text = if slot < CELL_EVENTS {
                    cell.events.get(slot).map(|e| truncate(&e.title, CELL_WIDTH - 2))
                } else if cell.events.len() > CELL_EVENTS {
                    Some(format!("+{} more", cell.events.len() - CELL_EVENTS))
                } else {
                    None
                };
                match text {
                    Some(text) => {
                        any = true;
                        let padded = format!("{text:<CELL_WIDTH$}");
                        let colored = match (slot < CELL_EVENTS, cell.events.get(slot)) {
                            (true, Some(_)) if !cell.in_month => padded.dimmed().to_string(),
                            (true, Some(event)) => color_by_category(event, padded),
                            _ => padded.dimmed().to_string(),
                        };
                        line.push_str(&colored);
                    }
                    None => line.push_str(&" ".repeat(CELL_WIDTH)),
                }
            }
            if any {
                lines.push(line.trim_end().to_string());
            }
        }
    }

    lines.join("\n")
}

fn color_by_category(event: &AcademicEvent, text: String) -> String {
    use campusdesk_core::event::Category;
    match event.category {
        Category::Academic => text.blue().to_string(),
        Category::Administrative => text.cyan().to_string(),
        Category::Holiday => text.green().to_string(),
        Category::Special => text.magenta().to_string(),
        Category::Deadline => text.red().to_string(),
    }
}

/// Week or day view: an all-day strip per day, then timed events by hour,
/// indented by their stack index.
pub fn render_week(columns: &[DayColumn], today: NaiveDate, settings: &CalendarSettings) -> String {
    let mut blocks = Vec::new();

    for column in columns {
        if !settings.show_weekends && columns.len() > 1 && is_weekend(column.date) {
            continue;
        }

        let mut lines = Vec::new();
        let heading = column.date.format("%a %b %-d").to_string();
        if column.date == today {
            lines.push(format!("{} {}", heading.bold(), "(today)".dimmed()));
        } else {
            lines.push(heading.bold().to_string());
        }

        if column.is_empty() {
            lines.push(format!("  {}", "No events".dimmed()));
            blocks.push(lines.join("\n"));
            continue;
        }

        for event in &column.all_day {
            lines.push(format!(
                "  {:>7}  {} {}",
                "all-day".dimmed(),
                color_by_category(event, event.title.clone()),
                format!("[{}]", event_dates(event)).dimmed()
            ));
        }

        for hour in 0..24 {
            for placement in column.at_hour(hour) {
                let event = placement.event;
                lines.push(format!(
                    "  {:>7}  {}{} {}",
                    format_time(&event.start_date, settings.use_24_hour_time),
                    " ".repeat(placement.offset()),
                    color_by_category(event, event.title.clone()),
                    format!("until {}", format_time(&event.end_date, settings.use_24_hour_time)).dimmed()
                ));
            }
        }

        blocks.push(lines.join("\n"));
    }

    blocks.join("\n\n")
}

/// Events in start order, grouped under month headings.
pub fn render_timeline(groups: &[(NaiveDate, Vec<&AcademicEvent>)], use_24_hour_time: bool) -> String {
    if groups.is_empty() {
        return "No events found".dimmed().to_string();
    }

    let mut blocks = Vec::new();
    for (month, events) in groups {
        let mut lines = vec![month.format("%B %Y").to_string().bold().to_string()];
        for event in events {
            lines.push(format!(
                "  {:<10} {:>7}  {} {}",
                event.first_day().format("%a %-d").to_string(),
                event_time(event, use_24_hour_time),
                color_by_category(event, event.title.clone()),
                format!("#{}", event.id).dimmed()
            ));
        }
        blocks.push(lines.join("\n"));
    }
    blocks.join("\n\n")
}

pub fn render_event_table(page: &Page<AcademicEvent>, use_24_hour_time: bool) -> String {
    if page.items.is_empty() {
        return "No events found".dimmed().to_string();
    }

    let mut lines = vec![format!(
        "{:>5}  {:<23}  {:>7}  {:<32}  {:<14}  {:<8}  {}",
        "ID", "Date", "Time", "Title", "Category", "Priority", "Status"
    )
    .dimmed()
    .to_string()];

    for event in &page.items {
        lines.push(format!(
            "{:>5}  {:<23}  {:>7}  {:<32}  {}  {}  {}",
            event.id,
            event_dates(event),
            event_time(event, use_24_hour_time),
            truncate(&event.title, 32),
            pad(event.category.as_str(), event.category.render(), 14),
            pad(event.priority.as_str(), event.priority.render(), 8),
            event.status.render()
        ));
    }

    lines.push(String::new());
    lines.push(render_page_footer(page));
    lines.join("\n")
}

pub fn render_event_detail(event: &AcademicEvent, use_24_hour_time: bool) -> String {
    let mut lines = vec![format!("{} {}", event.title.bold(), format!("#{}", event.id).dimmed())];

    let when = if event.all_day {
        format!("{} (all day)", event_dates(event))
    } else if event.is_multi_day() {
        format!(
            "{} {} to {} {}",
            event.first_day(),
            format_time(&event.start_date, use_24_hour_time),
            event.last_day(),
            format_time(&event.end_date, use_24_hour_time)
        )
    } else {
        format!(
            "{} {} to {}",
            event.first_day(),
            format_time(&event.start_date, use_24_hour_time),
            format_time(&event.end_date, use_24_hour_time)
        )
    };

    let field = |name: &str, value: String| format!("  {:<10} {}", format!("{name}:").dimmed(), value);

    lines.push(field("When", when));
    if let Some(location) = &event.location {
        lines.push(field("Where", location.clone()));
    }
    lines.push(field("Category", event.category.render()));
    lines.push(field("Priority", event.priority.render()));
    lines.push(field("Status", event.status.render()));
    if let Some(approval) = event.approval.approval_status {
        let mut text = format!("{approval:?}").to_lowercase();
        if let Some(by) = &event.approval.approved_by {
            text.push_str(&format!(" by {by}"));
        }
        if let Some(at) = &event.approval.approved_at {
            text.push_str(&format!(" on {}", at.date()));
        }
        lines.push(field("Approval", text));
    }
    if !event.tags.is_empty() {
        lines.push(field("Tags", event.tags.join(", ")));
    }
    if let Some(description) = &event.description {
        lines.push(String::new());
        lines.push(format!("  {description}"));
    }

    lines.join("\n")
}

pub fn render_academic_years(years: &[AcademicYear], today: NaiveDate) -> String {
    if years.is_empty() {
        return "No academic years found".dimmed().to_string();
    }

    let current_id = AcademicYear::current(years, today).map(|y| y.id);
    let mut lines = Vec::new();

    for year in years {
        let range = format!("{} to {}", year.start_date, year.end_date);
        if Some(year.id) == current_id {
            lines.push(format!("{} {} {}", year.name.bold(), range.dimmed(), "(current)".green()));
        } else {
            lines.push(format!("{} {}", year.name, range.dimmed()));
        }

        for semester in year.semesters_sorted() {
            let marker = if semester.contains(today) { "›" } else { " " };
            lines.push(format!(
                "  {marker} {:<20} {}",
                semester.name,
                format!("{} to {}", semester.start_date, semester.end_date).dimmed()
            ));
        }
    }

    lines.join("\n")
}
