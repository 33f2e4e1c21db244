//! Terminal rendering for campusdesk types.
//!
//! Extension traits add colored output to campusdesk-core types using
//! owo_colors. Functions that lay out whole views live in the submodules.

mod analytics;
mod attendance;
mod calendar;

use chrono::NaiveDateTime;
use owo_colors::OwoColorize;

use campusdesk_core::attendance::{AttendanceStatus, EnrollmentStatus, RiskLevel};
use campusdesk_core::event::{Category, EventStatus, Priority};
use campusdesk_core::paginate::Page;

pub use analytics::{render_departments, render_pattern, render_risk_distribution, render_summary};
pub use attendance::{render_student_details, render_student_table, render_trend_chart, render_trend_table};
pub use calendar::{
    render_academic_years, render_event_detail, render_event_table, render_month, render_timeline, render_week,
};

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Category {
    fn render(&self) -> String {
        let label = self.as_str();
        match self {
            Category::Academic => label.blue().to_string(),
            Category::Administrative => label.cyan().to_string(),
            Category::Holiday => label.green().to_string(),
            Category::Special => label.magenta().to_string(),
            Category::Deadline => label.red().to_string(),
        }
    }
}

impl Render for Priority {
    fn render(&self) -> String {
        let label = self.as_str();
        match self {
            Priority::Low => label.dimmed().to_string(),
            Priority::Medium => label.to_string(),
            Priority::High => label.yellow().to_string(),
            Priority::Critical => label.red().bold().to_string(),
        }
    }
}

impl Render for EventStatus {
    fn render(&self) -> String {
        let label = self.as_str();
        match self {
            EventStatus::Draft => label.yellow().to_string(),
            EventStatus::Published => label.green().to_string(),
            EventStatus::Cancelled => label.red().strikethrough().to_string(),
        }
    }
}

impl Render for RiskLevel {
    fn render(&self) -> String {
        let label = self.as_str();
        match self {
            RiskLevel::None => label.green().to_string(),
            RiskLevel::Low => label.cyan().to_string(),
            RiskLevel::Medium => label.yellow().to_string(),
            RiskLevel::High => label.red().bold().to_string(),
        }
    }
}

impl Render for EnrollmentStatus {
    fn render(&self) -> String {
        let label = self.as_str();
        match self {
            EnrollmentStatus::Active => label.green().to_string(),
            EnrollmentStatus::Inactive => label.yellow().to_string(),
            EnrollmentStatus::Archived => label.dimmed().to_string(),
        }
    }
}

impl Render for AttendanceStatus {
    fn render(&self) -> String {
        let label = self.to_string();
        match self {
            AttendanceStatus::Present => label.green().to_string(),
            AttendanceStatus::Absent => label.red().to_string(),
            AttendanceStatus::Late => label.yellow().to_string(),
            AttendanceStatus::Excused => label.cyan().to_string(),
        }
    }
}

/// Color an attendance rate by band.
pub fn render_rate(rate: f64) -> String {
    let text = format!("{rate:5.1}%");
    if rate >= 95.0 {
        text.green().to_string()
    } else if rate >= 85.0 {
        text.to_string()
    } else if rate >= 75.0 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}

/// "Page 2 of 5 (21-40 of 93)"
pub fn render_page_footer<T>(page: &Page<T>) -> String {
    let shown = match page.shown_range() {
        Some((first, last)) => format!("{first}-{last} of {}", page.total),
        None => format!("0 of {}", page.total),
    };
    let mut footer = format!("Page {} of {} ({shown})", page.page, page.total_pages().max(1));
    if page.has_next() {
        footer.push_str(&format!(", next: --page {}", page.page + 1));
    }
    footer.dimmed().to_string()
}

pub fn format_time(dt: &NaiveDateTime, use_24_hour_time: bool) -> String {
    if use_24_hour_time {
        dt.format("%H:%M").to_string()
    } else {
        dt.format("%-I:%M%P").to_string()
    }
}

/// Cut to `width` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Horizontal bar scaled so `max` fills `width` cells.
pub fn bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let cells = ((value / max) * width as f64).round() as usize;
    "█".repeat(cells.clamp(1, width))
}
