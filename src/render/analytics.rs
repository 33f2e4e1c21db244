use owo_colors::OwoColorize;

use campusdesk_core::analytics::{
    AttendanceSummary, DepartmentStat, ExtremumKind, PatternAnalysis, RiskBreakdown, TimeSeriesPoint, TrendDirection,
};
use campusdesk_core::attendance::RiskLevel;

use super::{bar, render_rate, truncate, Render};

const BAR_WIDTH: usize = 30;

pub fn render_summary(summary: &AttendanceSummary, scope: &str) -> String {
    let mut lines = vec![format!("{} {}", "Attendance summary".bold(), format!("({scope})").dimmed())];

    lines.push(format!("  Students:       {}", summary.total_students));
    lines.push(format!("  Average rate:  {}", render_rate(summary.average_rate)));

    let total = summary.total_records();
    let share = |n: u64| {
        if total == 0 {
            0.0
        } else {
            n as f64 * 100.0 / total as f64
        }
    };
    lines.push(format!(
        "  Records:        {} present ({:.1}%), {} absent ({:.1}%), {} late ({:.1}%), {} excused ({:.1}%)",
        summary.present,
        share(summary.present),
        summary.absent,
        share(summary.absent),
        summary.late,
        share(summary.late),
        summary.excused,
        share(summary.excused)
    ));
    lines.push(format!(
        "  At risk:        {}",
        summary.risk_counts.at_risk().to_string().yellow()
    ));

    lines.join("\n")
}

/// Share of students per risk level, as percentage bars.
pub fn render_risk_distribution(risk: &RiskBreakdown) -> String {
    let mut lines = vec!["Risk distribution".bold().to_string()];
    let total = risk.total();
    if total == 0 {
        lines.push(format!("  {}", "No students".dimmed()));
        return lines.join("\n");
    }

    for level in RiskLevel::ALL {
        let count = risk.count(level);
        let pct = count as f64 * 100.0 / total as f64;
        lines.push(format!(
            "  {}{}  {:<BAR_WIDTH$}  {:>4}  {}",
            level.render(),
            " ".repeat(6usize.saturating_sub(level.as_str().len())),
            bar(pct, 100.0, BAR_WIDTH),
            count,
            format!("{pct:.1}%").dimmed()
        ));
    }
    lines.join("\n")
}

pub fn render_departments(departments: &[DepartmentStat]) -> String {
    let mut lines = vec!["By department".bold().to_string()];
    if departments.is_empty() {
        lines.push(format!("  {}", "No departments".dimmed()));
        return lines.join("\n");
    }

    for dept in departments {
        lines.push(format!(
            "  {:<18}  {:<BAR_WIDTH$}  {}  {}",
            truncate(&dept.department, 18),
            bar(dept.average_rate, 100.0, BAR_WIDTH),
            render_rate(dept.average_rate),
            format!("{} students, {} at risk", dept.students, dept.at_risk).dimmed()
        ));
    }
    lines.join("\n")
}

/// Time series with its moving average, peaks and troughs marked.
pub fn render_pattern(points: &[TimeSeriesPoint], analysis: &PatternAnalysis, window: usize) -> String {
    let mut lines = vec![format!(
        "{} {}",
        "Attendance over time".bold(),
        format!("({window}-point moving average)").dimmed()
    )];

    if points.is_empty() {
        lines.push(format!("  {}", "No data in this range".dimmed()));
        return lines.join("\n");
    }

    for (i, point) in points.iter().enumerate() {
        let marker = match analysis.extrema.iter().find(|e| e.index == i).map(|e| e.kind) {
            Some(ExtremumKind::Peak) => "▲ peak".green().to_string(),
            Some(ExtremumKind::Trough) => "▼ low".red().to_string(),
            None => String::new(),
        };
        let smoothed = analysis.smoothed.get(i).copied().unwrap_or(point.rate);
        lines.push(format!(
            "  {}  {:<BAR_WIDTH$}  {}  {}  {}",
            point.date.format("%a %m-%d"),
            bar(point.rate, 100.0, BAR_WIDTH),
            render_rate(point.rate),
            format!("avg {smoothed:5.1}%").dimmed(),
            marker
        ));
    }

    let direction = match analysis.direction {
        TrendDirection::Improving => "improving".green().to_string(),
        TrendDirection::Declining => "declining".red().to_string(),
        TrendDirection::Stable => "stable".to_string(),
    };
    lines.push(String::new());
    lines.push(format!("  Trend: {direction}"));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusdesk_core::analytics::analyze;

    fn point(day: u32, rate: f64) -> TimeSeriesPoint {
        serde_json::from_value(serde_json::json!({
            "date": format!("2024-03-{day:02}"),
            "rate": rate,
        }))
        .unwrap()
    }

    #[test]
    fn pattern_marks_peak_and_trough() {
        let points = vec![point(1, 80.0), point(2, 95.0), point(3, 70.0), point(4, 85.0)];
        let analysis = analyze(&points, 3);
        let out = render_pattern(&points, &analysis, 3);
        let lines: Vec<_> = out.lines().collect();
        assert!(lines[2].contains("peak"));
        assert!(lines[3].contains("low"));
        assert!(!lines[1].contains("peak"));
    }

    #[test]
    fn risk_distribution_lists_every_level() {
        let risk = RiskBreakdown {
            none: 6,
            low: 2,
            medium: 1,
            high: 1,
        };
        let out = render_risk_distribution(&risk);
        assert_eq!(out.lines().count(), 5);
        assert!(out.contains("60.0%"));
    }
}
