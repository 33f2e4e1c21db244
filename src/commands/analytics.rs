use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use owo_colors::OwoColorize;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};

use campusdesk_core::analytics::{analyze, drill_down, AnalyticsFilters, AnalyticsReport, Segment, TimeRange};
use campusdesk_core::attendance::{RiskLevel, StudentAttendance};
use campusdesk_core::constants::DEFAULT_MOVING_AVERAGE_WINDOW;
use campusdesk_core::filter::StudentFilter;
use campusdesk_core::paginate::{paginate, PageRequest};
use campusdesk_core::settings::{load_analytics_filters, save_analytics_filters};

use super::Context;
use crate::client::ApiError;
use crate::render;
use crate::utils::tui;

#[derive(Args, Debug, Clone, Default)]
pub struct AnalyticsArgs {
    #[command(subcommand)]
    pub command: Option<AnalyticsCommand>,

    #[command(flatten)]
    pub show: ShowArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AnalyticsCommand {
    /// Stage filter changes without applying them
    Stage(StageArgs),
    /// Apply the staged filters
    Apply,
    /// Drop staged changes, keep the applied filters
    Discard,
    /// Back to the default filters
    Reset,
    /// Show applied and staged filters
    Filters,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Drill into one segment: risk:high, department:NAME or band:critical
    #[arg(long)]
    pub drill: Option<Segment>,

    /// Moving average window for the pattern chart
    #[arg(long, default_value_t = DEFAULT_MOVING_AVERAGE_WINDOW)]
    pub window: usize,

    /// Refresh every N seconds until Ctrl+C
    #[arg(long, value_name = "SECS")]
    pub watch: Option<u64>,

    /// Page of the drill-down student list
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Defaults to page_size from the config file
    #[arg(long)]
    pub page_size: Option<usize>,
}

impl Default for ShowArgs {
    fn default() -> Self {
        ShowArgs {
            drill: None,
            window: DEFAULT_MOVING_AVERAGE_WINDOW,
            watch: None,
            page: 1,
            page_size: None,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct StageArgs {
    #[arg(long)]
    pub department: Option<String>,

    /// none, low, medium or high
    #[arg(long)]
    pub risk: Option<RiskLevel>,

    /// today, week, month, quarter, year or FROM..TO
    #[arg(long)]
    pub range: Option<TimeRange>,

    /// Clear the staged department and risk level first
    #[arg(long)]
    pub clear: bool,
}

pub async fn run(ctx: &Context, args: AnalyticsArgs) -> Result<()> {
    match args.command {
        None => show(ctx, args.show).await,
        Some(command) => filters(ctx, command),
    }
}

fn filters(ctx: &Context, command: AnalyticsCommand) -> Result<()> {
    let mut staged = load_analytics_filters(ctx.store()).context("Failed to load analytics filters")?;

    match command {
        AnalyticsCommand::Stage(args) => {
            let pending = staged.pending_mut();
            if args.clear {
                pending.department = None;
                pending.risk_level = None;
            }
            if let Some(department) = args.department {
                pending.department = Some(department);
            }
            if let Some(risk) = args.risk {
                pending.risk_level = Some(risk);
            }
            if let Some(range) = args.range {
                pending.time_range = range;
            }
            if staged.is_dirty() {
                println!("Staged, run {} to use them", "campusdesk analytics apply".cyan());
            }
        }
        AnalyticsCommand::Apply => {
            if staged.apply() {
                info!(filters = ?staged.applied(), "analytics filters applied");
                println!("{} filters applied", "✓".green());
            } else {
                println!("{}", "Nothing staged".dimmed());
            }
        }
        AnalyticsCommand::Discard => {
            staged.discard();
            println!("Staged changes discarded");
        }
        AnalyticsCommand::Reset => {
            staged.reset();
            println!("Filters reset");
        }
        AnalyticsCommand::Filters => {}
    }

    save_analytics_filters(ctx.store(), &staged).context("Failed to save analytics filters")?;
    println!("{}", describe("Applied", staged.applied()));
    if staged.is_dirty() {
        println!("{}", describe("Staged", staged.pending()).yellow());
    }
    Ok(())
}

fn describe(label: &str, filters: &AnalyticsFilters) -> String {
    format!(
        "{label}: department {}, risk {}, {}",
        filters.department.as_deref().unwrap_or("any"),
        filters.risk_level.map(|r| r.to_string()).unwrap_or_else(|| "any".to_string()),
        filters.time_range.label()
    )
}

async fn show(ctx: &Context, args: ShowArgs) -> Result<()> {
    let staged = load_analytics_filters(ctx.store()).context("Failed to load analytics filters")?;
    if staged.is_dirty() {
        println!(
            "{}",
            "Staged filter changes are not applied yet (campusdesk analytics apply)".yellow()
        );
    }
    let filters = staged.applied().clone();

    match args.watch {
        Some(secs) => watch(ctx, &filters, &args, Duration::from_secs(secs.max(1))).await,
        None => {
            let spinner = tui::create_spinner("Loading analytics".to_string());
            let range = filters.time_range.to_date_range(ctx.today, ctx.settings.week_start);
            let result = ctx.client.analytics(&filters, &range).await;
            spinner.finish_and_clear();
            if let Some(report) = result.context("Failed to load analytics")? {
                println!("{}", render_report(&report, &filters, args.window));
            }
            if let Some(segment) = &args.drill {
                let request = PageRequest::new(args.page, args.page_size.unwrap_or(ctx.config.page_size));
                drill(ctx, &filters, segment, request).await?;
            }
            Ok(())
        }
    }
}

fn render_report(report: &AnalyticsReport, filters: &AnalyticsFilters, window: usize) -> String {
    let mut sections = vec![
        render::render_summary(&report.summary, &filters.time_range.label()),
        render::render_risk_distribution(&report.summary.risk_counts),
    ];
    if !report.departments.is_empty() {
        sections.push(render::render_departments(&report.departments));
    }
    if !report.time_series.is_empty() {
        let analysis = analyze(&report.time_series, window);
        sections.push(render::render_pattern(&report.time_series, &analysis, window));
    }
    sections.join("\n\n")
}

/// Students in one chart segment, scoped by the applied filters.
async fn drill(ctx: &Context, filters: &AnalyticsFilters, segment: &Segment, request: PageRequest) -> Result<()> {
    let student_filter = StudentFilter {
        department: filters.department.clone(),
        risk_levels: filters.risk_level.into_iter().collect(),
        ..Default::default()
    };

    let spinner = tui::create_spinner("Loading students".to_string());
    let result = super::students::fetch_all(&ctx.client, &student_filter).await;
    spinner.finish_and_clear();
    let students = result.context("Failed to load students for drill-down")?;

    let selected = select_segment(&students, filters, segment);
    println!();
    println!("{}", render_drill(segment, &selected, request));
    Ok(())
}

fn render_drill(segment: &Segment, selected: &[StudentAttendance], request: PageRequest) -> String {
    format!(
        "{} {}\n{}",
        segment_label(segment).bold(),
        format!("({})", selected.len()).dimmed(),
        render::render_student_table(&paginate(selected, request))
    )
}

fn segment_label(segment: &Segment) -> String {
    match segment {
        Segment::Risk(level) => format!("Risk level {level}"),
        Segment::Department(name) => format!("Department {name}"),
        Segment::Band(band) => format!("Attendance {}", band.label()),
    }
}

fn select_segment(students: &[StudentAttendance], filters: &AnalyticsFilters, segment: &Segment) -> Vec<StudentAttendance> {
    drill_down(students, segment)
        .into_iter()
        .filter(|s| filters.matches(s))
        .cloned()
        .collect()
}

/// Refetch on a timer. Every fetch runs on its own task; a response that
/// arrives after a newer fetch has started comes back as `None` and is
/// skipped.
async fn watch(ctx: &Context, filters: &AnalyticsFilters, args: &ShowArgs, every: Duration) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<Result<Option<AnalyticsReport>, ApiError>>(8);
    let mut ticker = interval(every);
    info!(every_secs = every.as_secs(), "watching analytics");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let client = ctx.client.clone();
                let filters = filters.clone();
                let range = filters.time_range.to_date_range(ctx.today, ctx.settings.week_start);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = client.analytics(&filters, &range).await;
                    let _ = tx.send(result).await;
                });
            }
            Some(result) = rx.recv() => match result {
                Ok(Some(report)) => {
                    println!("{}", "─".repeat(60).dimmed());
                    println!("{}", render_report(&report, filters, args.window));
                }
                Ok(None) => debug!("skipped superseded analytics response"),
                Err(e) => warn!(error = %e, "analytics refresh failed"),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("stopped watching");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusdesk_core::analytics::{RateBand, StagedFilters};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::commands::testing::context_for;

    fn report_json() -> serde_json::Value {
        json!({
            "success": true,
            "data": {
                "summary": {
                    "totalStudents": 2,
                    "averageRate": 80.0,
                    "riskCounts": {"none": 1, "high": 1}
                },
                "timeSeries": [
                    {"date": "2024-03-11", "rate": 80.0},
                    {"date": "2024-03-12", "rate": 90.0},
                    {"date": "2024-03-13", "rate": 70.0}
                ]
            }
        })
    }

    #[tokio::test]
    async fn staging_does_not_change_the_query_until_applied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/attendance/analytics"))
            .and(query_param("from", "2024-03-01"))
            .and(query_param("to", "2024-03-31"))
            .respond_with(ResponseTemplate::new(200).set_body_json(report_json()))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context_for(&server, "2024-03-15");
        let stage = StageArgs {
            department: Some("Nursing".into()),
            ..Default::default()
        };
        filters(&ctx, AnalyticsCommand::Stage(stage)).unwrap();

        let staged: StagedFilters = load_analytics_filters(ctx.store()).unwrap();
        assert!(staged.is_dirty());
        assert_eq!(staged.applied().department, None);

        show(&ctx, ShowArgs::default()).await.unwrap();
        assert!(server.received_requests().await.unwrap()[0]
            .url
            .query_pairs()
            .all(|(k, _)| k != "department"));

        filters(&ctx, AnalyticsCommand::Apply).unwrap();
        let staged = load_analytics_filters(ctx.store()).unwrap();
        assert_eq!(staged.applied().department.as_deref(), Some("Nursing"));
        assert!(!staged.is_dirty());
    }

    #[tokio::test]
    async fn reset_clears_both_sides() {
        let server = MockServer::start().await;
        let ctx = context_for(&server, "2024-03-15");
        let stage = StageArgs {
            risk: Some(RiskLevel::High),
            range: Some(TimeRange::Year),
            ..Default::default()
        };
        filters(&ctx, AnalyticsCommand::Stage(stage)).unwrap();
        filters(&ctx, AnalyticsCommand::Apply).unwrap();
        filters(&ctx, AnalyticsCommand::Reset).unwrap();

        let staged = load_analytics_filters(ctx.store()).unwrap();
        assert_eq!(staged, StagedFilters::default());
    }

    #[test]
    fn report_includes_pattern_section() {
        let report: AnalyticsReport = serde_json::from_value(report_json()["data"].clone()).unwrap();
        let out = render_report(&report, &AnalyticsFilters::default(), 2);
        assert!(out.contains("this month"));
        assert!(out.matches("\n\n").count() >= 2);
    }

    #[tokio::test]
    async fn drill_down_narrows_to_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/attendance/students"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"studentId": 1, "firstName": "Ana", "lastName": "Cruz", "attendanceRate": 55.0, "riskLevel": "high"},
                    {"studentId": 2, "firstName": "Ben", "lastName": "Diaz", "attendanceRate": 97.0, "riskLevel": "none"}
                ],
                "total": 2
            })))
            .mount(&server)
            .await;

        let ctx = context_for(&server, "2024-03-15");
        let students = crate::commands::students::fetch_all(&ctx.client, &StudentFilter::default())
            .await
            .unwrap();
        let critical = select_segment(&students, &AnalyticsFilters::default(), &Segment::Band(RateBand::Critical));
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].student_id, 1);

        drill(&ctx, &AnalyticsFilters::default(), &Segment::Risk(RiskLevel::None), PageRequest::new(1, 20))
            .await
            .unwrap();
    }

    #[test]
    fn drill_down_pages_past_the_first() {
        let students: Vec<StudentAttendance> = (1..=5)
            .map(|id| {
                serde_json::from_value(json!({
                    "studentId": id,
                    "firstName": format!("Student{id}"),
                    "lastName": "Reyes",
                    "attendanceRate": 50.0,
                    "riskLevel": "high"
                }))
                .unwrap()
            })
            .collect();
        let segment = Segment::Risk(RiskLevel::High);
        let selected = select_segment(&students, &AnalyticsFilters::default(), &segment);

        let first = render_drill(&segment, &selected, PageRequest::new(1, 2));
        assert!(first.contains("Student1"));
        assert!(!first.contains("Student3"));
        assert!(first.contains("--page 2"));

        let last = render_drill(&segment, &selected, PageRequest::new(3, 2));
        assert!(last.contains("Student5"));
        assert!(!last.contains("Student1"));
        assert!(!last.contains("--page"));
    }
}
