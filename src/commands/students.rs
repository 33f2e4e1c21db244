use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::{Args, Subcommand};
use owo_colors::OwoColorize;
use tracing::{info, warn};

use campusdesk_core::analytics::AnalyticsFilters;
use campusdesk_core::attendance::{apply_status, EnrollmentStatus, RiskLevel, StatusUpdate, StudentAttendance};
use campusdesk_core::constants::MAX_PAGE_SIZE;
use campusdesk_core::export::students_csv;
use campusdesk_core::filter::{SortDirection, StudentFilter, StudentSort, StudentSortField};
use campusdesk_core::paginate::{Page, PageRequest};

use super::export::write_output;
use super::Context;
use crate::client::{ApiError, Client};
use crate::render::{self, Render};
use crate::utils::tui::{self, pluralize};

#[derive(Subcommand, Debug)]
pub enum StudentsCommand {
    /// List students with attendance summaries
    List(ListArgs),
    /// Attendance details for one student
    Show { id: i64 },
    /// Set the enrollment status of several students
    Status {
        #[arg(required = true)]
        ids: Vec<i64>,
        /// active, inactive or archived
        #[arg(long)]
        to: EnrollmentStatus,
        /// Recorded with the status change
        #[arg(long)]
        reason: Option<String>,
    },
    /// Archive (soft-delete) students
    Archive {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Export the filtered student list
    Export(ExportArgs),
}

/// Student filter flags, sent to the API as query parameters.
#[derive(Args, Debug, Clone, Default)]
pub struct StudentFilterArgs {
    /// Search name, student number, email and course
    #[arg(short = 'q', long)]
    pub search: Option<String>,

    #[arg(long)]
    pub department: Option<String>,

    #[arg(long)]
    pub course: Option<String>,

    #[arg(long)]
    pub year_level: Option<String>,

    /// Only these risk levels (repeatable)
    #[arg(long = "risk")]
    pub risk_levels: Vec<RiskLevel>,

    /// active, inactive or archived
    #[arg(long)]
    pub status: Option<EnrollmentStatus>,
}

impl StudentFilterArgs {
    pub fn to_filter(&self) -> StudentFilter {
        StudentFilter {
            search: self.search.clone(),
            department: self.department.clone(),
            course: self.course.clone(),
            year_level: self.year_level.clone(),
            risk_levels: self.risk_levels.iter().copied().collect(),
            status: self.status,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: StudentFilterArgs,

    /// name, rate, absences, risk or department
    #[arg(long, default_value = "name")]
    pub sort: StudentSortField,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Defaults to page_size from the config file
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Skip the analytics summary header
    #[arg(long)]
    pub no_summary: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// csv (built locally), xlsx or pdf (rendered by the export service)
    #[arg(long, default_value = "csv")]
    pub format: String,

    /// Output file, or "-" for stdout (defaults to student-attendance-<date>.<ext>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub filter: StudentFilterArgs,
}

pub async fn run(ctx: &Context, command: StudentsCommand) -> Result<()> {
    match command {
        StudentsCommand::List(args) => list(ctx, args).await,
        StudentsCommand::Show { id } => show(ctx, id).await,
        StudentsCommand::Status { ids, to, reason } => set_status(ctx, &ids, StatusUpdate { status: to, reason }).await,
        StudentsCommand::Archive { ids } => archive(ctx, &ids).await,
        StudentsCommand::Export(args) => export(ctx, args).await,
    }
}

async fn list(ctx: &Context, args: ListArgs) -> Result<()> {
    let filter = args.filter.to_filter();
    let sort = StudentSort {
        field: args.sort,
        direction: if args.desc { SortDirection::Desc } else { SortDirection::Asc },
    };
    let request = PageRequest::new(args.page, args.page_size.unwrap_or(ctx.config.page_size));

    // The summary header covers the same department/risk scope as the page.
    let scope = AnalyticsFilters {
        department: filter.department.clone(),
        risk_level: single_risk(&filter),
        ..Default::default()
    };
    let range = scope.time_range.to_date_range(ctx.today, ctx.settings.week_start);

    let spinner = tui::create_spinner("Loading students".to_string());
    let (page, analytics) = tokio::join!(ctx.client.list_students(&filter, &sort, request), async {
        if args.no_summary {
            Ok(None)
        } else {
            ctx.client.analytics(&scope, &range).await
        }
    });
    spinner.finish_and_clear();

    let page = page.context("Failed to load students")?;

    match analytics {
        Ok(Some(report)) => {
            println!("{}", render::render_summary(&report.summary, &scope.time_range.label()));
            println!();
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "analytics summary unavailable"),
    }

    println!("{}", render::render_student_table(&page));
    Ok(())
}

/// The analytics endpoint takes one risk level; several selected levels
/// leave the summary unscoped.
fn single_risk(filter: &StudentFilter) -> Option<RiskLevel> {
    match filter.risk_levels.len() {
        1 => filter.risk_levels.iter().next().copied(),
        _ => None,
    }
}

async fn show(ctx: &Context, id: i64) -> Result<()> {
    let spinner = tui::create_spinner(format!("Loading student #{id}"));
    let result = ctx.client.student_details(id).await;
    spinner.finish_and_clear();

    let details = result.with_context(|| format!("Failed to load student #{id}"))?;
    println!("{}", render::render_student_details(&details));
    Ok(())
}

/// Per-id outcome of a bulk student update.
#[derive(Debug, Default)]
pub struct StudentOutcome {
    pub succeeded: Vec<i64>,
    pub failed: Vec<(i64, ApiError)>,
}

/// PATCH each student in turn. Earlier successes are kept when a later id
/// fails.
pub async fn update_statuses(client: &Client, ids: &[i64], update: &StatusUpdate) -> StudentOutcome {
    let mut outcome = StudentOutcome::default();
    for &id in ids {
        match client.update_student_status(id, update).await {
            Ok(()) => outcome.succeeded.push(id),
            Err(e) => {
                warn!(id, error = %e, status = %update.status, "status update failed");
                outcome.failed.push((id, e));
            }
        }
    }
    outcome
}

async fn set_status(ctx: &Context, ids: &[i64], update: StatusUpdate) -> Result<()> {
    let mut students = selected(ctx, ids).await;
    let prompt = format!(
        "Set {} {} to {}?",
        ids.len(),
        pluralize("student", ids.len()),
        update.status
    );
    if !tui::confirm(prompt, ctx.assume_yes)? {
        return Ok(());
    }

    let spinner = tui::create_spinner(format!("Updating {} {}", ids.len(), pluralize("student", ids.len())));
    let outcome = update_statuses(&ctx.client, ids, &update).await;
    spinner.finish_and_clear();

    info!(succeeded = outcome.succeeded.len(), failed = outcome.failed.len(), "status update done");
    apply_status(&mut students, &outcome.succeeded, update.status);
    print_outcome(&students, &outcome, update.status);
    finish(&outcome, ids.len())
}

async fn archive(ctx: &Context, ids: &[i64]) -> Result<()> {
    let mut students = selected(ctx, ids).await;
    let prompt = format!("Archive {} {}?", ids.len(), pluralize("student", ids.len()));
    if !tui::confirm(prompt, ctx.assume_yes)? {
        return Ok(());
    }

    let mut outcome = StudentOutcome::default();
    let spinner = tui::create_spinner(format!("Archiving {} {}", ids.len(), pluralize("student", ids.len())));
    for &id in ids {
        match ctx.client.archive_student(id).await {
            Ok(()) => outcome.succeeded.push(id),
            Err(e) => {
                warn!(id, error = %e, "archive failed");
                outcome.failed.push((id, e));
            }
        }
    }
    spinner.finish_and_clear();

    apply_status(&mut students, &outcome.succeeded, EnrollmentStatus::Archived);
    print_outcome(&students, &outcome, EnrollmentStatus::Archived);
    finish(&outcome, ids.len())
}

/// Current summaries of the students about to change, for naming them in
/// the report. A failed lookup only costs the names.
async fn selected(ctx: &Context, ids: &[i64]) -> Vec<StudentAttendance> {
    match fetch_all(&ctx.client, &StudentFilter::default()).await {
        Ok(students) => students.into_iter().filter(|s| ids.contains(&s.student_id)).collect(),
        Err(e) => {
            warn!(error = %e, "could not look up students");
            Vec::new()
        }
    }
}

/// Rows are patched locally after the API accepted each change.
fn print_outcome(students: &[StudentAttendance], outcome: &StudentOutcome, status: EnrollmentStatus) {
    for id in &outcome.succeeded {
        match students.iter().find(|s| s.student_id == *id) {
            Some(student) => println!("   #{id} {} {}", student.full_name(), student.status.render()),
            None => println!("   #{id} {}", status.render()),
        }
    }
    for (id, err) in &outcome.failed {
        println!("   #{id}: {}", err.to_string().red());
    }
}

fn finish(outcome: &StudentOutcome, requested: usize) -> Result<()> {
    if !outcome.failed.is_empty() {
        bail!("{} of {} updates failed", outcome.failed.len(), requested);
    }
    Ok(())
}

async fn export(ctx: &Context, args: ExportArgs) -> Result<()> {
    let format = args.format.trim().to_lowercase();
    if !matches!(format.as_str(), "csv" | "xlsx" | "pdf") {
        bail!("Cannot export students as '{format}' (expected csv, xlsx or pdf)");
    }
    let filter = args.filter.to_filter();
    let output = args.output.unwrap_or_else(|| {
        PathBuf::from(format!("student-attendance-{}.{format}", ctx.today.format("%Y-%m-%d")))
    });

    let spinner = tui::create_spinner(format!("Exporting students as {format}"));
    let result = if format == "csv" {
        fetch_all(&ctx.client, &filter).await.map(|students| (students, None))
    } else {
        ctx.client
            .export_attendance(&format, &filter)
            .await
            .map(|bytes| (Vec::new(), Some(bytes)))
    };
    spinner.finish_and_clear();
    let (students, rendered) = result.context("Failed to export students")?;

    let bytes = match rendered {
        Some(bytes) => bytes,
        None => students_csv(&students)?.into_bytes(),
    };
    write_output(&output, &bytes)?;

    if output.as_os_str() != "-" {
        if format == "csv" {
            println!(
                "Exported {} {} to {}",
                students.len().to_string().green(),
                pluralize("student", students.len()),
                output.display()
            );
        } else {
            println!("Saved {}", output.display());
        }
    }
    Ok(())
}

/// Walk every server page at the largest page size.
pub async fn fetch_all(client: &Client, filter: &StudentFilter) -> Result<Vec<StudentAttendance>, ApiError> {
    let sort = StudentSort::default();
    let mut students = Vec::new();
    let mut request = PageRequest::new(1, MAX_PAGE_SIZE);

    loop {
        let page: Page<StudentAttendance> = client.list_students(filter, &sort, request).await?;
        let received = page.items.len();
        let more = page.has_next() && received > 0;
        students.extend(page.items);
        if !more {
            break;
        }
        request = PageRequest::new(request.page + 1, MAX_PAGE_SIZE);
    }

    Ok(students)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::commands::testing::context_for;

    fn student_json(id: i64, last: &str) -> serde_json::Value {
        json!({
            "studentId": id,
            "studentNumber": format!("2024-{id:04}"),
            "firstName": "Sam",
            "lastName": last,
            "department": "Nursing",
            "attendanceRate": 88.5,
            "riskLevel": "low"
        })
    }

    #[tokio::test]
    async fn list_survives_analytics_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/attendance/students"))
            .and(query_param("department", "Nursing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": [student_json(1, "Cruz")],
                "total": 1
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/attendance/analytics"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context_for(&server, "2024-03-15");
        let args = ListArgs {
            filter: StudentFilterArgs {
                department: Some("Nursing".into()),
                ..Default::default()
            },
            page: 1,
            ..Default::default()
        };
        list(&ctx, args).await.unwrap();
    }

    #[tokio::test]
    async fn status_update_reports_partial_failure() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path_regex(r"^/api/students/(1|3)/status$"))
            .and(body_partial_json(json!({"status": "inactive", "reason": "LOA"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/students/2/status"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let ctx = context_for(&server, "2024-03-15");
        let update = StatusUpdate {
            status: EnrollmentStatus::Inactive,
            reason: Some("LOA".into()),
        };
        let outcome = update_statuses(&ctx.client, &[1, 2, 3], &update).await;
        assert_eq!(outcome.succeeded, vec![1, 3]);
        assert_eq!(outcome.failed.len(), 1);
        assert!(matches!(outcome.failed[0], (2, ApiError::NotFound(_))));

        let err = set_status(&ctx, &[2], update).await.unwrap_err();
        assert!(err.to_string().contains("1 of 1"));
    }

    #[tokio::test]
    async fn archive_uses_soft_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/attendance/students"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [student_json(7, "Reyes"), student_json(8, "Santos")],
                "total": 2
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/students/7/soft-delete"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context_for(&server, "2024-03-15");
        archive(&ctx, &[7]).await.unwrap();
    }

    #[tokio::test]
    async fn csv_export_walks_every_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/attendance/students"))
            .and(query_param("page", "1"))
            .and(query_param("pageSize", MAX_PAGE_SIZE.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [student_json(1, "Cruz")],
                "total": MAX_PAGE_SIZE + 1,
                "pageSize": MAX_PAGE_SIZE
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/attendance/students"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [student_json(2, "Diaz")],
                "total": MAX_PAGE_SIZE + 1,
                "pageSize": MAX_PAGE_SIZE
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("students.csv");
        let ctx = context_for(&server, "2024-03-15");
        let args = ExportArgs {
            format: "csv".into(),
            output: Some(output.clone()),
            filter: StudentFilterArgs::default(),
        };
        export(&ctx, args).await.unwrap();

        let csv = std::fs::read_to_string(output).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains("Diaz"));
    }

    #[tokio::test]
    async fn spreadsheet_export_is_downloaded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/attendance/export"))
            .and(query_param("format", "xlsx"))
            .and(query_param("riskLevel", "high"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("students.xlsx");
        let ctx = context_for(&server, "2024-03-15");
        let args = ExportArgs {
            format: "XLSX".into(),
            output: Some(output.clone()),
            filter: StudentFilterArgs {
                risk_levels: vec![RiskLevel::High],
                ..Default::default()
            },
        };
        export(&ctx, args).await.unwrap();
        assert_eq!(std::fs::read(output).unwrap(), b"PK\x03\x04");
    }
}
