use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::warn;

use campusdesk_core::academic::{attach_semesters, AcademicYear, Semester};
use campusdesk_core::date_range::{parse_day, DateRange};
use campusdesk_core::paginate::{paginate, PageRequest};
use campusdesk_core::view::{self, day_columns, month_grid, timeline, timeline_by_month, visible_days, ViewMode};

use super::{Context, EventFilterArgs};
use crate::render::{self, render_page_footer};
use crate::utils::tui;

#[derive(Args, Debug, Clone, Default)]
pub struct CalendarArgs {
    /// month, week, day or timeline (defaults to the saved view)
    #[arg(long)]
    pub view: Option<ViewMode>,

    /// Reference date (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub date: Option<String>,

    /// Step forward this many views
    #[arg(long, default_value_t = 0, conflicts_with = "prev")]
    pub next: u32,

    /// Step back this many views
    #[arg(long, default_value_t = 0)]
    pub prev: u32,

    /// Timeline page
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    #[command(flatten)]
    pub filter: EventFilterArgs,
}

pub async fn run(ctx: &Context, args: CalendarArgs) -> Result<()> {
    let mode = args.view.unwrap_or(ctx.settings.default_view);
    let base = match &args.date {
        Some(date) => parse_day(date)?,
        None => ctx.today,
    };
    let steps = args.next as i32 - args.prev as i32;
    let reference = view::navigate(base, mode, steps);

    let (first, last) = view::visible_range(reference, mode, ctx.settings.week_start);
    let range = DateRange::new(first, last);

    let spinner = tui::create_spinner(format!("Loading {} view", mode));
    let (years, semesters, events) = tokio::join!(
        ctx.client.list_academic_years(),
        ctx.client.list_semesters(None),
        ctx.client.list_events(&range),
    );
    spinner.finish_and_clear();

    let events = events.context("Failed to load events")?;
    let events: Vec<_> = events.into_iter().filter(|e| e.overlaps(first, last)).collect();
    let events = args.filter.to_filter(&ctx.settings).apply(&events, ctx.today);

    if let Some(header) = term_header(years, semesters, reference) {
        println!("{}\n", header);
    }

    let output = match mode {
        ViewMode::Month => {
            let grid = month_grid(&events, reference, ctx.settings.week_start);
            render::render_month(&grid, ctx.today, &ctx.settings)
        }
        ViewMode::Week | ViewMode::Day => {
            let days = visible_days(reference, mode, ctx.settings.week_start);
            render::render_week(&day_columns(&events, &days), ctx.today, &ctx.settings)
        }
        ViewMode::Timeline => {
            let sorted: Vec<_> = timeline(&events).into_iter().cloned().collect();
            let page = paginate(&sorted, PageRequest::new(args.page, ctx.settings.page_size));
            let groups = timeline_by_month(&page.items);
            format!(
                "{}\n\n{}",
                render::render_timeline(&groups, ctx.settings.use_24_hour_time),
                render_page_footer(&page)
            )
        }
    };

    println!("{output}");
    Ok(())
}

/// "2024-2025 · First Semester" for the reference date. Reference data is
/// optional: failures are logged and the header is skipped.
fn term_header(
    years: Result<Vec<AcademicYear>, crate::client::ApiError>,
    semesters: Result<Vec<Semester>, crate::client::ApiError>,
    reference: NaiveDate,
) -> Option<String> {
    let mut years = years
        .inspect_err(|e| warn!(error = %e, "could not load academic years"))
        .ok()?;
    match semesters {
        Ok(semesters) => attach_semesters(&mut years, semesters),
        Err(e) => warn!(error = %e, "could not load semesters"),
    }

    let year = years.iter().find(|y| y.contains(reference))?;
    let semester = year.semesters.iter().find(|s| s.contains(reference));
    Some(match semester {
        Some(semester) => format!("{} · {}", year.name.bold(), semester.name),
        None => year.name.bold().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::commands::testing::context_for;

    #[tokio::test]
    async fn fetches_visible_month_and_reference_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .and(query_param("from", "2024-02-25"))
            .and(query_param("to", "2024-04-06"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/academic-years"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/semesters"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context_for(&server, "2024-03-15");
        let args = CalendarArgs {
            view: Some(ViewMode::Month),
            ..Default::default()
        };
        run(&ctx, args).await.unwrap();
    }

    #[tokio::test]
    async fn event_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let ctx = context_for(&server, "2024-03-15");
        let err = run(&ctx, CalendarArgs::default()).await.unwrap_err();
        assert!(format!("{err:#}").contains("permission"));
    }

    #[test]
    fn header_names_year_and_semester() {
        let years: Vec<AcademicYear> = serde_json::from_value(json!([
            {"id": 1, "name": "2023-2024", "startDate": "2023-08-01", "endDate": "2024-05-31"}
        ]))
        .unwrap();
        let semesters: Vec<Semester> = serde_json::from_value(json!([
            {"id": 7, "academicYearId": 1, "name": "Second Semester", "startDate": "2024-01-08", "endDate": "2024-05-31"}
        ]))
        .unwrap();
        let header = term_header(Ok(years), Ok(semesters), parse_day("2024-03-15").unwrap()).unwrap();
        assert!(header.contains("2023-2024"));
        assert!(header.contains("Second Semester"));
    }
}
