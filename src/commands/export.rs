use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use owo_colors::OwoColorize;

use campusdesk_core::export::{default_file_name, export_events, ExportFormat};
use campusdesk_core::filter::EventSort;

use super::{Context, EventFilterArgs, RangeArgs};

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// csv, ical or json
    #[arg(long, default_value = "csv")]
    pub format: String,

    /// Output file, or "-" for stdout (defaults to academic-calendar-<date>.<ext>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub filter: EventFilterArgs,

    #[command(flatten)]
    pub range: RangeArgs,
}

pub async fn run(ctx: &Context, args: ExportArgs) -> Result<()> {
    let format: ExportFormat = args.format.parse()?;
    let range = args.range.to_range()?;

    let events = super::events::fetch_events(ctx, &range).await?;
    let mut events = args.filter.to_filter(&ctx.settings).apply(&events, ctx.today);
    EventSort::default().sort(&mut events);

    let content = export_events(&events, format)?;
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(default_file_name("academic-calendar", format, ctx.today)));

    write_output(&output, content.as_bytes())?;
    if output != Path::new("-") {
        println!(
            "Exported {} events to {}",
            events.len().to_string().green(),
            output.display()
        );
    }
    Ok(())
}

/// Write to a file, or stdout for "-".
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if path == Path::new("-") {
        std::io::stdout().write_all(bytes)?;
        return Ok(());
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::commands::testing::context_for;

    #[tokio::test]
    async fn writes_filtered_ical_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "title": "Holy Week", "startDate": "2024-03-25", "endDate": "2024-03-30", "allDay": true, "category": "holiday"},
                {"id": 2, "title": "Midterms", "startDate": "2024-03-11T08:00:00", "endDate": "2024-03-11T12:00:00", "category": "academic"}
            ])))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("holidays.ics");
        let ctx = context_for(&server, "2024-03-01");
        let args = ExportArgs {
            format: "ical".into(),
            output: Some(output.clone()),
            filter: EventFilterArgs {
                categories: vec![campusdesk_core::event::Category::Holiday],
                ..Default::default()
            },
            range: RangeArgs::default(),
        };
        run(&ctx, args).await.unwrap();

        let ics = std::fs::read_to_string(output).unwrap();
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 1);
        assert!(ics.contains("SUMMARY:Holy Week"));
    }

    #[tokio::test]
    async fn spreadsheet_format_is_rejected_before_fetching() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let ctx = context_for(&server, "2024-03-01");
        let args = ExportArgs {
            format: "xlsx".into(),
            output: None,
            filter: EventFilterArgs::default(),
            range: RangeArgs::default(),
        };
        let err = run(&ctx, args).await.unwrap_err();
        assert!(err.to_string().contains("xlsx"));
    }
}
