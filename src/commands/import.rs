use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, warn};

use campusdesk_core::import::{self, ImportFormat, ImportReport, ImportRow};

use super::Context;
use crate::client::Client;
use crate::utils::tui::{self, pluralize};

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// CSV or JSON file
    pub file: PathBuf,

    /// csv or json (defaults to the file extension)
    #[arg(long)]
    pub format: Option<String>,

    /// Validate every row without creating anything
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn run(ctx: &Context, args: ImportArgs) -> Result<()> {
    let format = match args.format.as_deref().map(str::to_lowercase).as_deref() {
        Some("csv") => ImportFormat::Csv,
        Some("json") => ImportFormat::Json,
        Some(other) => bail!("Cannot import '{other}' files (expected csv or json)"),
        None => ImportFormat::from_path(&args.file)?,
    };

    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let rows = import::parse(&content, format)?;

    if rows.is_empty() {
        println!("{}", "Nothing to import".dimmed());
        return Ok(());
    }

    let spinner = tui::create_spinner(format!("Importing {} {}", rows.len(), pluralize("row", rows.len())));
    let report = send_rows(&ctx.client, rows, args.dry_run).await;
    spinner.finish_and_clear();

    print_report(&report, args.dry_run);

    if !report.is_clean() {
        bail!("{} of {} rows failed", report.failed, report.total());
    }
    Ok(())
}

/// POST valid rows one at a time. Rows already created stay created when a
/// later row fails.
pub async fn send_rows(client: &Client, rows: Vec<ImportRow>, dry_run: bool) -> ImportReport {
    let mut report = ImportReport::default();

    for row in rows {
        let outcome = match row.result {
            Err(e) => Err(e),
            Ok(_) if dry_run => Ok(()),
            Ok(payload) => client
                .create_event(&payload)
                .await
                .map(|event| {
                    debug!(row = row.row, id = event.id, "imported");
                })
                .map_err(|e| {
                    warn!(row = row.row, title = %row.title, error = %e, "import row failed");
                    e.to_string()
                }),
        };
        report.record(row.row, outcome);
    }

    report
}

fn print_report(report: &ImportReport, dry_run: bool) {
    let verb = if dry_run { "valid" } else { "imported" };
    println!(
        "{} {} {}, {} failed",
        report.succeeded.to_string().green(),
        pluralize("row", report.succeeded),
        verb,
        report.failed.to_string().red()
    );
    for error in &report.errors {
        println!("   {}", error.red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::commands::testing::context_for;

    const CSV: &str = "\
Title,Start,End,All Day,Category
Orientation,2024-08-19T08:00:00,2024-08-19T12:00:00,false,academic
,2024-08-20,,true,
Foundation Day,2024-08-25,,true,special
";

    fn created(id: i64) -> ResponseTemplate {
        ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": {
                "id": id,
                "title": "x",
                "startDate": "2024-08-19T08:00:00",
                "endDate": "2024-08-19T12:00:00"
            }
        }))
    }

    #[tokio::test]
    async fn posts_valid_rows_sequentially_and_reports_each() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/events"))
            .and(body_partial_json(json!({"title": "Orientation"})))
            .respond_with(created(1))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/events"))
            .and(body_partial_json(json!({"title": "Foundation Day"})))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "db down"})))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context_for(&server, "2024-08-01");
        let rows = import::parse_csv(CSV).unwrap();
        let report = send_rows(&ctx.client, rows, false).await;

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 2);
        assert!(report.errors[0].starts_with("Row 3: "));
        assert!(report.errors[1].starts_with("Row 4: "));
        assert!(report.errors[1].contains("db down"));
    }

    #[tokio::test]
    async fn dry_run_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(created(1))
            .expect(0)
            .mount(&server)
            .await;

        let ctx = context_for(&server, "2024-08-01");
        let rows = import::parse_csv(CSV).unwrap();
        let report = send_rows(&ctx.client, rows, true).await;
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
    }
}
