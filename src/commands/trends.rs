use anyhow::{Context as _, Result};
use clap::Args;
use owo_colors::OwoColorize;

use campusdesk_core::paginate::{paginate, PageRequest};
use campusdesk_core::trends::{class_codes, daily_series, TrendFilter, TrendRow};

use super::{Context, RangeArgs};
use crate::render;
use crate::utils::tui;

#[derive(Args, Debug, Clone, Default)]
pub struct TrendsArgs {
    /// Only this class code
    #[arg(short, long)]
    pub class: Option<String>,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Table page
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Defaults to the saved page size
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Only list the class codes present in the data
    #[arg(long)]
    pub classes: bool,
}

pub async fn run(ctx: &Context, args: TrendsArgs) -> Result<()> {
    let filter = TrendFilter {
        class_code: args.class.clone(),
        range: args.range.to_range()?,
    };

    let spinner = tui::create_spinner("Loading attendance trends".to_string());
    let result = ctx.client.trends(filter.class_code.as_deref(), &filter.range).await;
    spinner.finish_and_clear();
    let rows = result.context("Failed to load attendance trends")?;

    if args.classes {
        let codes = class_codes(&rows);
        if codes.is_empty() {
            println!("{}", "No classes found".dimmed());
        }
        for code in codes {
            println!("{code}");
        }
        return Ok(());
    }

    println!("{}", render_trends(&rows, &filter, args.page, args.page_size.unwrap_or(ctx.settings.page_size)));
    Ok(())
}

/// Chart over every matching row, table over one page of them.
fn render_trends(rows: &[TrendRow], filter: &TrendFilter, page: usize, page_size: usize) -> String {
    let matching = filter.apply(rows);
    let chart = render::render_trend_chart(&daily_series(matching.iter().copied()));
    let page = paginate(&matching, PageRequest::new(page, page_size));
    format!("{chart}\n\n{}", render::render_trend_table(&page))
}
