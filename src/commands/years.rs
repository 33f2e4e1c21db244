use anyhow::{Context as _, Result};
use tracing::warn;

use campusdesk_core::academic::attach_semesters;

use super::Context;
use crate::render;
use crate::utils::tui;

/// Academic years with their semesters, current ones marked.
pub async fn run(ctx: &Context) -> Result<()> {
    let spinner = tui::create_spinner("Loading academic years".to_string());
    let (years, semesters) = tokio::join!(ctx.client.list_academic_years(), ctx.client.list_semesters(None));
    spinner.finish_and_clear();

    let mut years = years.context("Failed to load academic years")?;
    match semesters {
        Ok(semesters) => attach_semesters(&mut years, semesters),
        Err(e) => warn!(error = %e, "could not load semesters"),
    }
    years.sort_by_key(|y| y.start_date);

    println!("{}", render::render_academic_years(&years, ctx.today));
    Ok(())
}
