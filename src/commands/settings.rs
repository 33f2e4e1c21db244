use anyhow::{Context as _, Result};
use clap::Subcommand;
use owo_colors::OwoColorize;
use tracing::info;

use campusdesk_core::settings::{CalendarSettings, CALENDAR_SETTINGS_KEY};

use super::Context;

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// Print the saved calendar settings
    Show,
    /// Change one setting, e.g. `set week-start monday`
    Set { name: String, value: String },
    /// Forget all saved settings
    Reset,
}

pub fn run(ctx: &Context, command: SettingsCommand) -> Result<()> {
    match command {
        SettingsCommand::Show => {
            println!("{}", render_settings(&ctx.settings));
            Ok(())
        }
        SettingsCommand::Set { name, value } => {
            let mut settings = ctx.settings.clone();
            settings.set(&name, &value)?;
            settings.save(ctx.store()).context("Failed to save settings")?;
            info!(%name, %value, "setting changed");
            println!("{}", render_settings(&settings));
            Ok(())
        }
        SettingsCommand::Reset => {
            ctx.store()
                .remove(CALENDAR_SETTINGS_KEY)
                .context("Failed to reset settings")?;
            println!("{}", render_settings(&CalendarSettings::default()));
            Ok(())
        }
    }
}

fn render_settings(settings: &CalendarSettings) -> String {
    let rows = [
        ("default-view", settings.default_view.to_string()),
        ("week-start", format!("{:?}", settings.week_start).to_lowercase()),
        ("show-weekends", settings.show_weekends.to_string()),
        ("page-size", settings.page_size.to_string()),
        ("default-category", settings.default_category.to_string()),
        ("default-priority", settings.default_priority.to_string()),
        ("use-24-hour-time", settings.use_24_hour_time.to_string()),
    ];
    rows.iter()
        .map(|(name, value)| format!("  {:<18} {}", name.dimmed().to_string(), value))
        .collect::<Vec<_>>()
        .join("\n")
}
