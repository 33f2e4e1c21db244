pub mod analytics;
pub mod calendar;
pub mod config;
pub mod events;
pub mod export;
pub mod import;
pub mod settings;
pub mod students;
pub mod trends;
pub mod years;

use std::collections::HashSet;

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use clap::Args;

use campusdesk_core::config::CampusConfig;
use campusdesk_core::date_range::DateRange;
use campusdesk_core::event::{Category, EventStatus, Priority};
use campusdesk_core::filter::{DateBucket, EventFilter};
use campusdesk_core::settings::{CalendarSettings, FileSettingsStore, SettingsStore};

use crate::client::Client;

/// Everything a command needs: config, API client, persisted settings.
pub struct Context {
    pub config: CampusConfig,
    pub client: Client,
    pub store: Box<dyn SettingsStore + Send + Sync>,
    pub settings: CalendarSettings,
    pub today: NaiveDate,
    pub assume_yes: bool,
}

impl Context {
    pub fn load(assume_yes: bool) -> Result<Self> {
        let config = CampusConfig::load().context("Failed to load config")?;
        let store = FileSettingsStore::default_location()?;
        let today = chrono::Local::now().date_naive();
        let mut ctx = Self::new(config, Box::new(store), today)?;
        ctx.assume_yes = assume_yes;
        Ok(ctx)
    }

    pub fn new(config: CampusConfig, store: Box<dyn SettingsStore + Send + Sync>, today: NaiveDate) -> Result<Self> {
        let client = Client::new(&config)?;
        let settings = CalendarSettings::load(&*store).context("Failed to load calendar settings")?;
        tracing::debug!(api_url = %client.base_url(), %today, "context ready");

        Ok(Self {
            config,
            client,
            store,
            settings,
            today,
            assume_yes: false,
        })
    }

    pub fn store(&self) -> &dyn SettingsStore {
        &*self.store
    }
}

/// Event filter flags shared by the calendar and event list commands.
#[derive(Args, Debug, Clone, Default)]
pub struct EventFilterArgs {
    /// Search title, description, location and tags
    #[arg(short = 'q', long)]
    pub search: Option<String>,

    /// Only these categories (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<Category>,

    /// Only these priorities (repeatable)
    #[arg(long = "priority")]
    pub priorities: Vec<Priority>,

    /// Only these statuses (repeatable)
    #[arg(long = "status")]
    pub statuses: Vec<EventStatus>,

    /// all, today, this-week, this-month, upcoming or past
    #[arg(long = "when", default_value = "all")]
    pub date_bucket: DateBucket,
}

impl EventFilterArgs {
    pub fn to_filter(&self, settings: &CalendarSettings) -> EventFilter {
        EventFilter {
            search: self.search.clone(),
            categories: self.categories.iter().copied().collect::<HashSet<_>>(),
            priorities: self.priorities.iter().copied().collect(),
            statuses: self.statuses.iter().copied().collect(),
            date_bucket: self.date_bucket,
            week_start: settings.week_start,
        }
    }
}

/// `--from`/`--to` day bounds.
#[derive(Args, Debug, Clone, Default)]
pub struct RangeArgs {
    /// From this date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Until this date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,
}

impl RangeArgs {
    pub fn to_range(&self) -> Result<DateRange> {
        Ok(DateRange::from_args(self.from.as_deref(), self.to.as_deref())?)
    }
}
