use anyhow::{anyhow, bail, Context as _, Result};
use clap::{Args, Subcommand};
use dialoguer::Input;
use owo_colors::OwoColorize;
use tracing::{info, warn};

use campusdesk_core::event::{apply_bulk, AcademicEvent, BulkAction, Category, EventDraft, EventStatus, Priority};
use campusdesk_core::filter::{EventSort, EventSortField, SortDirection};
use campusdesk_core::paginate::{paginate, PageRequest};
use campusdesk_core::timestamp::parse_timestamp;

use super::{Context, EventFilterArgs, RangeArgs};
use crate::client::{ApiError, Client};
use crate::render::{self, Render};
use crate::utils::tui::{self, pluralize};

#[derive(Subcommand, Debug)]
pub enum EventsCommand {
    /// List events with filters, sorting and pagination
    List(ListArgs),
    /// Show one event
    Show { id: i64 },
    /// Create an event (prompts for missing title/start)
    New(EventFields),
    /// Change fields of an existing event
    Edit {
        id: i64,
        #[command(flatten)]
        fields: EventFields,
    },
    /// Delete events
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Publish, unpublish, cancel or delete several events at once
    Bulk {
        /// publish, unpublish, cancel or delete
        action: BulkAction,
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Import events from a CSV or JSON file
    Import(super::import::ImportArgs),
    /// Export the filtered event list
    Export(super::export::ExportArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: EventFilterArgs,

    #[command(flatten)]
    pub range: RangeArgs,

    /// title, start, priority, category or status
    #[arg(long, default_value = "start")]
    pub sort: EventSortField,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Defaults to the saved page size
    #[arg(long)]
    pub page_size: Option<usize>,
}

/// Event fields accepted by `new` and `edit`. Unset fields keep their
/// current (or default) value.
#[derive(Args, Debug, Clone, Default)]
pub struct EventFields {
    #[arg(long)]
    pub title: Option<String>,

    /// Start (e.g. "2024-03-20" or "2024-03-20T15:00")
    #[arg(short, long)]
    pub start: Option<String>,

    #[arg(short, long)]
    pub end: Option<String>,

    #[arg(long)]
    pub all_day: Option<bool>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(short, long)]
    pub location: Option<String>,

    #[arg(long)]
    pub category: Option<Category>,

    #[arg(long)]
    pub priority: Option<Priority>,

    #[arg(long)]
    pub status: Option<EventStatus>,

    /// Comma-separated tags
    #[arg(long, value_delimiter = ',')]
    pub tags: Option<Vec<String>>,

    #[arg(long)]
    pub color: Option<String>,

    #[arg(long)]
    pub academic_year: Option<i64>,

    #[arg(long)]
    pub semester: Option<i64>,
}

impl EventFields {
    /// Overlay the given fields onto a draft.
    pub fn apply_to(self, draft: &mut EventDraft) -> Result<()> {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(start) = self.start {
            draft.start = Some(parse_when(&start)?);
        }
        if let Some(all_day) = self.all_day {
            draft.all_day = all_day;
        }
        if let Some(end) = self.end {
            let parsed = parse_when(&end)?;
            // A bare date names the last day of an all-day event; the stored
            // end is exclusive.
            draft.end = Some(if draft.all_day && is_date_only(&end) {
                parsed + chrono::Duration::days(1)
            } else {
                parsed
            });
        }
        if let Some(description) = self.description {
            draft.description = Some(description);
        }
        if let Some(location) = self.location {
            draft.location = Some(location);
        }
        if let Some(category) = self.category {
            draft.category = category;
        }
        if let Some(priority) = self.priority {
            draft.priority = priority;
        }
        if let Some(status) = self.status {
            draft.status = status;
        }
        if let Some(tags) = self.tags {
            draft.tags = tags.into_iter().map(|t| t.trim().to_string()).collect();
        }
        if let Some(color) = self.color {
            draft.color = Some(color);
        }
        if let Some(id) = self.academic_year {
            draft.academic_year_id = Some(id);
        }
        if let Some(id) = self.semester {
            draft.semester_id = Some(id);
        }
        Ok(())
    }
}

fn is_date_only(input: &str) -> bool {
    chrono::NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").is_ok()
}

fn parse_when(input: &str) -> Result<chrono::NaiveDateTime> {
    parse_timestamp(input).ok_or_else(|| anyhow!("Invalid date/time '{}'. Expected YYYY-MM-DD or YYYY-MM-DDTHH:MM", input))
}

pub async fn run(ctx: &Context, command: EventsCommand) -> Result<()> {
    match command {
        EventsCommand::List(args) => list(ctx, args).await,
        EventsCommand::Show { id } => show(ctx, id).await,
        EventsCommand::New(fields) => create(ctx, fields).await,
        EventsCommand::Edit { id, fields } => edit(ctx, id, fields).await,
        EventsCommand::Delete { ids } => delete(ctx, &ids).await,
        EventsCommand::Bulk { action, ids } => bulk(ctx, action, &ids).await,
        EventsCommand::Import(args) => super::import::run(ctx, args).await,
        EventsCommand::Export(args) => super::export::run(ctx, args).await,
    }
}

/// Fetch events for a range with a spinner.
pub async fn fetch_events(ctx: &Context, range: &campusdesk_core::date_range::DateRange) -> Result<Vec<AcademicEvent>> {
    let spinner = tui::create_spinner("Loading events".to_string());
    let result = ctx.client.list_events(range).await;
    spinner.finish_and_clear();
    result.context("Failed to load events")
}

async fn find_event(ctx: &Context, id: i64) -> Result<AcademicEvent> {
    fetch_events(ctx, &Default::default())
        .await?
        .into_iter()
        .find(|e| e.id == id)
        .ok_or_else(|| anyhow!("Event #{id} not found"))
}

async fn list(ctx: &Context, args: ListArgs) -> Result<()> {
    let range = args.range.to_range()?;
    let events = fetch_events(ctx, &range).await?;

    let mut filtered = args.filter.to_filter(&ctx.settings).apply(&events, ctx.today);
    let sort = EventSort {
        field: args.sort,
        direction: if args.desc { SortDirection::Desc } else { SortDirection::Asc },
    };
    sort.sort(&mut filtered);

    let page_size = args.page_size.unwrap_or(ctx.settings.page_size);
    let page = paginate(&filtered, PageRequest::new(args.page, page_size));
    println!("{}", render::render_event_table(&page, ctx.settings.use_24_hour_time));
    Ok(())
}

async fn show(ctx: &Context, id: i64) -> Result<()> {
    let event = find_event(ctx, id).await?;
    println!("{}", render::render_event_detail(&event, ctx.settings.use_24_hour_time));
    Ok(())
}

async fn create(ctx: &Context, mut fields: EventFields) -> Result<()> {
    let interactive = fields.title.is_none() || fields.start.is_none();

    if fields.title.is_none() {
        fields.title = Some(Input::<String>::new().with_prompt("  Title").interact_text()?);
    }
    if fields.start.is_none() {
        fields.start = Some(prompt_with_retry("  When? (YYYY-MM-DD or YYYY-MM-DDTHH:MM)")?);
    }
    if interactive && fields.location.is_none() {
        let location: String = Input::new()
            .with_prompt("  Where? (skip)")
            .default(String::new())
            .show_default(false)
            .interact_text()?;
        fields.location = Some(location);
    }

    let start_is_date_only = fields.start.as_deref().is_some_and(is_date_only);
    let mut draft = EventDraft {
        category: ctx.settings.default_category,
        priority: ctx.settings.default_priority,
        all_day: start_is_date_only,
        ..Default::default()
    };
    fields.apply_to(&mut draft)?;
    let payload = draft.into_payload()?;

    let spinner = tui::create_spinner("Creating event".to_string());
    let result = ctx.client.create_event(&payload).await;
    spinner.finish_and_clear();
    let event = result.context("Failed to create event")?;

    info!(id = event.id, "event created");
    if interactive {
        println!();
    }
    println!("{} {}", "Created".green(), render::render_event_detail(&event, ctx.settings.use_24_hour_time));
    Ok(())
}

fn prompt_with_retry(prompt: &str) -> Result<String> {
    loop {
        let input: String = Input::new().with_prompt(prompt).interact_text()?;
        if parse_timestamp(&input).is_some() {
            return Ok(input);
        }
        println!("  {}", "Could not read that date, try again".red());
    }
}

async fn edit(ctx: &Context, id: i64, fields: EventFields) -> Result<()> {
    let event = find_event(ctx, id).await?;
    let mut draft = event.to_draft();
    fields.apply_to(&mut draft)?;
    let payload = draft.into_payload()?;

    let spinner = tui::create_spinner(format!("Saving {}", event.title));
    let result = ctx.client.update_event(id, &payload).await;
    spinner.finish_and_clear();
    let updated = result.context("Failed to update event")?;

    println!("{} {}", "Updated".green(), render::render_event_detail(&updated, ctx.settings.use_24_hour_time));
    Ok(())
}

async fn delete(ctx: &Context, ids: &[i64]) -> Result<()> {
    let prompt = format!("Delete {} {}?", ids.len(), pluralize("event", ids.len()));
    if !tui::confirm(prompt, ctx.assume_yes)? {
        return Ok(());
    }

    let mut failed = 0;
    for &id in ids {
        match ctx.client.delete_event(id).await {
            Ok(()) => println!("{} #{id}", "Deleted".red()),
            Err(e) => {
                failed += 1;
                println!("   #{id}: {}", e.to_string().red());
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} deletions failed", ids.len());
    }
    Ok(())
}

/// Outcome of a bulk action: ids the API accepted and per-id failures.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub succeeded: Vec<i64>,
    pub failed: Vec<(i64, ApiError)>,
}

/// Send one request per selected event, then patch the local list for the
/// ids that succeeded.
pub async fn apply_bulk_remote(
    client: &Client,
    events: &mut Vec<AcademicEvent>,
    ids: &[i64],
    action: BulkAction,
) -> BulkOutcome {
    let mut outcome = BulkOutcome::default();

    for &id in ids {
        let result = match (action.target_status(), events.iter().find(|e| e.id == id)) {
            (_, None) => Err(ApiError::NotFound(format!("event #{id}"))),
            (Some(status), Some(event)) => client.set_event_status(event, status).await.map(|_| ()),
            (None, Some(_)) => client.delete_event(id).await,
        };
        match result {
            Ok(()) => outcome.succeeded.push(id),
            Err(e) => {
                warn!(id, error = %e, ?action, "bulk action failed");
                outcome.failed.push((id, e));
            }
        }
    }

    apply_bulk(events, &outcome.succeeded, action);
    outcome
}

async fn bulk(ctx: &Context, action: BulkAction, ids: &[i64]) -> Result<()> {
    if action == BulkAction::Delete {
        let prompt = format!("Delete {} {}?", ids.len(), pluralize("event", ids.len()));
        if !tui::confirm(prompt, ctx.assume_yes)? {
            return Ok(());
        }
    }

    let mut events = fetch_events(ctx, &Default::default()).await?;
    let spinner = tui::create_spinner(format!("Updating {} {}", ids.len(), pluralize("event", ids.len())));
    let outcome = apply_bulk_remote(&ctx.client, &mut events, ids, action).await;
    spinner.finish_and_clear();

    for (id, err) in &outcome.failed {
        println!("   #{id}: {}", err.to_string().red());
    }

    match action.target_status() {
        Some(status) => {
            for id in &outcome.succeeded {
                if let Some(event) = events.iter().find(|e| e.id == *id) {
                    println!("   {} {}", status.render(), event.title);
                }
            }
        }
        None => println!("   Deleted {} {}", outcome.succeeded.len(), pluralize("event", outcome.succeeded.len())),
    }

    if !outcome.failed.is_empty() {
        bail!("{} of {} updates failed", outcome.failed.len(), ids.len());
    }
    Ok(())
}
