mod client;
mod commands;
mod render;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use commands::analytics::AnalyticsArgs;
use commands::calendar::CalendarArgs;
use commands::config::ConfigCommand;
use commands::events::EventsCommand;
use commands::settings::SettingsCommand;
use commands::students::StudentsCommand;
use commands::trends::TrendsArgs;
use commands::Context;

#[derive(Parser)]
#[command(name = "campusdesk")]
#[command(about = "Academic calendar, attendance trends and student attendance from the school API")]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Answer yes to confirmation prompts
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Month, week, day or timeline view of the academic calendar
    Calendar(CalendarArgs),
    /// List, create, edit, delete, import and export events
    Events {
        #[command(subcommand)]
        command: EventsCommand,
    },
    /// Academic years and their semesters
    Years,
    /// Daily attendance trends per class
    Trends(TrendsArgs),
    /// Student attendance summaries and enrollment status
    Students {
        #[command(subcommand)]
        command: StudentsCommand,
    },
    /// Attendance analytics with staged filters and drill-down
    Analytics(AnalyticsArgs),
    /// Saved calendar preferences
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Config file management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = dispatch(cli).await {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let yes = cli.yes;
    let load = || Context::load(yes);

    match cli.command {
        // Works with a broken or missing config file.
        Commands::Config { command } => commands::config::run(command),
        Commands::Calendar(args) => commands::calendar::run(&load()?, args).await,
        Commands::Events { command } => commands::events::run(&load()?, command).await,
        Commands::Years => commands::years::run(&load()?).await,
        Commands::Trends(args) => commands::trends::run(&load()?, args).await,
        Commands::Students { command } => commands::students::run(&load()?, command).await,
        Commands::Analytics(args) => commands::analytics::run(&load()?, args).await,
        Commands::Settings { command } => commands::settings::run(&load()?, command),
    }
}

/// Logs go to stderr so they never mix with rendered output. `RUST_LOG`
/// wins over `--verbose`.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
