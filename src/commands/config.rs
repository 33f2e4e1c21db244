use std::path::Path;

use anyhow::{bail, Context as _, Result};
use clap::Subcommand;
use owo_colors::OwoColorize;

use campusdesk_core::config::{CampusConfig, API_URL_ENV};

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Write a commented default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config (file plus environment)
    Show,
    /// Print where the config and settings live
    Path,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    let path = CampusConfig::config_path()?;
    match command {
        ConfigCommand::Init { force } => init(&path, force),
        ConfigCommand::Show => show(),
        ConfigCommand::Path => {
            println!("{}", "Paths".bold());
            println!("  Config:    {}", path.display());
            println!("  Settings:  {}", CampusConfig::config_dir()?.display());
            Ok(())
        }
    }
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    CampusConfig::create_default_config(path)?;
    println!("{} Wrote {}", "✓".green(), path.display());
    Ok(())
}

fn show() -> Result<()> {
    let config = CampusConfig::load().context("Failed to load config")?;
    println!("{}", render_config(&config)?);
    if std::env::var_os(API_URL_ENV).is_some() {
        println!("{}", format!("# api_url from {API_URL_ENV}").dimmed());
    }
    Ok(())
}

fn render_config(config: &CampusConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}
