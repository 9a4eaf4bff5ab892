pub mod app;
pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::app::App;
use crate::core::config::AppConfig;
use crate::core::market::Market;
use crate::core::sort::SortColumn;
use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

pub enum AppCommand {
    Price {
        market: Market,
        symbol: String,
        weight_grams: Option<f64>,
    },
    Add {
        market: Market,
        symbol: String,
        amount: f64,
    },
    Value,
    List {
        sort: Option<SortColumn>,
    },
    Remove {
        index: usize,
    },
    Clear,
    Calculate {
        path: PathBuf,
    },
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>, json: bool) -> Result<()> {
    info!("folio starting...");
    let config = load_config(config_path)?;
    let app = App::from_config(&config)?;
    execute(&app, command, json).await
}

/// Runs one command against an already built application.
pub async fn execute(app: &App, command: AppCommand, json: bool) -> Result<()> {
    match command {
        AppCommand::Price {
            market,
            symbol,
            weight_grams,
        } => cli::price::run(app, market, &symbol, weight_grams, json).await,
        AppCommand::Add {
            market,
            symbol,
            amount,
        } => cli::add::run(app, market, &symbol, amount, json).await,
        AppCommand::Value => cli::portfolio::value(app, json).await,
        AppCommand::List { sort } => cli::portfolio::list(app, sort, json).await,
        AppCommand::Remove { index } => cli::portfolio::remove(app, index, json).await,
        AppCommand::Clear => cli::portfolio::clear(app, json).await,
        AppCommand::Calculate { path } => cli::calculate::run(app, &path, json).await,
    }
}
