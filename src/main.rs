use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use folio::core::error::PortfolioError;
use folio::core::log::init_logging;
use folio::core::market::Market;
use folio::core::sort::SortColumn;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Print results and errors as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Look up the current price of a symbol
    Price {
        /// us, ca, hk, tw, cn-shanghai, cn-shenzhen, crypto or metal
        market: Market,
        symbol: String,
        /// Weight to value, for metals
        #[arg(long)]
        weight_grams: Option<f64>,
    },
    /// Add a holding, merging with an existing one of the same symbol
    Add {
        market: Market,
        /// Ticker, metal name, or currency code for cash
        symbol: String,
        /// Quantity, grams for metals, or the cash balance
        amount: f64,
    },
    /// Value the portfolio in USD and the other supported currencies
    Value,
    /// List holdings
    List {
        /// symbol, market, quantity, price or value; repeating flips direction
        #[arg(long)]
        sort: Option<SortColumn>,
    },
    /// Remove the holding at a listed index
    Remove { index: usize },
    /// Remove every holding
    Clear,
    /// Value holdings read from a JSON file without storing them
    Calculate { path: PathBuf },
}

impl From<Commands> for folio::AppCommand {
    fn from(cmd: Commands) -> folio::AppCommand {
        match cmd {
            Commands::Price {
                market,
                symbol,
                weight_grams,
            } => folio::AppCommand::Price {
                market,
                symbol,
                weight_grams,
            },
            Commands::Add {
                market,
                symbol,
                amount,
            } => folio::AppCommand::Add {
                market,
                symbol,
                amount,
            },
            Commands::Value => folio::AppCommand::Value,
            Commands::List { sort } => folio::AppCommand::List { sort },
            Commands::Remove { index } => folio::AppCommand::Remove { index },
            Commands::Clear => folio::AppCommand::Clear,
            Commands::Calculate { path } => folio::AppCommand::Calculate { path },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => folio::cli::setup::setup(),
        Some(cmd) => folio::run_command(cmd.into(), cli.config_path.as_deref(), cli.json).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!(error = %e, "Application failed");
            report_error(&e, cli.json);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn report_error(error: &anyhow::Error, json: bool) {
    let message = match error.downcast_ref::<PortfolioError>() {
        Some(domain) => domain.to_string(),
        None => format!("{error:#}"),
    };
    if json {
        println!("{}", serde_json::json!({ "error": message }));
    } else {
        eprintln!("Error: {message}");
    }
}
