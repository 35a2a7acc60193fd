mod api;
mod config;
mod pages;
mod types;

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use pages::dashboard::ConfigPatch;
use pages::Page;
use types::{
    BacktestRequest, Exchange, FiveMinBacktestRequest, HistoricalDataRequest, Interval, TimeOfDay,
    NIFTY_50_TOKEN,
};

#[derive(Parser)]
#[command(name = "algo-admin")]
#[command(version = "0.1.0")]
#[command(about = "Admin console for the breakout trading API server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file path
    #[arg(short, long, default_value = "algo-admin.toml")]
    config: PathBuf,

    /// Host the dashboard is served from; `localhost` selects the local API server
    #[arg(long, env = "ALGO_ADMIN_HOST", default_value = "localhost")]
    host: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the API server and show strategy status
    Status,
    /// Show or edit the breakout strategy configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Start the strategy
    Start {
        #[arg(short, long, default_value = "NFO")]
        exchange: Exchange,
    },
    /// Stop the strategy
    Stop {
        #[arg(short, long, default_value = "NFO")]
        exchange: Exchange,
    },
    /// Show trade history
    Trades,
    /// Look up instruments
    Symbols {
        #[command(subcommand)]
        action: SymbolAction,
    },
    /// Backtest the breakout strategy
    Backtest(BacktestArgs),
    /// Backtest the 5-minute breakout strategy
    #[command(name = "backtest-5min")]
    Backtest5Min(FiveMinArgs),
    /// Fetch historical candles
    Historical {
        /// Instrument token
        #[arg(short, long, default_value_t = NIFTY_50_TOKEN)]
        instrument: u64,
        /// Start date (YYYY-MM-DD)
        #[arg(short, long)]
        start: NaiveDate,
        /// End date (YYYY-MM-DD), defaults to the start date
        #[arg(short, long)]
        end: Option<NaiveDate>,
        /// minute, 3minute, 5minute, 10minute, 15minute, 30minute, 60minute or day
        #[arg(long, default_value = "day")]
        interval: Interval,
        /// Show generated sample candles if the request fails
        #[arg(long)]
        sample_fallback: bool,
    },
    /// Follow live strategy updates
    Watch,
    /// Log in to the API server
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ALGO_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Kite Connect access token flow
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Print the effective settings
    Settings,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the configuration the server holds
    Show,
    /// Update selected fields; the rest keep their current value
    Set(ConfigArgs),
    /// Switch the exchange the strategy trades on
    Exchange { exchange: Exchange },
}

#[derive(Args)]
struct ConfigArgs {
    /// End of the range observation window (HH:MM)
    #[arg(long)]
    x_time: Option<TimeOfDay>,
    /// Square-off time (HH:MM)
    #[arg(long)]
    y_time: Option<TimeOfDay>,
    /// Entry window opens (HH:MM)
    #[arg(long)]
    entry_time: Option<TimeOfDay>,
    #[arg(long)]
    stop_loss: Option<Decimal>,
    #[arg(long)]
    target: Option<Decimal>,
    #[arg(long)]
    lot_size: Option<u32>,
}

#[derive(Subcommand)]
enum SymbolAction {
    /// Search by name or trading symbol
    Search {
        query: String,
        #[arg(short, long, default_value = "NFO")]
        exchange: Exchange,
    },
    /// Look up one instrument by token
    Get {
        #[arg(default_value_t = NIFTY_50_TOKEN)]
        instrument_token: u64,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Print the Kite login URL
    Url {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        redirect_url: Option<String>,
    },
    /// Exchange a request token (or the redirect URL carrying it) for an access token
    Exchange { redirect_or_token: String },
}

#[derive(Args)]
struct BacktestArgs {
    /// Start date (YYYY-MM-DD)
    #[arg(short, long)]
    start: NaiveDate,
    /// End date (YYYY-MM-DD), defaults to the start date
    #[arg(short, long)]
    end: Option<NaiveDate>,
    /// Instrument token
    #[arg(short, long, default_value_t = NIFTY_50_TOKEN)]
    instrument: u64,
    #[arg(long, default_value = "11:00")]
    x_time: TimeOfDay,
    #[arg(long, default_value = "14:30")]
    y_time: TimeOfDay,
    #[arg(long, default_value = "09:15")]
    entry_time: TimeOfDay,
    #[arg(long, default_value = "50")]
    stop_loss: Decimal,
    #[arg(long, default_value = "100")]
    target: Decimal,
    #[arg(long, default_value_t = 1)]
    lot_size: u32,
    /// Show generated sample results if the request fails
    #[arg(long)]
    sample_fallback: bool,
}

impl BacktestArgs {
    fn request(&self) -> BacktestRequest {
        BacktestRequest {
            start_date: self.start,
            end_date: self.end.unwrap_or(self.start),
            instrument: self.instrument,
            x_time: self.x_time,
            y_time: self.y_time,
            entry_time: self.entry_time,
            stop_loss: self.stop_loss,
            target: self.target,
            lot_size: self.lot_size,
        }
    }
}

#[derive(Args)]
struct FiveMinArgs {
    /// Start date (YYYY-MM-DD)
    #[arg(short, long)]
    start: NaiveDate,
    /// End date (YYYY-MM-DD), defaults to the start date
    #[arg(short, long)]
    end: Option<NaiveDate>,
    /// Instrument token
    #[arg(short, long, default_value_t = NIFTY_50_TOKEN)]
    instrument: u64,
    #[arg(long, default_value_t = 1)]
    lot_size: u32,
    /// Target as a multiple of the opening range
    #[arg(long, default_value = "1.3")]
    multiplier: Decimal,
    /// Minimum opening range in points
    #[arg(long, default_value = "30")]
    min_move: Decimal,
    #[arg(long, default_value = "NFO")]
    exchange: Exchange,
    /// Square-off time (HH:MM)
    #[arg(long, default_value = "15:15")]
    y_time: TimeOfDay,
}

impl FiveMinArgs {
    fn request(&self) -> FiveMinBacktestRequest {
        FiveMinBacktestRequest {
            start_date: self.start,
            end_date: Some(self.end.unwrap_or(self.start)),
            instrument: self.instrument,
            lot_size: self.lot_size,
            multiplier: self.multiplier,
            min_move: self.min_move,
            exchange: self.exchange.as_str().to_string(),
            y_time: self.y_time,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        builder.json().try_init().map_err(|e| anyhow!(e))?;
    } else {
        builder.try_init().map_err(|e| anyhow!(e))?;
    }

    let settings = Settings::load(Some(&cli.config))?;
    if let Err(errors) = settings.validate() {
        for e in &errors {
            error!("Invalid setting: {}", e);
        }
        bail!("{} invalid setting(s)", errors.len());
    }

    if let Commands::Settings = cli.command {
        print!("{}", toml::to_string_pretty(&settings)?);
        return Ok(());
    }

    let page = Page::load(settings, &cli.host)?;
    info!("Algo Admin v0.1.0");

    match cli.command {
        Commands::Status => pages::dashboard::status(&page).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => pages::dashboard::show_config(&page).await?,
            ConfigAction::Set(args) => {
                let patch = ConfigPatch {
                    x_time: args.x_time,
                    y_time: args.y_time,
                    entry_time: args.entry_time,
                    stop_loss: args.stop_loss,
                    target: args.target,
                    lot_size: args.lot_size,
                };
                pages::dashboard::set_config(&page, patch).await?
            }
            ConfigAction::Exchange { exchange } => pages::dashboard::set_exchange(&page, exchange).await?,
        },
        Commands::Start { exchange } => pages::dashboard::set_running(&page, true, exchange).await?,
        Commands::Stop { exchange } => pages::dashboard::set_running(&page, false, exchange).await?,
        Commands::Trades => pages::dashboard::trades(&page).await?,
        Commands::Symbols { action } => match action {
            SymbolAction::Search { query, exchange } => pages::symbols::search(&page, &query, exchange).await?,
            SymbolAction::Get { instrument_token } => pages::symbols::get(&page, instrument_token).await?,
        },
        Commands::Backtest(args) => pages::backtest::run(&page, args.request(), args.sample_fallback).await?,
        Commands::Backtest5Min(args) => pages::backtest::run_five_min(&page, args.request()).await?,
        Commands::Historical { instrument, start, end, interval, sample_fallback } => {
            let params = HistoricalDataRequest {
                instrument,
                start_date: start,
                end_date: end.unwrap_or(start),
                interval,
            };
            pages::historical::run(&page, params, sample_fallback).await?
        }
        Commands::Watch => pages::breakout::watch(&page).await?,
        Commands::Login { email, password } => pages::auth::login(&page, &email, &password).await?,
        Commands::Token { action } => match action {
            TokenAction::Url { api_key, redirect_url } => {
                pages::auth::token_url(&page, api_key.as_deref(), redirect_url.as_deref())?
            }
            TokenAction::Exchange { redirect_or_token } => {
                pages::auth::token_exchange(&page, &redirect_or_token).await?
            }
        },
        Commands::Settings => {}
    }

    Ok(())
}
