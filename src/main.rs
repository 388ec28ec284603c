//! Kraken REST client - command line entry point
//!
//! Subcommands:
//! - time / status: public exchange state
//! - ticker: public ticker for a pair
//! - balance / open-orders / trades: private account data (needs credentials)
//!
//! Credentials and defaults come from `KRAKEN_*` environment variables, with
//! `.env` support.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kraken_rest::kraken::Transport;
use kraken_rest::{ClientConfig, Credentials, KrakenClient, RateLimitTier, ResponseEnvelope};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "kraken-rest")]
#[command(about = "Rate-limited Kraken REST API client", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Rate-limit tier: none, tier2, tier3, tier4 (overrides KRAKEN_RATE_LIMIT_TIER)
    #[arg(long, global = true)]
    tier: Option<String>,

    /// Base URL (overrides KRAKEN_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the exchange server time
    Time,

    /// Show the exchange operating status
    Status,

    /// Show ticker information
    Ticker {
        /// Comma-separated pairs, e.g. "XBTUSD,ETHUSD"
        pair: String,
    },

    /// Show account balances
    Balance,

    /// Show open orders
    OpenOrders {
        /// Include trades related to each order
        #[arg(long)]
        trades: bool,
    },

    /// Show trade history
    Trades {
        /// Start unix timestamp
        #[arg(long)]
        start: Option<i64>,

        /// End unix timestamp
        #[arg(long)]
        end: Option<i64>,

        /// Result offset for pagination
        #[arg(long)]
        offset: Option<u32>,
    },
}

impl Commands {
    fn is_private(&self) -> bool {
        matches!(
            self,
            Self::Balance | Self::OpenOrders { .. } | Self::Trades { .. }
        )
    }
}

fn setup_logging(verbose: bool, log_file: Option<&PathBuf>) -> Result<()> {
    // Filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    // File layer - same format but without ANSI colors
    let file_layer = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let file_name = path
                .file_name()
                .context("Log file path has no file name")?;
            let appender = tracing_appender::rolling::never(&dir, file_name);

            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(appender)
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file {
        info!("Log file: {}", path.display());
    }
    Ok(())
}

fn build_client(cli: &Cli) -> Result<KrakenClient> {
    let mut config = ClientConfig::from_env();
    if let Some(tier) = &cli.tier {
        config = config.with_tier(tier.parse().unwrap_or(RateLimitTier::None));
    }
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url.clone());
    }
    info!("Rate-limit tier: {}", config.tier);

    let mut builder = KrakenClient::builder(config);
    if cli.command.is_private() {
        let credentials = Credentials::from_env()
            .context("Private commands need KRAKEN_API_KEY and KRAKEN_API_SECRET")?;
        builder = builder.credentials(credentials);
    }
    builder.build().context("Failed to create client")
}

/// Print the payload, or the transport or exchange errors
fn print_envelope<T: Serialize>(response: kraken_rest::Result<ResponseEnvelope<T>>) -> Result<()> {
    let envelope = response?;
    if !envelope.errors.is_empty() {
        for error in &envelope.errors {
            warn!("Exchange error: {}", error);
        }
        anyhow::bail!("exchange returned {} error(s)", envelope.errors.len());
    }
    println!("{}", serde_json::to_string_pretty(&envelope.result)?);
    Ok(())
}

/// Run one command, closing the client whether or not it succeeds
async fn execute<T: Transport>(client: &KrakenClient<T>, command: Commands) -> Result<()> {
    let outcome = match command {
        Commands::Time => print_envelope(client.server_time().await),
        Commands::Status => print_envelope(client.system_status().await),
        Commands::Ticker { pair } => print_envelope(client.ticker(&pair).await),
        Commands::Balance => print_envelope(client.balance().await),
        Commands::OpenOrders { trades } => print_envelope(client.open_orders(trades).await),
        Commands::Trades { start, end, offset } => {
            print_envelope(client.trades_history(start, end, offset).await)
        }
    };

    client.close().await;
    outcome
}

async fn run(cli: Cli) -> Result<()> {
    let client = build_client(&cli)?;
    execute(&client, cli.command).await
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.log_file.as_ref())?;

    run(cli).await
}
