//! Crier: scheduled cross-posting agent.
//!
//! Reads scheduled post rows from a spreadsheet, fetches post text from the
//! linked document, publishes text plus an optional image to each row's
//! destinations, and writes per-destination status, link and delivery-log
//! cells back. Subcommands:
//! - `daemon`: run the poll loop until stopped
//! - `once`: run a single dispatcher pass and exit (for external cron)

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crier_dispatch::{
    DestinationSource, DispatchConfig, Dispatcher, PollLoop, Publishers, SCHEDULE_FORMAT,
    WritebackColumns,
};
use crier_ledger::{DocsClient, SheetsClient};
use crier_publish::{OkPublisher, TelegramPublisher, VkPublisher};

#[derive(Parser)]
#[command(name = "crier")]
#[command(about = "Scheduled cross-posting agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Credentials and sheet layout shared by both subcommands. Behavior is
/// driven by spreadsheet content; these only say where to find it.
#[derive(Args)]
struct CommonArgs {
    /// Spreadsheet id
    #[arg(long, env = "CRIER_SPREADSHEET_ID")]
    spreadsheet_id: String,

    /// Google API bearer token (spreadsheet + document scopes)
    #[arg(long, env = "CRIER_GOOGLE_TOKEN")]
    google_token: String,

    /// Telegram bot token
    #[arg(long, env = "CRIER_TELEGRAM_TOKEN")]
    telegram_token: String,

    /// VK access token
    #[arg(long, env = "CRIER_VK_TOKEN")]
    vk_token: String,

    /// OK access token
    #[arg(long, env = "CRIER_OK_TOKEN")]
    ok_token: String,

    /// OK application (public) key
    #[arg(long, env = "CRIER_OK_PUBLIC_KEY")]
    ok_public_key: String,

    /// OK private key used for request signing
    #[arg(long, env = "CRIER_OK_PRIVATE_KEY")]
    ok_private_key: String,

    /// Sheet holding the schedule rows
    #[arg(long, default_value = "requests log")]
    schedule_sheet: String,

    /// First schedule row (rows above are headers)
    #[arg(long, default_value = "3")]
    first_row: u32,

    /// Where destinations come from
    #[arg(long, value_enum, default_value = "directory")]
    destination_source: SourceArg,

    /// A1 range of the destination directory (directory mode)
    #[arg(long, default_value = "Networks!A3:C")]
    directory_range: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    /// Destination names resolve against a directory sheet
    Directory,
    /// The schedule row carries one id column per destination kind
    FixedColumns,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the poll loop until stopped
    Daemon {
        #[command(flatten)]
        common: CommonArgs,

        /// Seconds between passes
        #[arg(long, default_value = "60")]
        poll_interval: u64,

        /// Only dispatch rows that become due after this instant
        /// (DD.MM.YYYY HH:MM); without it, the delivery log alone
        /// suppresses duplicates
        #[arg(long, value_parser = parse_watermark)]
        since: Option<NaiveDateTime>,
    },

    /// Run a single dispatcher pass and exit
    Once {
        #[command(flatten)]
        common: CommonArgs,

        /// Only dispatch rows that become due after this instant
        /// (DD.MM.YYYY HH:MM)
        #[arg(long, value_parser = parse_watermark)]
        since: Option<NaiveDateTime>,
    },
}

fn parse_watermark(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, SCHEDULE_FORMAT).map_err(|e| {
        format!(
            "invalid timestamp '{}', expected DD.MM.YYYY HH:MM: {}",
            value, e
        )
    })
}

fn build_dispatcher(common: &CommonArgs) -> Dispatcher {
    let ledger = Arc::new(SheetsClient::new(
        &common.spreadsheet_id,
        &common.google_token,
    ));
    let content = Arc::new(DocsClient::new(&common.google_token));
    let publishers = Publishers {
        telegram: Arc::new(TelegramPublisher::new(&common.telegram_token)),
        vk: Arc::new(VkPublisher::new(&common.vk_token)),
        ok: Arc::new(OkPublisher::new(
            &common.ok_token,
            &common.ok_public_key,
            &common.ok_private_key,
        )),
    };

    let (source, columns) = match common.destination_source {
        SourceArg::Directory => (
            DestinationSource::Directory {
                range: common.directory_range.clone(),
            },
            WritebackColumns::directory_default(),
        ),
        SourceArg::FixedColumns => (
            DestinationSource::FixedColumns,
            WritebackColumns::fixed_default(),
        ),
    };

    Dispatcher::new(
        ledger,
        content,
        publishers,
        DispatchConfig {
            schedule_sheet: common.schedule_sheet.clone(),
            first_row: common.first_row,
            source,
            columns,
        },
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "crier=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon {
            common,
            poll_interval,
            since,
        } => run_daemon(&common, poll_interval, since).await,

        Commands::Once { common, since } => run_once(&common, since).await,
    }
}

async fn run_daemon(
    common: &CommonArgs,
    poll_interval: u64,
    since: Option<NaiveDateTime>,
) -> Result<()> {
    let dispatcher = build_dispatcher(common);
    let poll = PollLoop::new(dispatcher, Duration::from_secs(poll_interval));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received interrupt, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    poll.run(since.unwrap_or(NaiveDateTime::MIN), shutdown_rx)
        .await
        .map_err(|e| miette::miette!("{}", e))
}

async fn run_once(common: &CommonArgs, since: Option<NaiveDateTime>) -> Result<()> {
    let dispatcher = build_dispatcher(common);

    let summary = dispatcher
        .run_pass(since.unwrap_or(NaiveDateTime::MIN))
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    tracing::info!(
        rows = summary.rows_dispatched,
        outcomes = summary.outcomes.len(),
        "pass complete"
    );
    Ok(())
}
