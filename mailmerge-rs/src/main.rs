//! mailmerge: send one personalized email per CSV row
//!
//! # Usage
//!
//! ```bash
//! # Preview every message without connecting to the relay
//! mailmerge people.csv subject.txt body.html --dry-run
//!
//! # Send, with English column names and per-recipient log rows
//! mailmerge people.csv subject.txt body.html --email-col email --name-col name --log-mode immediate
//! ```

use anyhow::Context;
use clap::Parser;
use mailmerge_rs::batch::settings::{DEFAULT_CONFIG_PATH, DEFAULT_EMAIL_COLUMN, DEFAULT_NAME_COLUMN};
use mailmerge_rs::batch::{Batch, BatchSettings};
use mailmerge_rs::delivery::{BatchSummary, BodyFormat};
use mailmerge_rs::outcome::LogMode;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mailmerge")]
#[command(about = "Send personalized emails to every recipient of a CSV file", long_about = None)]
#[command(version)]
struct Cli {
    /// CSV file with one recipient per row
    data_source: PathBuf,

    /// Subject template file
    subject_template: PathBuf,

    /// Body template file (HTML unless --plain-text)
    body_template: PathBuf,

    /// Render and preview messages without sending
    #[arg(long)]
    dry_run: bool,

    /// Column holding the recipient address
    #[arg(long, default_value = DEFAULT_EMAIL_COLUMN)]
    email_col: String,

    /// Column holding the recipient display name
    #[arg(long, default_value = DEFAULT_NAME_COLUMN)]
    name_col: String,

    /// Sender settings file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Column names for a CSV file without a header row
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    /// How outcomes are written (overrides the config file)
    #[arg(long, value_enum)]
    log_mode: Option<LogMode>,

    /// Sent log path (overrides the config file)
    #[arg(long)]
    sent_log: Option<PathBuf>,

    /// Failed log path (overrides the config file)
    #[arg(long)]
    failed_log: Option<PathBuf>,

    /// Send the body as text/plain instead of text/html
    #[arg(long)]
    plain_text: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_settings(self) -> BatchSettings {
        let mut settings =
            BatchSettings::new(self.data_source, self.subject_template, self.body_template);
        settings.config_path = self.config;
        settings.dry_run = self.dry_run;
        settings.email_column = self.email_col;
        settings.name_column = self.name_col;
        settings.columns = self.columns;
        settings.log_mode = self.log_mode;
        settings.sent_log = self.sent_log;
        settings.failed_log = self.failed_log;
        if self.plain_text {
            settings.body_format = BodyFormat::Plain;
        }
        settings
    }
}

async fn run(cli: Cli) -> anyhow::Result<BatchSummary> {
    let data_source = cli.data_source.display().to_string();
    let batch = Batch::prepare(cli.into_settings())
        .with_context(|| format!("could not prepare batch for '{}'", data_source))?;

    let summary = batch.run().await.context("batch aborted")?;
    Ok(summary)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "mailmerge_rs=debug,mailmerge=debug"
    } else {
        "mailmerge_rs=info,mailmerge=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    info!("Starting mailmerge v{}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(summary) => {
            println!("{}", summary);
            println!("Email process finished.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("--- CRITICAL ERROR ---");
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
