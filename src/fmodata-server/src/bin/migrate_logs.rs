//! Upload the local request log to a FileMaker table.
//!
//! ```bash
//! fmodata-migrate-logs --from 2024-01-01 --to 2024-12-31 --table Logs
//! ```

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;

use fmodata_core::config::Config;
use fmodata_core::store::{RequestLog, SqliteLogStore};
use fmodata_rs::Client;
use fmodata_server::api::day_range;
use fmodata_server::migrate::{self, DEFAULT_TABLE};
use fmodata_server::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "fmodata-migrate-logs",
    about = "Copy the request log into a FileMaker table"
)]
struct Args {
    /// Service configuration file
    #[arg(long, default_value = "config.json")]
    config: String,

    /// Remote table, dropped and recreated
    #[arg(long, default_value = DEFAULT_TABLE)]
    table: String,

    /// First day to copy (YYYY-MM-DD)
    #[arg(long, default_value = "1970-01-01")]
    from: String,

    /// Last day to copy (YYYY-MM-DD), defaults to today
    #[arg(long)]
    to: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init_console()?;

    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config))?;
    let settings = config
        .odata
        .as_ref()
        .context("no odata settings in configuration")?;

    let to = args
        .to
        .clone()
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());
    let (start, end) = day_range(&args.from, &to)?;

    let store = SqliteLogStore::open(&config.request_log.path).await?;
    let logs = store.range(start, end).await?;
    println!("Fetched {} logs from {}", logs.len(), config.request_log.path);

    let client = Client::new(settings.client_config())?;
    let report = migrate::migrate(&client, &args.table, &logs).await?;

    println!(
        "Migration complete: {} uploaded, {} failed",
        report.uploaded, report.failed
    );
    Ok(())
}
