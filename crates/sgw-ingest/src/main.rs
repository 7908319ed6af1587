//! SG Weather Ingest - download and load tool

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sgw_common::logging::{init_logging, LogConfig, LogLevel};
use sgw_ingest::api::{IngestionSession, Parameter};
use sgw_ingest::config::Config;
use sgw_ingest::downloader::{resolve_parameters, DownloadLedger, Downloader};
use sgw_ingest::loader::{load_raw_files, LoadRequest};
use sgw_ingest::store::{BatchStorageEngine, PgRecordStore, StoragePool};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sgw-ingest")]
#[command(author, version, about = "SG weather data ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the storage tables
    InitDb,

    /// Download raw artifacts for a date range
    Download {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Parameters to fetch; all when omitted
        #[arg(short, long, value_delimiter = ',')]
        parameters: Vec<String>,

        /// Re-download days already recorded in the ledger
        #[arg(long)]
        force: bool,
    },

    /// Load raw artifacts for a date range into the store
    Load {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,

        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,

        /// Parameter directories to load; all when omitted
        #[arg(short, long, value_delimiter = ',')]
        parameters: Vec<String>,
    },

    /// Truncate both storage tables
    Clear,
}

fn check_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        anyhow::bail!("Start date {} is after end date {}", start, end);
    }
    Ok(())
}

async fn open_store(config: &Config) -> Result<PgRecordStore> {
    let pool = StoragePool::connect(&config.database)
        .await
        .context("Failed to connect to the database")?;
    pool.ensure_schema().await.context("Failed to initialize tables")?;
    Ok(PgRecordStore::new(Arc::new(pool)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("sgw-ingest")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    let config = Config::load()?;

    match cli.command {
        Command::InitDb => {
            let store = open_store(&config).await?;
            store.pool().close().await;
        },
        Command::Download {
            start,
            end,
            parameters,
            force,
        } => {
            check_range(start, end)?;

            let (parameters, unsupported) = if parameters.is_empty() {
                (Parameter::ALL.to_vec(), 0)
            } else {
                resolve_parameters(&parameters)
            };

            let ledger = DownloadLedger::load(config.storage.ledger_path())?;
            let session = IngestionSession::open(config.api.clone())?;
            let mut downloader =
                Downloader::new(&session, config.storage.raw_dir(), ledger).force(force);

            let mut stats = downloader.download_range(start, end, &parameters).await?;
            stats.unsupported = unsupported;
            info!(stats = %serde_json::to_string(&stats)?, "Download summary");
        },
        Command::Load {
            start,
            end,
            parameters,
        } => {
            check_range(start, end)?;

            let store = open_store(&config).await?;
            let mut engine = BatchStorageEngine::open(store, config.storage.batch_size).await?;

            let request = LoadRequest {
                start,
                end,
                parameters: (!parameters.is_empty()).then_some(parameters),
            };
            let report = load_raw_files(&mut engine, &config.storage.raw_dir(), &request).await?;
            info!(stats = %serde_json::to_string(&report.stats)?, "Load summary");

            engine.close().pool().close().await;
        },
        Command::Clear => {
            let store = open_store(&config).await?;
            store.clear_tables().await?;
            let counts = store.table_counts().await?;
            info!(
                raw_rows = counts.raw_rows,
                metadata_rows = counts.metadata_rows,
                "Verification after clear"
            );
            store.pool().close().await;
        },
    }

    info!("Done");
    Ok(())
}
