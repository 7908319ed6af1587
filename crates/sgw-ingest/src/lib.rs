//! SG Weather Ingest Library
//!
//! Pulls weather observations and forecasts from the Singapore real-time
//! weather API and stores them idempotently in PostgreSQL.
//!
//! # Pipeline
//!
//! - [`api`]: scoped HTTP session, token pagination with cycle detection and
//!   parameter routing
//! - [`schemas`]: typed document shapes used to validate merged responses
//! - [`downloader`]: range download into per-parameter artifact files
//! - [`loader`]: artifact files into the [`store::BatchStorageEngine`]
//! - [`store`]: connection pool, schema, metadata cache and batch commits
//!
//! # Example
//!
//! ```no_run
//! use sgw_ingest::api::{fetch_parameter, IngestionSession, Parameter};
//! use sgw_ingest::config::ApiConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = IngestionSession::open(ApiConfig::default())?;
//!     let date = chrono::NaiveDate::from_ymd_opt(2024, 12, 1).ok_or_else(|| anyhow::anyhow!("bad date"))?;
//!     let rainfall = fetch_parameter(&session, Parameter::Rainfall, date).await?;
//!     println!("{}", rainfall["readingUnit"]);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod config;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod schemas;
pub mod store;

pub use error::{IngestError, Result};
