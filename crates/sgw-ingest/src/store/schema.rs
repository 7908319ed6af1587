//! Table and index definitions

use crate::error::Result;
use crate::store::pool::PooledConnection;
use tracing::{info, warn};

pub const RAW_TABLE: &str = "raw_weather_data";
pub const METADATA_TABLE: &str = "weather_data_metadata";

const CREATE_TIMESCALE_EXTENSION: &str = "CREATE EXTENSION IF NOT EXISTS timescaledb";

const CREATE_RAW_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS raw_weather_data (
    data_timestamp TIMESTAMPTZ NOT NULL,
    data_type TEXT NOT NULL,
    parameter TEXT NOT NULL,
    validated_data JSONB NOT NULL,
    ingestion_timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (data_timestamp, data_type, parameter)
)
"#;

const CREATE_RAW_HYPERTABLE: &str =
    "SELECT create_hypertable('raw_weather_data', 'data_timestamp', if_not_exists => TRUE)";

const CREATE_METADATA_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS weather_data_metadata (
    data_timestamp TIMESTAMPTZ NOT NULL,
    data_type TEXT NOT NULL,
    parameter TEXT NOT NULL,
    file_path TEXT NOT NULL,
    file_hash TEXT NOT NULL,
    load_timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (data_timestamp, data_type, parameter)
)
"#;

const CREATE_RAW_PARAMETER_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_raw_weather_data_parameter_time
    ON raw_weather_data (parameter, data_timestamp DESC)
"#;

/// Create both tables and their indexes. Safe to run repeatedly.
///
/// With `timescale` set, the extension is created and the raw table is turned
/// into a hypertable partitioned on `data_timestamp`.
pub async fn initialize(conn: &mut PooledConnection<'_>, timescale: bool) -> Result<()> {
    let mut statements = 0;

    if timescale {
        sqlx::query(CREATE_TIMESCALE_EXTENSION).execute(&mut **conn).await?;
        statements += 1;
    }

    sqlx::query(CREATE_RAW_TABLE).execute(&mut **conn).await?;
    statements += 1;

    if timescale {
        sqlx::query(CREATE_RAW_HYPERTABLE).execute(&mut **conn).await?;
        statements += 1;
    } else {
        warn!("Time-series extension disabled, {} stays a plain table", RAW_TABLE);
    }

    sqlx::query(CREATE_METADATA_TABLE).execute(&mut **conn).await?;
    sqlx::query(CREATE_RAW_PARAMETER_INDEX).execute(&mut **conn).await?;
    statements += 2;

    conn.record_operations(statements);
    info!(timescale, "Storage schema ready");
    Ok(())
}
