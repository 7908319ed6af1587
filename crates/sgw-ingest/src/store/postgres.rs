//! PostgreSQL record store
//!
//! Payloads go to `raw_weather_data`, provenance to `weather_data_metadata`.
//! Both tables are keyed by `(data_timestamp, data_type, parameter)` and every
//! write is an upsert, so re-committing a batch is harmless.

use crate::error::Result;
use crate::store::engine::{PreparedRecord, RecordStore};
use crate::store::pool::StoragePool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sgw_common::{DataKind, Identity, MetadataEntry};
use sqlx::{Connection, QueryBuilder};
use std::sync::Arc;
use tracing::{debug, info, warn};

type MetadataRow = (DateTime<Utc>, String, String, String, String, DateTime<Utc>);

/// Row counts of the two ingestion tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub raw_rows: i64,
    pub metadata_rows: i64,
}

#[derive(Clone)]
pub struct PgRecordStore {
    pool: Arc<StoragePool>,
}

impl PgRecordStore {
    pub fn new(pool: Arc<StoragePool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &StoragePool {
        &self.pool
    }

    pub async fn table_counts(&self) -> Result<TableCounts> {
        let mut conn = self.pool.acquire().await?;
        let raw_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM raw_weather_data")
            .fetch_one(&mut *conn)
            .await?;
        let metadata_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM weather_data_metadata")
            .fetch_one(&mut *conn)
            .await?;
        conn.record_operations(2);

        Ok(TableCounts {
            raw_rows,
            metadata_rows,
        })
    }

    /// Empty both tables, returning how many rows they held
    pub async fn clear_tables(&self) -> Result<TableCounts> {
        let before = self.table_counts().await?;

        let mut conn = self.pool.acquire().await?;
        sqlx::query("TRUNCATE TABLE raw_weather_data, weather_data_metadata")
            .execute(&mut *conn)
            .await?;
        conn.record_operations(1);

        info!(
            raw_rows = before.raw_rows,
            metadata_rows = before.metadata_rows,
            "Cleared ingestion tables"
        );
        Ok(before)
    }

    pub async fn fetch_metadata(&self, identity: &Identity) -> Result<Option<MetadataEntry>> {
        let mut conn = self.pool.acquire().await?;
        let row: Option<(String, String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT file_path, file_hash, load_timestamp
            FROM weather_data_metadata
            WHERE data_timestamp = $1 AND data_type = $2 AND parameter = $3
            "#,
        )
        .bind(identity.timestamp)
        .bind(identity.kind.as_str())
        .bind(&identity.parameter)
        .fetch_optional(&mut *conn)
        .await?;
        conn.record_operations(1);

        Ok(row.map(|(source, content_hash, load_timestamp)| MetadataEntry {
            source,
            content_hash,
            load_timestamp,
        }))
    }

    pub async fn fetch_payload(&self, identity: &Identity) -> Result<Option<Value>> {
        let mut conn = self.pool.acquire().await?;
        let payload: Option<Value> = sqlx::query_scalar(
            r#"
            SELECT validated_data
            FROM raw_weather_data
            WHERE data_timestamp = $1 AND data_type = $2 AND parameter = $3
            "#,
        )
        .bind(identity.timestamp)
        .bind(identity.kind.as_str())
        .bind(&identity.parameter)
        .fetch_optional(&mut *conn)
        .await?;
        conn.record_operations(1);

        Ok(payload)
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn load_metadata(&self) -> Result<Vec<(Identity, MetadataEntry)>> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<MetadataRow> = sqlx::query_as(
            r#"
            SELECT data_timestamp, data_type, parameter, file_path, file_hash, load_timestamp
            FROM weather_data_metadata
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;
        conn.record_operations(1);

        let mut entries = Vec::with_capacity(rows.len());
        for (timestamp, data_type, parameter, source, content_hash, load_timestamp) in rows {
            let kind = match data_type.parse::<DataKind>() {
                Ok(kind) => kind,
                Err(e) => {
                    warn!(data_type = %data_type, error = %e, "Ignoring metadata row");
                    continue;
                },
            };
            entries.push((
                Identity::new(timestamp, kind, parameter),
                MetadataEntry {
                    source,
                    content_hash,
                    load_timestamp,
                },
            ));
        }

        debug!(entries = entries.len(), "Loaded stored metadata");
        Ok(entries)
    }

    async fn commit_batch(&self, records: &[PreparedRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut raw_query = QueryBuilder::new(
            r#"
            INSERT INTO raw_weather_data (
                data_timestamp,
                data_type,
                parameter,
                validated_data
            )
            "#,
        );

        raw_query.push_values(records, |mut b, record| {
            b.push_bind(record.identity.timestamp)
                .push_bind(record.identity.kind.as_str())
                .push_bind(&record.identity.parameter)
                .push_bind(&record.payload);
        });

        raw_query.push(
            r#"
            ON CONFLICT (data_timestamp, data_type, parameter)
            DO UPDATE SET
                validated_data = EXCLUDED.validated_data,
                ingestion_timestamp = NOW()
            "#,
        );

        raw_query.build().execute(&mut *tx).await?;

        let mut metadata_query = QueryBuilder::new(
            r#"
            INSERT INTO weather_data_metadata (
                data_timestamp,
                data_type,
                parameter,
                file_path,
                file_hash
            )
            "#,
        );

        metadata_query.push_values(records, |mut b, record| {
            b.push_bind(record.identity.timestamp)
                .push_bind(record.identity.kind.as_str())
                .push_bind(&record.identity.parameter)
                .push_bind(record.source_label())
                .push_bind(record.content_hash.as_str());
        });

        metadata_query.push(
            r#"
            ON CONFLICT (data_timestamp, data_type, parameter)
            DO UPDATE SET
                file_path = EXCLUDED.file_path,
                file_hash = EXCLUDED.file_hash,
                load_timestamp = NOW()
            "#,
        );

        metadata_query.build().execute(&mut *tx).await?;

        tx.commit().await?;
        conn.record_operations(2);

        debug!(records = records.len(), "Committed batch");
        Ok(())
    }
}
