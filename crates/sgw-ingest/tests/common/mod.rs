//! Shared test utilities for sgw-ingest integration tests
//!
//! Provides API fixtures, an in-memory [`RecordStore`], and a PostgreSQL test
//! container for the store tests.

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use sgw_common::{Identity, MetadataEntry};
use sgw_ingest::config::ApiConfig;
use sgw_ingest::store::{PreparedRecord, RecordStore};
use sgw_ingest::IngestError;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::info;

pub fn init_test_tracing() {
    sgw_common::logging::init_test_logging();
}

// ============================================================================
// API Fixtures
// ============================================================================

/// API config pointing at a mock server, no retries
pub fn api_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        page_retries: 0,
        retry_delay_ms: 10,
    }
}

/// Wrap a data object in the response envelope
pub fn envelope(data: Value) -> Value {
    json!({
        "code": 0,
        "errorMsg": null,
        "data": data
    })
}

/// A station-readings page with `count` readings starting at `offset`
pub fn readings_page(offset: usize, count: usize, token: Option<&str>) -> Value {
    let readings: Vec<Value> = (offset..offset + count)
        .map(|i| {
            json!({
                "timestamp": format!("2024-12-01T{:02}:{:02}:00+08:00", i / 12, (i % 12) * 5),
                "data": [{"stationId": "S77", "value": i as f64 / 10.0}]
            })
        })
        .collect();

    let mut data = json!({
        "stations": [{
            "id": "S77",
            "deviceId": "S77",
            "name": "Alexandra Road",
            "location": {"latitude": 1.2937, "longitude": 103.8125}
        }],
        "readings": readings,
        "readingType": "TB1 Rainfall 5 Minute Total F",
        "readingUnit": "mm"
    });
    if let Some(token) = token {
        data["paginationToken"] = json!(token);
    }
    data
}

/// A small valid rainfall document, varied by `seed`
pub fn rainfall_document(seed: usize) -> Value {
    readings_page(seed, 2, None)
}

/// Write `document` to `<raw_dir>/<parameter>/<stem>.json`
pub fn write_artifact(raw_dir: &Path, parameter: &str, stem: &str, document: &Value) -> PathBuf {
    let dir = raw_dir.join(parameter);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{}.json", stem));
    std::fs::write(&path, serde_json::to_vec(document).unwrap()).unwrap();
    path
}

// ============================================================================
// In-memory Record Store
// ============================================================================

#[derive(Default)]
pub struct MemoryState {
    pub payloads: HashMap<Identity, Value>,
    pub metadata: HashMap<Identity, MetadataEntry>,
    /// Sizes of the committed batches, in order
    pub commits: Vec<usize>,
    /// Commit attempts (0-based) that should fail
    pub failing_attempts: HashSet<usize>,
    pub attempts: usize,
}

/// Record store backed by hash maps; clones share state
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_attempt(&self, attempt: usize) {
        self.state().failing_attempts.insert(attempt);
    }

    pub fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn load_metadata(&self) -> sgw_ingest::Result<Vec<(Identity, MetadataEntry)>> {
        Ok(self
            .state()
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn commit_batch(&self, records: &[PreparedRecord]) -> sgw_ingest::Result<()> {
        let mut state = self.state();
        let attempt = state.attempts;
        state.attempts += 1;

        if state.failing_attempts.contains(&attempt) {
            return Err(IngestError::Database(sqlx::Error::Protocol(
                "simulated commit failure".to_string(),
            )));
        }

        let now = chrono::Utc::now();
        for record in records {
            state.payloads.insert(record.identity.clone(), record.payload.clone());
            state.metadata.insert(
                record.identity.clone(),
                MetadataEntry {
                    source: record.source_label(),
                    content_hash: record.content_hash.as_str().to_string(),
                    load_timestamp: now,
                },
            );
        }
        state.commits.push(records.len());
        Ok(())
    }
}

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    connection_string: String,
}

impl TestPostgres {
    /// Start a plain PostgreSQL container (no time-series extension)
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .with_tag("16-alpine")
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let connection_string =
            format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

        Ok(Self {
            _container: container,
            connection_string,
        })
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

/// Check if Docker is available
pub fn is_docker_available() -> bool {
    std::process::Command::new("docker")
        .arg("info")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Skip test if Docker is not available
#[macro_export]
macro_rules! skip_if_no_docker {
    () => {
        if !common::is_docker_available() {
            eprintln!("Skipping test: Docker is not available");
            return;
        }
    };
}
