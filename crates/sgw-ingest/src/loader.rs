//! Load raw artifacts from disk into the store
//!
//! Walks `<raw_dir>/<parameter>/*.json`, keeps files whose name date falls in
//! the requested range, validates each against its parameter's shape and hands
//! the valid ones to the [`BatchStorageEngine`].

use crate::api::dispatch;
use crate::error::{IngestError, Result};
use crate::schemas::DocumentShape;
use crate::store::{BatchStorageEngine, RecordStore, StoreRequest};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sgw_common::identity::parse_artifact_name;
use sgw_common::BatchResult;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Which artifacts to load
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Restrict to these parameter directories; all when `None`
    pub parameters: Option<Vec<String>>,
}

/// Summary counters of one load run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Files found under directories that name no supported parameter
    pub unsupported: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub stats: LoadStats,
    pub result: BatchResult,
}

impl LoadRequest {
    fn wants(&self, parameter: &str) -> bool {
        self.parameters
            .as_ref()
            .is_none_or(|wanted| wanted.iter().any(|p| p == parameter))
    }

    fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

async fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

async fn read_validated(path: &Path, shape: DocumentShape) -> Result<Value> {
    let bytes = tokio::fs::read(path).await?;
    let document: Value = serde_json::from_slice(&bytes)?;
    shape.validate(document)
}

/// Load every matching artifact under `raw_dir`
#[instrument(skip(engine, request), fields(start = %request.start, end = %request.end))]
pub async fn load_raw_files<S: RecordStore>(
    engine: &mut BatchStorageEngine<S>,
    raw_dir: &Path,
    request: &LoadRequest,
) -> Result<LoadReport> {
    let mut report = LoadReport::default();
    let mut requests = Vec::new();

    for dir in sorted_entries(raw_dir).await? {
        if !dir.is_dir() {
            continue;
        }
        let Some(parameter) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string)
        else {
            continue;
        };
        if !request.wants(&parameter) {
            continue;
        }

        let files: Vec<PathBuf> =
            sorted_entries(&dir).await?.into_iter().filter(|p| is_json(p)).collect();

        let route = match dispatch(&parameter) {
            Ok(route) => route,
            Err(IngestError::UnsupportedParameter(_)) => {
                warn!(parameter = %parameter, files = files.len(), "Unsupported parameter, skipping");
                report.stats.unsupported += files.len();
                continue;
            },
            Err(e) => return Err(e),
        };

        let mut in_range = 0usize;
        for file in files {
            let date = match parse_artifact_name(&file) {
                Ok(name) => name.date,
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Couldn't parse date from file name");
                    report.result.mark_failed(file, e);
                    continue;
                },
            };
            if !request.covers(date) {
                continue;
            }
            in_range += 1;

            match read_validated(&file, route.shape).await {
                Ok(payload) => requests.push(StoreRequest {
                    kind: route.kind,
                    parameter: parameter.clone(),
                    payload,
                    source: file,
                }),
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Invalid artifact");
                    report.result.mark_failed(file, e);
                },
            }
        }

        info!(parameter = %parameter, files = in_range, "Found files within date range");
    }

    info!(
        records = requests.len(),
        batch_size = engine.batch_size(),
        "Submitting records for storage"
    );
    report.result.merge(engine.store_batch(requests).await);

    report.stats.processed = report.result.processed.len();
    report.stats.skipped = report.result.skipped.len();
    report.stats.failed = report.result.failed.len();

    for failed in &report.result.failed {
        warn!(file = %failed.source.display(), error = %failed.error, "Failed file");
    }
    info!(
        processed = report.stats.processed,
        skipped = report.stats.skipped,
        failed = report.stats.failed,
        unsupported = report.stats.unsupported,
        "Load complete"
    );

    Ok(report)
}
