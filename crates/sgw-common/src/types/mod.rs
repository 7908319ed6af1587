//! Common types used across the ingestion workspace

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::SgwError;

/// Kind of environmental record held by an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    /// Observed values (temperature, rainfall, PSI, ...)
    Reading,
    /// Forecasts and outlooks
    Forecast,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Reading => "reading",
            DataKind::Forecast => "forecast",
        }
    }
}

impl std::str::FromStr for DataKind {
    type Err = SgwError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reading" => Ok(DataKind::Reading),
            "forecast" => Ok(DataKind::Forecast),
            other => Err(SgwError::UnknownDataKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite key naming one logical record: `(timestamp, kind, parameter)`.
///
/// `timestamp` is always midnight UTC of the artifact's calendar date. An
/// identity is derived from the artifact name only (see [`crate::identity`]),
/// never from the payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub timestamp: DateTime<Utc>,
    pub kind: DataKind,
    pub parameter: String,
}

impl Identity {
    pub fn new(timestamp: DateTime<Utc>, kind: DataKind, parameter: impl Into<String>) -> Self {
        Self {
            timestamp,
            kind,
            parameter: parameter.into(),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.timestamp.format("%Y-%m-%d"),
            self.kind,
            self.parameter
        )
    }
}

/// Persisted provenance for one [`Identity`].
///
/// Maps to a row of `weather_data_metadata`. At most one entry exists per
/// identity; the latest successful commit wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Path or URI of the artifact the stored payload came from
    pub source: String,
    /// Hex SHA-256 of the artifact's raw bytes
    pub content_hash: String,
    pub load_timestamp: DateTime<Utc>,
}

/// A record the storage engine could not persist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRecord {
    pub source: PathBuf,
    pub error: String,
}

/// Outcome of a storage run.
///
/// Every submitted record ends up in exactly one of the three collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub processed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<FailedRecord>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append another result's collections onto this one
    pub fn merge(&mut self, other: BatchResult) {
        self.processed.extend(other.processed);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }

    pub fn mark_failed(&mut self, source: impl Into<PathBuf>, error: impl ToString) {
        self.failed.push(FailedRecord {
            source: source.into(),
            error: error.to_string(),
        });
    }

    /// Total number of records accounted for
    pub fn total(&self) -> usize {
        self.processed.len() + self.skipped.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
