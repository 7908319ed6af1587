//! Artifact identity derivation
//!
//! Raw artifacts are named `<YYYYMMDD>_<parameter>.<ext>`. The date prefix is
//! the only part of a record's identity that comes from the artifact itself;
//! kind and parameter are supplied by the caller.

use chrono::{DateTime, NaiveDate, Utc};
use std::path::Path;

use crate::error::{Result, SgwError};
use crate::types::{DataKind, Identity};

/// Number of digits in the artifact date prefix
pub const DATE_PREFIX_LEN: usize = 8;

/// Format of the artifact date prefix
pub const DATE_PREFIX_FORMAT: &str = "%Y%m%d";

/// Parsed components of an artifact name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub date: NaiveDate,
    pub suffix: String,
}

impl ArtifactName {
    /// Midnight UTC of the artifact's calendar date
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.date.and_time(chrono::NaiveTime::MIN).and_utc()
    }
}

/// Parse `<YYYYMMDD>_<suffix>.<ext>` from the file name of `path`.
pub fn parse_artifact_name(path: impl AsRef<Path>) -> Result<ArtifactName> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SgwError::malformed_source(&display, "missing file name"))?;

    let (date_part, suffix) = stem
        .split_once('_')
        .ok_or_else(|| SgwError::malformed_source(&display, "expected '<YYYYMMDD>_<parameter>'"))?;

    if date_part.len() != DATE_PREFIX_LEN || !date_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SgwError::malformed_source(
            &display,
            format!("date prefix '{}' is not 8 digits", date_part),
        ));
    }

    if suffix.is_empty() {
        return Err(SgwError::malformed_source(&display, "empty parameter suffix"));
    }

    let date = NaiveDate::parse_from_str(date_part, DATE_PREFIX_FORMAT).map_err(|e| {
        SgwError::malformed_source(&display, format!("invalid date '{}': {}", date_part, e))
    })?;

    Ok(ArtifactName {
        date,
        suffix: suffix.to_string(),
    })
}

/// File name for a parameter's artifact on a given date
pub fn artifact_file_name(date: NaiveDate, parameter: &str, extension: &str) -> String {
    format!("{}_{}.{}", date.format(DATE_PREFIX_FORMAT), parameter, extension)
}

impl Identity {
    /// Derive an identity from an artifact path plus the caller's kind and parameter.
    pub fn from_source(
        path: impl AsRef<Path>,
        kind: DataKind,
        parameter: impl Into<String>,
    ) -> Result<Self> {
        let name = parse_artifact_name(path)?;
        Ok(Identity::new(name.timestamp(), kind, parameter))
    }
}
