//! Historical range download
//!
//! Fetches every (parameter, date) pair of a range through the dispatcher and
//! writes one artifact per pair under `<raw_dir>/<parameter>/`. A JSON ledger
//! remembers which pairs are on disk so reruns only fetch what is missing.

use crate::api::{fetch_parameter, IngestionSession, Parameter};
use crate::error::Result;
use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use sgw_common::identity::{artifact_file_name, DATE_PREFIX_FORMAT};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};

/// parameter -> { YYYYMMDD -> download time }
#[derive(Debug, Clone)]
pub struct DownloadLedger {
    path: PathBuf,
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl DownloadLedger {
    /// Read the ledger at `path`, or start an empty one if it does not exist.
    /// Every supported parameter gets an entry.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut entries: BTreeMap<String, BTreeMap<String, String>> = if path.exists() {
            serde_json::from_slice(&std::fs::read(&path)?)?
        } else {
            BTreeMap::new()
        };

        for parameter in Parameter::ALL {
            entries.entry(parameter.as_str().to_string()).or_default();
        }

        Ok(Self { path, entries })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(&self.entries)?)?;
        Ok(())
    }

    pub fn is_downloaded(&self, parameter: Parameter, date: NaiveDate) -> bool {
        self.entries
            .get(parameter.as_str())
            .is_some_and(|days| days.contains_key(&date.format(DATE_PREFIX_FORMAT).to_string()))
    }

    pub fn mark_downloaded(&mut self, parameter: Parameter, date: NaiveDate) {
        self.entries
            .entry(parameter.as_str().to_string())
            .or_default()
            .insert(date.format(DATE_PREFIX_FORMAT).to_string(), Utc::now().to_rfc3339());
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Summary counters of one download run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadStats {
    pub new_files: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Requested names that are not supported parameters
    pub unsupported: usize,
}

/// Path of the artifact for a parameter and date
pub fn artifact_path(raw_dir: &Path, parameter: Parameter, date: NaiveDate) -> PathBuf {
    raw_dir
        .join(parameter.as_str())
        .join(artifact_file_name(date, parameter.as_str(), "json"))
}

/// Resolve requested names, dropping unsupported ones with a warning
pub fn resolve_parameters(names: &[String]) -> (Vec<Parameter>, usize) {
    let mut resolved = Vec::with_capacity(names.len());
    let mut unsupported = 0;
    for name in names {
        match name.parse::<Parameter>() {
            Ok(parameter) => resolved.push(parameter),
            Err(e) => {
                warn!(error = %e, "Dropping parameter");
                unsupported += 1;
            },
        }
    }
    (resolved, unsupported)
}

pub struct Downloader<'s> {
    session: &'s IngestionSession,
    raw_dir: PathBuf,
    ledger: DownloadLedger,
    force: bool,
}

impl<'s> Downloader<'s> {
    pub fn new(session: &'s IngestionSession, raw_dir: impl Into<PathBuf>, ledger: DownloadLedger) -> Self {
        Self {
            session,
            raw_dir: raw_dir.into(),
            ledger,
            force: false,
        }
    }

    /// Re-fetch pairs the ledger already lists
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn ledger(&self) -> &DownloadLedger {
        &self.ledger
    }

    /// Download `parameters` for every day in `start..=end`.
    ///
    /// Parameters of one day are fetched concurrently. A failed pair is
    /// logged and counted; it never aborts the run. The ledger is saved
    /// after each day.
    #[instrument(skip(self, parameters), fields(parameters = parameters.len()))]
    pub async fn download_range(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        parameters: &[Parameter],
    ) -> Result<DownloadStats> {
        let mut stats = DownloadStats::default();

        for date in start.iter_days().take_while(|d| *d <= end) {
            let wanted: Vec<Parameter> = parameters
                .iter()
                .copied()
                .filter(|p| {
                    let done = !self.force && self.ledger.is_downloaded(*p, date);
                    if done {
                        stats.skipped += 1;
                    }
                    !done
                })
                .collect();

            if wanted.is_empty() {
                debug!(%date, "All parameters already downloaded");
                continue;
            }

            let session = self.session;
            let fetches = wanted.iter().map(|parameter| async move {
                (*parameter, fetch_parameter(session, *parameter, date).await)
            });

            for (parameter, outcome) in join_all(fetches).await {
                let written = match outcome {
                    Ok(document) => self.write_artifact(parameter, date, &document).await,
                    Err(e) => Err(e),
                };

                match written {
                    Ok(path) => {
                        debug!(parameter = %parameter, path = %path.display(), "Artifact written");
                        self.ledger.mark_downloaded(parameter, date);
                        stats.new_files += 1;
                    },
                    Err(e) => {
                        error!(parameter = %parameter, %date, error = %e, "Download failed");
                        stats.failed += 1;
                    },
                }
            }

            self.ledger.save()?;
        }

        info!(
            new_files = stats.new_files,
            skipped = stats.skipped,
            failed = stats.failed,
            "Download complete"
        );
        Ok(stats)
    }

    async fn write_artifact(
        &self,
        parameter: Parameter,
        date: NaiveDate,
        document: &serde_json::Value,
    ) -> Result<PathBuf> {
        let path = artifact_path(&self.raw_dir, parameter, date);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, serde_json::to_vec(document)?).await?;
        Ok(path)
    }
}
