//! Idempotent batch storage
//!
//! [`BatchStorageEngine`] turns a stream of artifacts into atomic batch
//! commits. Each artifact's identity comes from its file name and its content
//! hash from its raw bytes; artifacts whose hash matches the cached hash for
//! their identity are skipped without touching the store.

use crate::error::Result;
use crate::store::cache::MetadataCache;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sgw_common::checksum::ContentHash;
use sgw_common::{BatchResult, DataKind, Identity, MetadataEntry};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// One artifact submitted for storage
#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub kind: DataKind,
    pub parameter: String,
    /// Validated, normalized payload
    pub payload: Value,
    /// Artifact the payload was read from; its name carries the date
    pub source: PathBuf,
}

/// A request with its identity and content hash resolved
#[derive(Debug, Clone)]
pub struct PreparedRecord {
    pub identity: Identity,
    pub payload: Value,
    pub content_hash: ContentHash,
    pub source: PathBuf,
}

impl PreparedRecord {
    pub fn source_label(&self) -> String {
        self.source.display().to_string()
    }
}

/// Backing store for payload and metadata rows
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every metadata row currently stored
    async fn load_metadata(&self) -> Result<Vec<(Identity, MetadataEntry)>>;

    /// Upsert payload and metadata rows for every record in one transaction.
    /// Either all records are committed or none are.
    async fn commit_batch(&self, records: &[PreparedRecord]) -> Result<()>;
}

pub struct BatchStorageEngine<S> {
    store: S,
    cache: MetadataCache,
    batch_size: usize,
    commits: usize,
}

impl<S: RecordStore> BatchStorageEngine<S> {
    /// Load the metadata cache from the store and get ready to accept records
    pub async fn open(store: S, batch_size: usize) -> Result<Self> {
        let cache = MetadataCache::from_entries(store.load_metadata().await?);
        info!(cached_entries = cache.len(), batch_size, "Batch storage engine ready");

        Ok(Self {
            store,
            cache,
            batch_size: batch_size.max(1),
            commits: 0,
        })
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches committed since `open`
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reload the cache from the store, e.g. after the tables were cleared
    pub async fn reload_cache(&mut self) -> Result<()> {
        self.cache = MetadataCache::from_entries(self.store.load_metadata().await?);
        debug!(cached_entries = self.cache.len(), "Metadata cache reloaded");
        Ok(())
    }

    /// Drop the cache and hand the store back
    pub fn close(self) -> S {
        debug!(commits = self.commits, "Batch storage engine closed");
        self.store
    }

    /// Resolve identity and content hash for a request
    pub async fn prepare(request: StoreRequest) -> Result<PreparedRecord> {
        let identity = Identity::from_source(&request.source, request.kind, request.parameter)?;
        let content_hash = ContentHash::from_file_async(&request.source).await?;

        Ok(PreparedRecord {
            identity,
            payload: request.payload,
            content_hash,
            source: request.source,
        })
    }

    /// Store a single artifact
    pub async fn store_one(&mut self, request: StoreRequest) -> BatchResult {
        self.store_batch([request]).await
    }

    /// Store artifacts in commits of at most `batch_size` records.
    ///
    /// Every request lands in exactly one of `processed`, `skipped` or
    /// `failed`. A failed commit fails its whole batch and leaves the cache as
    /// it was; later batches still run.
    pub async fn store_batch(
        &mut self,
        requests: impl IntoIterator<Item = StoreRequest>,
    ) -> BatchResult {
        let mut result = BatchResult::new();
        let mut pending: Vec<PreparedRecord> = Vec::with_capacity(self.batch_size);
        let mut pending_ids: HashSet<Identity> = HashSet::new();

        for request in requests {
            let source = request.source.clone();
            let record = match Self::prepare(request).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(source = %source.display(), error = %e, "Cannot prepare record");
                    result.mark_failed(source, e);
                    continue;
                },
            };

            // One multi-row upsert cannot touch the same key twice
            if pending_ids.contains(&record.identity) {
                result.merge(self.flush(std::mem::take(&mut pending)).await);
                pending_ids.clear();
            }

            if self.cache.is_duplicate(&record.identity, &record.content_hash) {
                debug!(identity = %record.identity, "Unchanged content, skipping");
                result.skipped.push(record.source);
                continue;
            }

            pending_ids.insert(record.identity.clone());
            pending.push(record);

            if pending.len() >= self.batch_size {
                result.merge(self.flush(std::mem::take(&mut pending)).await);
                pending_ids.clear();
            }
        }

        if !pending.is_empty() {
            result.merge(self.flush(pending).await);
        }

        info!(
            processed = result.processed.len(),
            skipped = result.skipped.len(),
            failed = result.failed.len(),
            "Storage run complete"
        );
        result
    }

    async fn flush(&mut self, batch: Vec<PreparedRecord>) -> BatchResult {
        let mut result = BatchResult::new();
        if batch.is_empty() {
            return result;
        }

        match self.store.commit_batch(&batch).await {
            Ok(()) => {
                self.commits += 1;
                let load_timestamp = Utc::now();
                self.cache.apply(batch.iter().map(|record| {
                    (
                        record.identity.clone(),
                        MetadataEntry {
                            source: record.source_label(),
                            content_hash: record.content_hash.as_str().to_string(),
                            load_timestamp,
                        },
                    )
                }));
                debug!(records = batch.len(), commit = self.commits, "Batch committed");
                result.processed.extend(batch.into_iter().map(|record| record.source));
            },
            Err(e) => {
                error!(records = batch.len(), error = %e, "Batch commit failed, rolled back");
                let message = e.to_string();
                for record in batch {
                    result.mark_failed(record.source, &message);
                }
            },
        }

        result
    }
}
