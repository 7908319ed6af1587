//! In-memory mirror of the metadata table

use sgw_common::checksum::ContentHash;
use sgw_common::{Identity, MetadataEntry};
use std::collections::HashMap;

/// Identity to provenance map, loaded once and updated after each commit.
///
/// The cache is only ever updated with entries whose transaction committed,
/// so it never runs ahead of the store.
#[derive(Debug, Default, Clone)]
pub struct MetadataCache {
    entries: HashMap<Identity, MetadataEntry>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (Identity, MetadataEntry)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// True when the stored content hash for `identity` equals `hash`
    pub fn is_duplicate(&self, identity: &Identity, hash: &ContentHash) -> bool {
        self.entries
            .get(identity)
            .is_some_and(|entry| entry.content_hash == hash.as_str())
    }

    pub fn get(&self, identity: &Identity) -> Option<&MetadataEntry> {
        self.entries.get(identity)
    }

    /// Apply committed entries, replacing whatever was cached before
    pub fn apply(&mut self, committed: impl IntoIterator<Item = (Identity, MetadataEntry)>) {
        self.entries.extend(committed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sgw_common::DataKind;

    fn identity() -> Identity {
        Identity::new(
            Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap(),
            DataKind::Reading,
            "rainfall",
        )
    }

    fn entry(source: &str, hash: &ContentHash) -> MetadataEntry {
        MetadataEntry {
            source: source.to_string(),
            content_hash: hash.as_str().to_string(),
            load_timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_duplicate_compares_hashes() {
        let hash = ContentHash::of_bytes(b"payload");
        let cache = MetadataCache::from_entries([(identity(), entry("a.json", &hash))]);

        assert!(cache.is_duplicate(&identity(), &hash));
        assert!(!cache.is_duplicate(&identity(), &ContentHash::of_bytes(b"other")));
    }

    #[test]
    fn test_source_path_never_matches_hash() {
        // A source path equal to the hash string must not count as a match
        let hash = ContentHash::of_bytes(b"payload");
        let stored = entry(hash.as_str(), &ContentHash::of_bytes(b"older"));
        let cache = MetadataCache::from_entries([(identity(), stored)]);

        assert!(!cache.is_duplicate(&identity(), &hash));
    }

    #[test]
    fn test_apply_replaces_entry() {
        let mut cache = MetadataCache::new();
        assert!(!cache.is_duplicate(&identity(), &ContentHash::of_bytes(b"x")));

        let first = ContentHash::of_bytes(b"x");
        let second = ContentHash::of_bytes(b"y");
        cache.apply([(identity(), entry("a.json", &first))]);
        cache.apply([(identity(), entry("b.json", &second))]);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&identity()).unwrap().source, "b.json");
        assert!(cache.is_duplicate(&identity(), &second));
    }
}
