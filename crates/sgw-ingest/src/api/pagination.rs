//! Token-driven pagination with cycle detection
//!
//! The first response decides everything: if its `data` object holds one of
//! [`COLLECTION_KEYS`] the response is treated as page one of a paginated
//! sequence, otherwise it is returned unchanged. Continuation requests re-send
//! the original query plus the last seen token. The loop stops when a page has
//! no token, when a token repeats, or when a continuation request fails. Items
//! of a page are always merged before its token is inspected.

use crate::api::session::{json_kind, IngestionSession};
use crate::error::{IngestError, Result};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Field carrying the continuation token, in responses and requests alike
pub const PAGINATION_TOKEN_FIELD: &str = "paginationToken";

/// Collection field names, checked in this order
pub const COLLECTION_KEYS: [&str; 3] = ["items", "records", "readings"];

/// First collection key present in a response document
pub fn detect_collection_key(data: &Map<String, Value>) -> Option<&'static str> {
    COLLECTION_KEYS.iter().copied().find(|key| data.contains_key(*key))
}

fn take_token(data: &mut Map<String, Value>) -> Option<String> {
    match data.remove(PAGINATION_TOKEN_FIELD) {
        Some(Value::String(token)) if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Ordered record of observed continuation tokens, repeats included
#[derive(Debug, Default, Clone)]
pub struct PaginationState {
    sequence: Vec<String>,
    seen: HashSet<String>,
}

impl PaginationState {
    /// Record a token, returning `false` if it was seen before
    pub fn observe(&mut self, token: &str) -> bool {
        self.sequence.push(token.to_string());
        self.seen.insert(token.to_string())
    }

    pub fn sequence(&self) -> &[String] {
        &self.sequence
    }

    pub fn unique_count(&self) -> usize {
        self.seen.len()
    }
}

/// What to do after a page has been merged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Request the next page with this token
    Continue(String),
    /// The last page carried no token
    Done,
    /// The token was already seen; the sequence would loop
    Cycle(String),
}

/// Accumulates the pages of one paginated sequence
#[derive(Debug)]
pub struct PageMerger {
    key: &'static str,
    template: Map<String, Value>,
    items: Vec<Value>,
    pages: usize,
    state: PaginationState,
}

impl PageMerger {
    /// Start from the first page. Returns the page unchanged when it has no
    /// collection key, i.e. when the response is not paginated.
    pub fn begin(
        mut first: Map<String, Value>,
    ) -> std::result::Result<(Self, Option<String>), Map<String, Value>> {
        let Some(key) = detect_collection_key(&first) else {
            return Err(first);
        };

        let token = take_token(&mut first);
        let items = match first.remove(key) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![other],
        };

        let merger = Self {
            key,
            template: first,
            items,
            pages: 1,
            state: PaginationState::default(),
        };
        Ok((merger, token))
    }

    /// Decide how to proceed given the token of the most recently merged page
    pub fn advance(&mut self, token: Option<String>) -> PageOutcome {
        match token {
            None => PageOutcome::Done,
            Some(token) if self.state.observe(&token) => PageOutcome::Continue(token),
            Some(token) => PageOutcome::Cycle(token),
        }
    }

    /// Merge a continuation page and return its token. A page without the
    /// collection key is inconsistent and is rejected unmerged.
    pub fn absorb(
        &mut self,
        mut page: Map<String, Value>,
    ) -> std::result::Result<Option<String>, String> {
        let items = match page.remove(self.key) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) => Vec::new(),
            Some(other) => {
                return Err(format!(
                    "collection '{}' is a {} instead of an array",
                    self.key,
                    json_kind(&other)
                ))
            },
            None => return Err(format!("continuation page is missing collection '{}'", self.key)),
        };

        self.items.extend(items);
        self.pages += 1;
        Ok(take_token(&mut page))
    }

    pub fn collection_key(&self) -> &'static str {
        self.key
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    fn item_timestamp(item: Option<&Value>) -> Option<&str> {
        item.and_then(|i| i.get("timestamp")).and_then(Value::as_str)
    }

    pub fn first_timestamp(&self) -> Option<&str> {
        Self::item_timestamp(self.items.first())
    }

    pub fn last_timestamp(&self) -> Option<&str> {
        Self::item_timestamp(self.items.last())
    }

    /// First page's fields plus the concatenated collection, token stripped
    pub fn finish(self) -> Value {
        let mut document = self.template;
        document.insert(self.key.to_string(), Value::Array(self.items));
        Value::Object(document)
    }
}

/// Retry policy for continuation requests
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: std::time::Duration,
}

/// Drives a [`PageMerger`] against a live session
pub struct PaginatedFetcher<'s> {
    session: &'s IngestionSession,
    retry: RetryPolicy,
}

impl<'s> PaginatedFetcher<'s> {
    pub fn new(session: &'s IngestionSession) -> Self {
        let config = session.config();
        Self {
            session,
            retry: RetryPolicy {
                max_retries: config.page_retries,
                delay: config.retry_delay(),
            },
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch every page of `path` and merge them into one document.
    ///
    /// A failure of the first request is returned as an error. Failures on
    /// continuation pages end pagination and yield what was merged so far.
    pub async fn fetch(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        let first = self.session.get_data(path, query).await?;

        let (mut merger, mut token) = match PageMerger::begin(first) {
            Ok(started) => started,
            Err(single) => {
                debug!(path, "Response has no collection field, returning single page");
                return Ok(Value::Object(single));
            },
        };

        loop {
            match merger.advance(token.take()) {
                PageOutcome::Done => break,
                PageOutcome::Cycle(repeated) => {
                    warn!(
                        path,
                        token = %repeated,
                        pages = merger.pages(),
                        "Pagination token repeated, stopping to avoid a loop"
                    );
                    break;
                },
                PageOutcome::Continue(next) => {
                    debug!(path, page = merger.pages() + 1, "Fetching continuation page");
                    let page = match self.fetch_continuation(path, query, &next).await {
                        Ok(page) => page,
                        Err(e) => {
                            warn!(
                                path,
                                pages = merger.pages(),
                                error = %e,
                                "Continuation request failed, returning partial result"
                            );
                            break;
                        },
                    };

                    match merger.absorb(page) {
                        Ok(next_token) => token = next_token,
                        Err(reason) => {
                            let err = IngestError::InconsistentPage {
                                url: path.to_string(),
                                reason,
                            };
                            error!(error = %err, "Stopping pagination, returning partial result");
                            break;
                        },
                    }
                },
            }
        }

        let state = merger.state();
        info!(
            path,
            pages = merger.pages(),
            items = merger.item_count(),
            unique_tokens = state.unique_count(),
            "Pagination complete"
        );
        if state.sequence().len() != state.unique_count() {
            warn!(
                path,
                tokens = state.sequence().len(),
                unique_tokens = state.unique_count(),
                "Token sequence contains repeats"
            );
        }
        if merger.pages() > 1 {
            debug!(
                path,
                first_timestamp = merger.first_timestamp().unwrap_or("-"),
                last_timestamp = merger.last_timestamp().unwrap_or("-"),
                tokens = ?state.sequence(),
                "Merged time span"
            );
        }

        Ok(merger.finish())
    }

    async fn fetch_continuation(
        &self,
        path: &str,
        query: &[(String, String)],
        token: &str,
    ) -> Result<Map<String, Value>> {
        let mut paged_query: Vec<(String, String)> = query
            .iter()
            .filter(|(k, _)| k != PAGINATION_TOKEN_FIELD)
            .cloned()
            .collect();
        paged_query.push((PAGINATION_TOKEN_FIELD.to_string(), token.to_string()));

        let mut attempt = 0;
        loop {
            match self.session.get_data(path, &paged_query).await {
                Ok(page) => return Ok(page),
                Err(e) if attempt < self.retry.max_retries && e.is_retryable() => {
                    attempt += 1;
                    debug!(path, attempt, error = %e, "Retrying continuation request");
                    tokio::time::sleep(self.retry.delay).await;
                },
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn page(items: Vec<Value>, token: Option<&str>) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("items".to_string(), Value::Array(items));
        if let Some(t) = token {
            map.insert(PAGINATION_TOKEN_FIELD.to_string(), Value::String(t.to_string()));
        }
        map
    }

    /// Run the merger over in-memory pages the way the fetcher would
    fn run(pages: Vec<Map<String, Value>>) -> (Value, usize) {
        let mut iter = pages.into_iter();
        let (mut merger, mut token) = PageMerger::begin(iter.next().unwrap()).unwrap();
        loop {
            match merger.advance(token.take()) {
                PageOutcome::Continue(_) => match iter.next() {
                    Some(next) => token = merger.absorb(next).unwrap(),
                    None => break,
                },
                PageOutcome::Done | PageOutcome::Cycle(_) => break,
            }
        }
        let pages = merger.pages();
        (merger.finish(), pages)
    }

    #[test]
    fn test_collection_key_priority() {
        let data = json!({"readings": [], "records": [], "items": []});
        assert_eq!(detect_collection_key(data.as_object().unwrap()), Some("items"));

        let data = json!({"readings": [], "records": []});
        assert_eq!(detect_collection_key(data.as_object().unwrap()), Some("records"));

        let data = json!({"stations": []});
        assert_eq!(detect_collection_key(data.as_object().unwrap()), None);
    }

    #[test]
    fn test_single_page_without_collection_returned_unchanged() {
        let data = json!({"stations": [1], "paginationToken": "A"});
        let original = data.as_object().unwrap().clone();
        let returned = PageMerger::begin(original.clone()).unwrap_err();
        assert_eq!(returned, original);
    }

    #[test]
    fn test_merges_pages_and_strips_token() {
        let mut first = page(vec![json!(1), json!(2)], Some("A"));
        first.insert("stations".to_string(), json!(["S1"]));
        let (merged, pages) = run(vec![
            first,
            page(vec![json!(3)], Some("B")),
            page(vec![json!(4), json!(5)], None),
        ]);

        assert_eq!(pages, 3);
        assert_eq!(merged["items"], json!([1, 2, 3, 4, 5]));
        assert_eq!(merged["stations"], json!(["S1"]));
        assert!(merged.get(PAGINATION_TOKEN_FIELD).is_none());
    }

    #[test]
    fn test_cycle_stops_after_repeating_page_is_merged() {
        let (merged, pages) = run(vec![
            page(vec![json!(1)], Some("A")),
            page(vec![json!(2)], Some("B")),
            page(vec![json!(3)], Some("A")),
            page(vec![json!(99)], None),
        ]);

        assert_eq!(pages, 3);
        assert_eq!(merged["items"], json!([1, 2, 3]));
    }

    #[test]
    fn test_state_keeps_repeats_in_sequence() {
        let mut state = PaginationState::default();
        assert!(state.observe("A"));
        assert!(state.observe("B"));
        assert!(!state.observe("A"));
        assert_eq!(state.sequence(), ["A", "B", "A"]);
        assert_eq!(state.unique_count(), 2);
    }

    #[test]
    fn test_first_page_token_repeated_immediately() {
        let (merged, pages) = run(vec![
            page(vec![json!(1)], Some("A")),
            page(vec![json!(2)], Some("A")),
        ]);
        assert_eq!(pages, 2);
        assert_eq!(merged["items"], json!([1, 2]));
    }

    #[test]
    fn test_inconsistent_continuation_rejected() {
        let (mut merger, token) = PageMerger::begin(page(vec![json!(1)], Some("A"))).unwrap();
        assert_eq!(merger.advance(token), PageOutcome::Continue("A".to_string()));

        let bad = json!({"records": [2]}).as_object().unwrap().clone();
        assert!(merger.absorb(bad).is_err());
        assert_eq!(merger.pages(), 1);
        assert_eq!(merger.finish()["items"], json!([1]));
    }

    #[test]
    fn test_empty_token_treated_as_last_page() {
        let mut first = page(vec![json!(1)], None);
        first.insert(PAGINATION_TOKEN_FIELD.to_string(), json!(""));
        let (_, token) = PageMerger::begin(first).unwrap();
        assert!(token.is_none());
    }

    #[test]
    fn test_timestamps_of_first_and_last_item() {
        let (mut merger, token) = PageMerger::begin(page(
            vec![json!({"timestamp": "2024-12-01T00:00:00+08:00"})],
            Some("A"),
        ))
        .unwrap();
        merger.advance(token);
        merger
            .absorb(page(vec![json!({"timestamp": "2024-12-01T23:55:00+08:00"})], None))
            .unwrap();
        assert_eq!(merger.first_timestamp(), Some("2024-12-01T00:00:00+08:00"));
        assert_eq!(merger.last_timestamp(), Some("2024-12-01T23:55:00+08:00"));
    }

    proptest! {
        /// Distinct tokens: every page is fetched and item counts add up
        #[test]
        fn prop_item_count_is_sum_of_pages(sizes in prop::collection::vec(0usize..6, 1..12)) {
            let n = sizes.len();
            let mut counter = 0u64;
            let pages: Vec<_> = sizes
                .iter()
                .enumerate()
                .map(|(i, &k)| {
                    let items = (0..k).map(|_| { counter += 1; json!(counter) }).collect();
                    let token = (i + 1 < n).then(|| format!("T{}", i));
                    page(items, token.as_deref())
                })
                .collect();

            let (merged, fetched) = run(pages);
            prop_assert_eq!(fetched, n);
            prop_assert_eq!(merged["items"].as_array().unwrap().len(), sizes.iter().sum::<usize>());
        }

        /// Pagination halts right after the first page whose token repeats
        #[test]
        fn prop_halts_on_first_repeat(tokens in prop::collection::vec(0u8..5, 1..15)) {
            let pages: Vec<_> = tokens
                .iter()
                .enumerate()
                .map(|(i, t)| page(vec![json!(i)], Some(format!("T{}", t).as_str())))
                .collect();

            let mut seen = HashSet::new();
            let expected = tokens
                .iter()
                .position(|t| !seen.insert(*t))
                .map(|j| j + 1)
                .unwrap_or(tokens.len());

            let (merged, fetched) = run(pages);
            prop_assert_eq!(fetched, expected);
            prop_assert_eq!(merged["items"].as_array().unwrap().len(), expected);
        }
    }
}
