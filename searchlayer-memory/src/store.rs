//! In-memory storage implementation for search stores.
//!
//! This module provides a backend that keeps JSON documents in per-index hash maps behind an
//! async-safe read-write lock, and answers searches by scanning them.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use tracing::{debug, trace};
use uuid::Uuid;

use searchlayer_core::{
    backend::{Created, SearchBackend, SearchBackendBuilder},
    document::{Document, Hit, SearchHits},
    error::{DocumentStoreError, DocumentStoreResult},
    page::DEFAULT_PAGE_SIZE,
    query::SearchRequest,
};
use serde_json::Value;

use crate::evaluator::{DocumentEvaluator, compare};

#[derive(Debug, Clone)]
struct StoredDocument {
    source: Document,
    version: u64,
    /// Insertion order, used when a search has no sort.
    seq: u64,
}

type IndexMap = HashMap<String, StoredDocument>;

#[derive(Debug, Default)]
struct State {
    indices: HashMap<String, IndexMap>,
    next_seq: u64,
}

impl State {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Thread-safe in-memory search backend.
///
/// This struct implements [`SearchBackend`] entirely in memory. Indices are created on first
/// write; reading an index that was never written behaves like reading an empty one.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing it to be
/// shared across async tasks. Clones share the same data.
///
/// # Engine behavior
///
/// - Searches without a `size` return at most the configured default page size (10 unless
///   configured otherwise), like the engine.
/// - Documents are versioned from 1; every write to an existing document increments the version.
/// - Writes report the configured number of shards as acknowledged.
/// - Partial updates merge nested objects key by key.
///
/// # Example
///
/// ```ignore
/// use searchlayer::{backend::SearchBackend, memory::InMemoryStore};
///
/// let store = InMemoryStore::builder().with_shards(2).build().await?;
/// let created = store.create_document("users", Some("42"), document).await?;
/// assert_eq!(created.version, 1);
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    default_page_size: Option<usize>,
    shards: u64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store with the default configuration.
    pub fn new() -> Self {
        Self::with_options(Some(DEFAULT_PAGE_SIZE), 1)
    }

    /// Creates a builder for configuring an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    fn with_options(default_page_size: Option<usize>, shards: u64) -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            default_page_size,
            shards,
        }
    }

    /// Returns the number of documents in `index`.
    pub async fn count(&self, index: &str) -> usize {
        self.state
            .read()
            .await
            .indices
            .get(index)
            .map_or(0, HashMap::len)
    }

    /// Returns the version of a stored document.
    pub async fn version(&self, index: &str, id: &str) -> Option<u64> {
        self.state
            .read()
            .await
            .indices
            .get(index)
            .and_then(|documents| documents.get(id))
            .map(|stored| stored.version)
    }
}

#[async_trait]
impl SearchBackend for InMemoryStore {
    async fn exists(&self, index: &str, id: &str) -> DocumentStoreResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .indices
            .get(index)
            .is_some_and(|documents| documents.contains_key(id)))
    }

    async fn get_document(&self, index: &str, id: &str) -> DocumentStoreResult<Option<Hit>> {
        Ok(self
            .state
            .read()
            .await
            .indices
            .get(index)
            .and_then(|documents| documents.get(id))
            .map(|stored| Hit::new(id, stored.source.clone())))
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> DocumentStoreResult<SearchHits> {
        let state = self.state.read().await;
        let Some(documents) = state.indices.get(index) else {
            trace!(index, "search on unknown index");
            return Ok(SearchHits::default());
        };

        let mut matches = Vec::new();
        for (id, stored) in documents {
            if DocumentEvaluator::new(&stored.source).matches(&request.query)? {
                matches.push((id.as_str(), stored));
            }
        }

        matches.sort_by(|left, right| {
            compare(&request.sort, (left.0, &left.1.source), (right.0, &right.1.source))
                .then(left.1.seq.cmp(&right.1.seq))
        });

        let total = matches.len() as u64;
        let size = request
            .size
            .or(self.default_page_size)
            .unwrap_or(usize::MAX);
        let hits = matches
            .into_iter()
            .skip(request.from.unwrap_or(0))
            .take(size)
            .map(|(id, stored)| Hit::new(id, stored.source.clone()))
            .collect::<Vec<_>>();

        debug!(index, total, returned = hits.len(), "search");

        Ok(SearchHits { total, hits })
    }

    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: Document,
    ) -> DocumentStoreResult<Created> {
        let id = id.map_or_else(|| Uuid::new_v4().simple().to_string(), str::to_string);

        let mut state = self.state.write().await;
        let seq = state.next_seq();
        let documents = state
            .indices
            .entry(index.to_string())
            .or_default();

        if documents.contains_key(&id) {
            return Err(DocumentStoreError::DocumentAlreadyExists(id, index.to_string()));
        }

        documents.insert(id.clone(), StoredDocument { source: document, version: 1, seq });

        Ok(Created { id, version: 1 })
    }

    async fn update_document(&self, index: &str, id: &str, document: Document) -> DocumentStoreResult<u64> {
        let mut state = self.state.write().await;
        let Some(stored) = state
            .indices
            .get_mut(index)
            .and_then(|documents| documents.get_mut(id))
        else {
            return Err(DocumentStoreError::DocumentNotFound(id.to_string(), index.to_string()));
        };

        merge(&mut stored.source, document);
        stored.version += 1;

        Ok(self.shards)
    }

    async fn index_document(&self, index: &str, id: &str, document: Document) -> DocumentStoreResult<u64> {
        let mut state = self.state.write().await;
        let seq = state.next_seq();
        let documents = state
            .indices
            .entry(index.to_string())
            .or_default();

        match documents.get_mut(id) {
            Some(stored) => {
                stored.source = document;
                stored.version += 1;
            }
            None => {
                documents.insert(id.to_string(), StoredDocument { source: document, version: 1, seq });
            }
        }

        Ok(self.shards)
    }

    async fn delete_document(&self, index: &str, id: &str) -> DocumentStoreResult<u64> {
        let mut state = self.state.write().await;

        match state
            .indices
            .get_mut(index)
            .and_then(|documents| documents.remove(id))
        {
            Some(_) => Ok(self.shards),
            None => Err(DocumentStoreError::DocumentNotFound(id.to_string(), index.to_string())),
        }
    }
}

/// Merges `patch` into `target`, descending into objects present on both sides.
fn merge(target: &mut Document, patch: Document) {
    for (key, value) in patch {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => merge(existing, nested),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use searchlayer::{backend::SearchBackendBuilder, memory::InMemoryStore};
///
/// let store = InMemoryStore::builder()
///     .with_default_page_size(25)
///     .with_shards(3)
///     .build()
///     .await?;
/// ```
#[derive(Debug)]
pub struct InMemoryStoreBuilder {
    default_page_size: Option<usize>,
    shards: u64,
}

impl Default for InMemoryStoreBuilder {
    fn default() -> Self {
        Self {
            default_page_size: Some(DEFAULT_PAGE_SIZE),
            shards: 1,
        }
    }
}

impl InMemoryStoreBuilder {
    /// Sets how many hits a search without an explicit size returns.
    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = Some(size);
        self
    }

    /// Lets searches without an explicit size return every match.
    pub fn unbounded(mut self) -> Self {
        self.default_page_size = None;
        self
    }

    /// Sets the shard count reported as acknowledging each write.
    pub fn with_shards(mut self, shards: u64) -> Self {
        self.shards = shards;
        self
    }
}

#[async_trait]
impl SearchBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        if self.shards == 0 {
            return Err(DocumentStoreError::Initialization(
                "an in-memory store needs at least one shard".to_string(),
            ));
        }

        Ok(InMemoryStore::with_options(self.default_page_size, self.shards))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use searchlayer_core::query::{FilterSpec, RangeOp, SortClause, SortDirection, SortSpec};
    use serde_json::json;

    fn document(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn seeded(count: u64) -> InMemoryStore {
        let store = InMemoryStore::new();
        for n in 0..count {
            store
                .create_document("items", Some(format!("item-{n:02}").as_str()), document(json!({ "n": n })))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn create_rejects_taken_ids_and_assigns_missing_ones() {
        let store = InMemoryStore::new();

        let first = store
            .create_document("users", Some("42"), document(json!({ "name": "a" })))
            .await
            .unwrap();
        assert_eq!(first, Created { id: "42".into(), version: 1 });

        let again = store
            .create_document("users", Some("42"), document(json!({ "name": "b" })))
            .await;
        assert!(again.unwrap_err().is_conflict());

        let assigned = store
            .create_document("users", None, document(json!({ "name": "c" })))
            .await
            .unwrap();
        assert_eq!(assigned.id.len(), 32);
        assert_eq!(store.count("users").await, 2);
    }

    #[tokio::test]
    async fn update_merges_and_bumps_version() {
        let store = InMemoryStore::new();
        store
            .create_document("users", Some("1"), document(json!({ "name": "a", "address": { "city": "X", "zip": "1" } })))
            .await
            .unwrap();

        let shards = store
            .update_document("users", "1", document(json!({ "address": { "city": "Y" } })))
            .await
            .unwrap();

        assert_eq!(shards, 1);
        assert_eq!(store.version("users", "1").await, Some(2));
        let hit = store.get_document("users", "1").await.unwrap().unwrap();
        assert_eq!(
            Value::Object(hit.source),
            json!({ "name": "a", "address": { "city": "Y", "zip": "1" } })
        );
    }

    #[tokio::test]
    async fn writes_to_absent_documents_are_not_found() {
        let store = InMemoryStore::new();

        let update = store.update_document("users", "nope", Document::new()).await;
        let delete = store.delete_document("users", "nope").await;

        assert!(update.unwrap_err().is_not_found());
        assert!(delete.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn index_document_upserts() {
        let store = InMemoryStore::builder().with_shards(3).build().await.unwrap();

        assert_eq!(store.index_document("users", "7", document(json!({ "v": 1 }))).await.unwrap(), 3);
        assert_eq!(store.index_document("users", "7", document(json!({ "w": 2 }))).await.unwrap(), 3);

        let hit = store.get_document("users", "7").await.unwrap().unwrap();
        assert_eq!(Value::Object(hit.source), json!({ "w": 2 }));
        assert_eq!(store.version("users", "7").await, Some(2));
    }

    #[tokio::test]
    async fn search_reports_total_beyond_page() {
        let store = seeded(57).await;
        let request = SearchRequest::builder()
            .sort(SortSpec::new(vec![SortClause { field: "n".into(), direction: SortDirection::Asc }]))
            .from(20)
            .size(10)
            .build();

        let result = store.search("items", &request).await.unwrap();

        assert_eq!(result.total, 57);
        assert_eq!(result.hits.len(), 10);
        assert_eq!(result.hits[0].id, "item-20");
    }

    #[tokio::test]
    async fn search_without_size_uses_default_page() {
        let store = seeded(15).await;
        let request = SearchRequest::builder()
            .filter(&FilterSpec::new().range("n", RangeOp::Gte, 2))
            .build();

        let result = store.search("items", &request).await.unwrap();

        assert_eq!(result.total, 13);
        assert_eq!(result.hits.len(), 10);
        assert_eq!(result.hits[0].id, "item-02");
    }

    #[tokio::test]
    async fn unbounded_store_returns_every_match() {
        let store = InMemoryStore::builder().unbounded().build().await.unwrap();
        for n in 0..15 {
            store.index_document("items", &n.to_string(), Document::new()).await.unwrap();
        }

        let result = store.search("items", &SearchRequest::default()).await.unwrap();

        assert_eq!(result.hits.len(), 15);
    }

    #[tokio::test]
    async fn builder_rejects_zero_shards() {
        assert!(InMemoryStore::builder().with_shards(0).build().await.is_err());
    }

    #[tokio::test]
    async fn unknown_index_reads_as_empty() {
        let store = InMemoryStore::new();

        assert!(!store.exists("ghosts", "1").await.unwrap());
        assert_eq!(store.get_document("ghosts", "1").await.unwrap(), None);
        assert_eq!(store.search("ghosts", &SearchRequest::default()).await.unwrap().total, 0);
    }
}
