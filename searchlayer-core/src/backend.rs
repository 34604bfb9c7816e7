//! Storage backend abstraction for search stores.
//!
//! [`SearchBackend`] is the boundary between the typed adapter and whatever actually talks to the
//! engine. It speaks in logical operations (get, search, create, partial update, replace, delete)
//! against a named index, exchanging generic [`Document`]s and [`Hit`]s. Wire formats,
//! authentication and retries belong to the implementation.
//!
//! # Result conventions
//!
//! - Writes addressed by id report the number of shards that acknowledged them.
//! - Writes and deletes against an absent document fail with
//!   [`DocumentStoreError::DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound).
//! - Creating a document whose id is taken fails with
//!   [`DocumentStoreError::DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists).
//! - Reads of an absent document or index return `None` or an empty hit list, not an error.
//!
//! # Cancellation
//!
//! Every method is an `async fn`. Dropping the returned future cancels the operation as far as
//! the implementation allows; deadlines are applied by the caller (for example with a runtime
//! timeout) and reach the backend the same way.

use async_trait::async_trait;
use std::{any::Any, fmt::Debug};

use crate::{
    document::{Document, Hit, SearchHits},
    error::DocumentStoreResult,
    query::SearchRequest,
};

/// Outcome of a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    /// The document id, as given or as assigned by the store.
    pub id: String,
    /// The document's version after the write.
    pub version: u64,
}

/// Abstract interface for search store backends.
///
/// Implementations must be thread-safe; every operation is a single request/response exchange.
#[async_trait]
pub trait SearchBackend: Send + Sync + Debug {
    /// Returns whether a document with `id` exists in `index`.
    async fn exists(&self, index: &str, id: &str) -> DocumentStoreResult<bool>;

    /// Fetches one document by id, or `None` when it does not exist.
    async fn get_document(&self, index: &str, id: &str) -> DocumentStoreResult<Option<Hit>>;

    /// Runs a search and returns the hits in engine order together with the total match count.
    async fn search(&self, index: &str, request: &SearchRequest) -> DocumentStoreResult<SearchHits>;

    /// Creates a document if its id is free. Without an id, the store assigns one.
    ///
    /// # Errors
    ///
    /// Fails with `DocumentAlreadyExists` when `id` is taken.
    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: Document,
    ) -> DocumentStoreResult<Created>;

    /// Merges `document` into the stored document with `id`.
    ///
    /// Returns the number of shards that acknowledged the write.
    async fn update_document(&self, index: &str, id: &str, document: Document) -> DocumentStoreResult<u64>;

    /// Stores `document` under `id`, replacing any existing document.
    ///
    /// Returns the number of shards that acknowledged the write.
    async fn index_document(&self, index: &str, id: &str, document: Document) -> DocumentStoreResult<u64>;

    /// Deletes the document with `id`.
    ///
    /// Returns the number of shards that acknowledged the delete.
    async fn delete_document(&self, index: &str, id: &str) -> DocumentStoreResult<u64>;

    /// Releases the backend's resources. The default implementation does nothing.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> SearchBackend for &B
where
    B: SearchBackend,
{
    async fn exists(&self, index: &str, id: &str) -> DocumentStoreResult<bool> {
        SearchBackend::exists(*self, index, id).await
    }

    async fn get_document(&self, index: &str, id: &str) -> DocumentStoreResult<Option<Hit>> {
        SearchBackend::get_document(*self, index, id).await
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> DocumentStoreResult<SearchHits> {
        SearchBackend::search(*self, index, request).await
    }

    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: Document,
    ) -> DocumentStoreResult<Created> {
        SearchBackend::create_document(*self, index, id, document).await
    }

    async fn update_document(&self, index: &str, id: &str, document: Document) -> DocumentStoreResult<u64> {
        SearchBackend::update_document(*self, index, id, document).await
    }

    async fn index_document(&self, index: &str, id: &str, document: Document) -> DocumentStoreResult<u64> {
        SearchBackend::index_document(*self, index, id, document).await
    }

    async fn delete_document(&self, index: &str, id: &str) -> DocumentStoreResult<u64> {
        SearchBackend::delete_document(*self, index, id).await
    }
}

/// Object-safe counterpart of [`SearchBackend`], for choosing a backend at runtime.
///
/// Every [`SearchBackend`] implements this trait, and `Box<dyn DynSearchBackend>` implements
/// [`SearchBackend`] in turn.
#[async_trait]
pub trait DynSearchBackend: Send + Sync + Debug {
    async fn exists(&self, index: &str, id: &str) -> DocumentStoreResult<bool>;
    async fn get_document(&self, index: &str, id: &str) -> DocumentStoreResult<Option<Hit>>;
    async fn search(&self, index: &str, request: &SearchRequest) -> DocumentStoreResult<SearchHits>;
    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: Document,
    ) -> DocumentStoreResult<Created>;
    async fn update_document(&self, index: &str, id: &str, document: Document) -> DocumentStoreResult<u64>;
    async fn index_document(&self, index: &str, id: &str, document: Document) -> DocumentStoreResult<u64>;
    async fn delete_document(&self, index: &str, id: &str) -> DocumentStoreResult<u64>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

#[async_trait]
impl<B: SearchBackend + 'static> DynSearchBackend for B {
    async fn exists(&self, index: &str, id: &str) -> DocumentStoreResult<bool> {
        SearchBackend::exists(self, index, id).await
    }

    async fn get_document(&self, index: &str, id: &str) -> DocumentStoreResult<Option<Hit>> {
        SearchBackend::get_document(self, index, id).await
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> DocumentStoreResult<SearchHits> {
        SearchBackend::search(self, index, request).await
    }

    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: Document,
    ) -> DocumentStoreResult<Created> {
        SearchBackend::create_document(self, index, id, document).await
    }

    async fn update_document(&self, index: &str, id: &str, document: Document) -> DocumentStoreResult<u64> {
        SearchBackend::update_document(self, index, id, document).await
    }

    async fn index_document(&self, index: &str, id: &str, document: Document) -> DocumentStoreResult<u64> {
        SearchBackend::index_document(self, index, id, document).await
    }

    async fn delete_document(&self, index: &str, id: &str) -> DocumentStoreResult<u64> {
        SearchBackend::delete_document(self, index, id).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        SearchBackend::shutdown(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[async_trait]
impl SearchBackend for Box<dyn DynSearchBackend> {
    async fn exists(&self, index: &str, id: &str) -> DocumentStoreResult<bool> {
        DynSearchBackend::exists(&**self, index, id).await
    }

    async fn get_document(&self, index: &str, id: &str) -> DocumentStoreResult<Option<Hit>> {
        DynSearchBackend::get_document(&**self, index, id).await
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> DocumentStoreResult<SearchHits> {
        DynSearchBackend::search(&**self, index, request).await
    }

    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: Document,
    ) -> DocumentStoreResult<Created> {
        DynSearchBackend::create_document(&**self, index, id, document).await
    }

    async fn update_document(&self, index: &str, id: &str, document: Document) -> DocumentStoreResult<u64> {
        DynSearchBackend::update_document(&**self, index, id, document).await
    }

    async fn index_document(&self, index: &str, id: &str, document: Document) -> DocumentStoreResult<u64> {
        DynSearchBackend::index_document(&**self, index, id, document).await
    }

    async fn delete_document(&self, index: &str, id: &str) -> DocumentStoreResult<u64> {
        DynSearchBackend::delete_document(&**self, index, id).await
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        DynSearchBackend::shutdown_boxed(self).await
    }
}

/// Factory for backends that need asynchronous setup.
#[async_trait]
pub trait SearchBackendBuilder {
    type Backend: SearchBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
