//! Typed CRUD and search operations over one index.
//!
//! A [`Repository`] binds a [`Model`] type to an index and a backend. Every operation is a single
//! round trip: the model is encoded with the [`codec`](crate::codec), the filter and sort are
//! translated by the [`query`](crate::query) module, and hits come back through the
//! [`materialize`](crate::materialize) module.
//!
//! # Example
//!
//! ```ignore
//! use searchlayer::prelude::*;
//!
//! #[derive(Debug, Default, Model)]
//! #[model(index = "users")]
//! pub struct User {
//!     #[model(id)]
//!     pub id: String,
//!     pub name: String,
//!     pub age: u32,
//! }
//!
//! # async fn example(store: &SearchStore<InMemoryStore>) -> DocumentStoreResult<()> {
//! let users = store.repository::<User>();
//!
//! let mut user = User { name: "alice".into(), age: 31, ..Default::default() };
//! users.create(&mut user).await?;
//!
//! let adults = users
//!     .search(&FilterSpec::new().range("age", RangeOp::Gte, 18), "-age", PageRequest::default())
//!     .await?;
//! # Ok(()) }
//! ```

use std::marker::PhantomData;
use tracing::{debug, warn};

use crate::{
    backend::SearchBackend,
    codec::{assign_identifier, identifier_of, to_document, to_patch_document},
    document::Document,
    error::{DocumentStoreError, DocumentStoreResult},
    materialize::{decode_hit, decode_hits},
    model::{FieldKind, FieldTable, Model, resolve},
    page::{Page, PageRequest},
    query::{FilterSpec, ID_SORT_FIELD, SearchRequest, build_sort},
};

/// Describes a paged search: what to match, how to order it and which slice to return.
///
/// Request-driven callers implement this on their parameter types and pass them to
/// [`Repository::search_by`].
pub trait SearchCriteria {
    /// The filter to apply.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidFilter`] when the criteria cannot be expressed as a
    /// filter.
    fn filter(&self) -> DocumentStoreResult<FilterSpec>;

    /// The sort expression, such as `"-age,+id"`. Empty by default.
    fn sort(&self) -> &str {
        ""
    }

    /// The page to return. The first page of the default size by default.
    fn page(&self) -> PageRequest {
        PageRequest::default()
    }
}

impl SearchCriteria for FilterSpec {
    fn filter(&self) -> DocumentStoreResult<FilterSpec> {
        Ok(self.clone())
    }
}

/// Typed access to the documents of one index.
///
/// Field metadata for `M` is resolved on each call; the resolver caches it per type, so only the
/// first call builds the table.
#[derive(Debug)]
pub struct Repository<'a, B: SearchBackend, M: Model> {
    index: String,
    backend: &'a B,
    _marker: PhantomData<fn() -> M>,
}

impl<'a, B: SearchBackend, M: Model> Repository<'a, B, M> {
    pub(crate) fn new(index: String, backend: &'a B) -> Self {
        Self { index, backend, _marker: PhantomData }
    }

    /// Returns the name of the index this repository addresses.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Returns the same index viewed as another model type.
    pub fn with_type<T: Model>(&self) -> Repository<'a, B, T> {
        Repository::new(self.index.clone(), self.backend)
    }

    /// Creates `model` if its identifier is free.
    ///
    /// Models without an identifier value (or without an identifier field) get one assigned by
    /// the store; when the model declares an identifier field, the assigned id is written back.
    ///
    /// # Returns
    ///
    /// The version of the created document, or `0` if a document with the same identifier
    /// already exists.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::InvalidModel`] when the identifier is unset and its field is not
    ///   text, since a store-assigned id could not be written back.
    /// - [`DocumentStoreError::Decode`] when the store-assigned id does not fit the identifier.
    /// - Any other [`DocumentStoreError`] if encoding or the store request fails.
    pub async fn create(&self, model: &mut M) -> DocumentStoreResult<u64> {
        let table = resolve::<M>()?;
        let id = match table.identifier() {
            Some(field) => {
                let id = identifier_of(model, &table)?;
                if id.is_none() && !matches!(field.kind(), FieldKind::Text | FieldKind::Unknown) {
                    return Err(DocumentStoreError::InvalidModel(
                        table.model_name(),
                        format!(
                            "identifier '{}' is unset and cannot hold a store-assigned id",
                            field.wire_name()
                        ),
                    ));
                }
                id
            }
            None => None,
        };
        let document = to_document(model, &table)?;

        match self
            .backend
            .create_document(&self.index, id.as_deref(), document)
            .await
        {
            Ok(created) => {
                debug!(index = %self.index, id = %created.id, version = created.version, "document created");

                if id.is_none() && table.identifier().is_some() {
                    assign_identifier(model, &created.id, &table)?;
                }

                Ok(created.version)
            }
            Err(err) if err.is_conflict() => {
                debug!(index = %self.index, id = ?id, "document already exists; nothing created");
                Ok(0)
            }
            Err(err) => Err(err),
        }
    }

    /// Loads the document with `id`.
    ///
    /// # Returns
    ///
    /// `None` if no such document exists.
    ///
    /// # Errors
    ///
    /// Fails with [`DocumentStoreError::MissingIdentifier`] for an empty `id`, or when the store
    /// request or decoding fails.
    pub async fn load(&self, id: &str) -> DocumentStoreResult<Option<M>> {
        let table = resolve::<M>()?;
        require_id(id, &table)?;

        self.backend
            .get_document(&self.index, id)
            .await?
            .map(|hit| decode_hit(hit, &table))
            .transpose()
    }

    /// Returns whether a document with `id` exists.
    pub async fn exists(&self, id: &str) -> DocumentStoreResult<bool> {
        let table = resolve::<M>()?;
        require_id(id, &table)?;

        self.backend.exists(&self.index, id).await
    }

    /// Returns the documents of the index, up to the store's default page size.
    pub async fn all(&self) -> DocumentStoreResult<Vec<M>> {
        self.find(&FilterSpec::new()).await
    }

    /// Returns the documents matching `filter`, up to the store's default page size.
    pub async fn find(&self, filter: &FilterSpec) -> DocumentStoreResult<Vec<M>> {
        let table = resolve::<M>()?;
        let request = SearchRequest::builder()
            .filter(filter)
            .build();

        let hits = self.backend.search(&self.index, &request).await?;
        debug!(index = %self.index, total = hits.total, returned = hits.hits.len(), "find");

        decode_hits(hits.hits, &table)
    }

    /// Returns the first document matching `filter`, if any.
    pub async fn find_one(&self, filter: &FilterSpec) -> DocumentStoreResult<Option<M>> {
        let table = resolve::<M>()?;
        let request = SearchRequest::builder()
            .filter(filter)
            .size(1)
            .build();

        self.backend
            .search(&self.index, &request)
            .await?
            .hits
            .into_iter()
            .next()
            .map(|hit| decode_hit(hit, &table))
            .transpose()
    }

    /// Runs a bounded search.
    ///
    /// `sort` is a sort expression as accepted by [`build_sort`]. The returned page carries the
    /// total number of matches reported by the store, which may exceed the page length.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`] if the store request fails or any hit fails to decode;
    /// no partial page is returned.
    pub async fn search(&self, filter: &FilterSpec, sort: &str, page: PageRequest) -> DocumentStoreResult<Page<M>> {
        let table = resolve::<M>()?;
        let request = SearchRequest::builder()
            .filter(filter)
            .sort(build_sort(sort, &table))
            .from(page.offset)
            .size(page.limit)
            .build();

        let hits = self.backend.search(&self.index, &request).await?;
        debug!(
            index = %self.index,
            total = hits.total,
            offset = page.offset,
            limit = page.limit,
            "search"
        );

        Ok(Page::new(decode_hits(hits.hits, &table)?, hits.total, page))
    }

    /// Runs a bounded search described by `criteria`.
    pub async fn search_by<C>(&self, criteria: &C) -> DocumentStoreResult<Page<M>>
    where
        C: SearchCriteria + ?Sized,
    {
        let filter = criteria.filter()?;
        self.search(&filter, criteria.sort(), criteria.page()).await
    }

    /// Writes every non-identifier field of `model` into the stored document.
    ///
    /// # Returns
    ///
    /// The number of shards that acknowledged the write.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::MissingIdField`] when `M` declares no identifier.
    /// - [`DocumentStoreError::MissingIdentifier`] when the identifier is empty. No request is
    ///   sent in either case.
    /// - [`DocumentStoreError::DocumentNotFound`] when the document does not exist.
    pub async fn update(&self, model: &M) -> DocumentStoreResult<u64> {
        let table = resolve::<M>()?;
        let id = required_identifier(model, &table)?;
        let document = to_document(model, &table)?;

        let shards = self
            .backend
            .update_document(&self.index, &id, document)
            .await
            .inspect_err(|err| log_write_failure(&self.index, &id, err))?;
        debug!(index = %self.index, id = %id, shards, "document updated");

        Ok(shards)
    }

    /// Stores `model` under its identifier, creating or replacing the document.
    ///
    /// # Errors
    ///
    /// Fails like [`update`](Self::update) when the identifier is unavailable.
    pub async fn save(&self, model: &M) -> DocumentStoreResult<u64> {
        let table = resolve::<M>()?;
        let id = required_identifier(model, &table)?;
        let document = to_document(model, &table)?;

        let shards = self
            .backend
            .index_document(&self.index, &id, document)
            .await?;
        debug!(index = %self.index, id = %id, shards, "document saved");

        Ok(shards)
    }

    /// Applies a partial update.
    ///
    /// `changes` holds wire field names and must include the identifier, which addresses the
    /// document and is not written. `changes` itself is left untouched.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::MissingIdentifier`] or [`DocumentStoreError::InvalidIdentifier`]
    ///   when the identifier is absent or not a string. No request is sent.
    /// - [`DocumentStoreError::DocumentNotFound`] when the document does not exist.
    pub async fn patch(&self, changes: &Document) -> DocumentStoreResult<u64> {
        let table = resolve::<M>()?;
        let id_field = table.require_identifier()?;
        let (body, id) = to_patch_document(changes, id_field.wire_name())?;

        let shards = self
            .backend
            .update_document(&self.index, &id, body)
            .await
            .inspect_err(|err| log_write_failure(&self.index, &id, err))?;
        debug!(index = %self.index, id = %id, shards, "document patched");

        Ok(shards)
    }

    /// Deletes the document with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentNotFound`] when the document does not exist.
    pub async fn delete(&self, id: &str) -> DocumentStoreResult<u64> {
        let table = resolve::<M>()?;
        require_id(id, &table)?;

        let shards = self
            .backend
            .delete_document(&self.index, id)
            .await
            .inspect_err(|err| log_write_failure(&self.index, id, err))?;
        debug!(index = %self.index, id, shards, "document deleted");

        Ok(shards)
    }
}

fn required_identifier<M>(model: &M, table: &FieldTable<M>) -> DocumentStoreResult<String> {
    let field = table.require_identifier()?;

    identifier_of(model, table)?
        .ok_or_else(|| DocumentStoreError::MissingIdentifier(field.wire_name().to_string()))
}

fn require_id<M>(id: &str, table: &FieldTable<M>) -> DocumentStoreResult<()> {
    if id.is_empty() {
        let name = table
            .identifier()
            .map_or(ID_SORT_FIELD, |field| field.wire_name());
        return Err(DocumentStoreError::MissingIdentifier(name.to_string()));
    }
    Ok(())
}

fn log_write_failure(index: &str, id: &str, err: &DocumentStoreError) {
    if err.is_not_found() {
        debug!(index, id, "document not found");
    } else {
        warn!(index, id, error = %err, "write failed");
    }
}
