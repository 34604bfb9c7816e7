//! Entry point for working with a search backend.
//!
//! A [`SearchStore`] owns a backend and hands out typed [`Repository`] views over its indices.
//! The backend type is usually static; [`SearchStore::into_dyn`] erases it for callers that pick
//! the backend at runtime.
//!
//! # Example
//!
//! ```ignore
//! use searchlayer::prelude::*;
//!
//! let store = SearchStore::new(InMemoryStore::new());
//! let users = store.repository::<User>();
//! let archived = store.repository_in::<User>("users-archive");
//! ```

use crate::{
    backend::{DynSearchBackend, SearchBackend},
    error::DocumentStoreResult,
    model::Model,
    repository::Repository,
};

/// A search store bound to a specific backend implementation.
#[derive(Debug)]
pub struct SearchStore<B: SearchBackend> {
    backend: B,
}

/// A search store whose backend type is chosen at runtime.
pub type DynSearchStore = SearchStore<Box<dyn DynSearchBackend>>;

impl<B: SearchBackend> SearchStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns a repository for `M` over the index the model declares.
    pub fn repository<M: Model>(&self) -> Repository<'_, B, M> {
        Repository::new(M::index_name().to_string(), &self.backend)
    }

    /// Returns a repository for `M` over `index`, overriding the model's declared index.
    pub fn repository_in<M: Model>(&self, index: &str) -> Repository<'_, B, M> {
        Repository::new(index.to_string(), &self.backend)
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to shut down.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}

impl<B: SearchBackend + 'static> SearchStore<B> {
    /// Erases the backend type.
    pub fn into_dyn(self) -> DynSearchStore {
        SearchStore::new(Box::new(self.backend))
    }
}

impl DynSearchStore {
    /// Returns the backend as `T` if that is its concrete type.
    pub fn downcast_backend<T: SearchBackend + 'static>(&self) -> Option<&T> {
        DynSearchBackend::as_any(&*self.backend).downcast_ref::<T>()
    }

    /// Recovers the statically typed store if the backend is a `T`.
    pub fn into_static<T: SearchBackend + 'static>(self) -> Option<SearchStore<T>> {
        DynSearchBackend::into_any(self.backend)
            .downcast::<T>()
            .ok()
            .map(|backend| SearchStore::new(*backend))
    }
}
