//! Typed models over a JSON search engine.
//!
//! This crate is the primary entry point for users of searchlayer. It re-exports the core types
//! from the sub-crates, the `Model` derive macro and the in-memory backend.
//!
//! # Features
//!
//! - **Typed models** - Derive a field table with `#[derive(Model)]`; no runtime reflection
//! - **Prefix and range filters** - Built explicitly or from request-style JSON maps
//! - **Compact sort expressions** - `"-age,+id"`, validated against the model's fields
//! - **Paged search** - Result pages carry the total match count reported by the engine
//! - **Pluggable backends** - Implement [`backend::SearchBackend`] for a concrete engine client
//!
//! # Quick Start
//!
//! ```ignore
//! use searchlayer::{prelude::*, memory::InMemoryStore};
//!
//! #[derive(Debug, Default, Model)]
//! #[model(index = "users")]
//! pub struct User {
//!     #[model(id)]
//!     pub id: String,
//!     #[model(rename = "display_name")]
//!     pub name: String,
//!     pub age: u32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = SearchStore::new(InMemoryStore::builder().build().await?);
//!     let users = store.repository::<User>();
//!
//!     // The store assigns an id, which is written back into the model.
//!     let mut user = User { name: "Alice".to_string(), age: 31, ..Default::default() };
//!     users.create(&mut user).await?;
//!
//!     let page = users
//!         .search(
//!             &FilterSpec::new().prefix("display_name", "Al").range("age", RangeOp::Gte, 18),
//!             "-age",
//!             PageRequest::default(),
//!         )
//!         .await?;
//!
//!     println!("{} of {} users", page.items.len(), page.total);
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! A store can erase its backend type with `into_dyn`, for applications that choose the backend
//! at runtime. Repositories work the same way on both.
//!
//! ```ignore
//! let store: DynSearchStore = SearchStore::new(InMemoryStore::new()).into_dyn();
//! let users = store.repository::<User>();
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory backend for development and testing

#[allow(unused_extern_crates)]
extern crate self as searchlayer;

pub mod prelude;

pub use searchlayer_core::{
    backend, codec, document, error, materialize, model, page, query, repository, store,
};
pub use searchlayer_macros::Model;

// Used by code generated by `#[derive(Model)]`.
#[doc(hidden)]
pub use searchlayer_core::__private;

pub use async_trait::async_trait;
pub use serde_json;

/// In-memory search backend.
pub mod memory {
    pub use searchlayer_memory::{InMemoryStore, InMemoryStoreBuilder};
}
