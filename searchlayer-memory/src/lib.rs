//! In-memory search backend for searchlayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the `SearchBackend` trait.
//! It evaluates the same prefix and range queries, sort specifications and paging bounds that
//! the adapter sends to a real engine, which makes it suitable for development and tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Engine semantics** - Default page size, total hit counts, versions and shard acknowledgements
//! - **Store-assigned ids** - Documents created without an id get a random UUID
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
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = SearchStore::new(InMemoryStore::builder().build().await?);
//!     let users = store.repository::<User>();
//!
//!     let mut user = User { name: "Alice".to_string(), ..Default::default() };
//!     users.create(&mut user).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod store;
pub(crate) mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
