//! A typed adapter between application models and a JSON search engine.
//!
//! This crate is the core of the searchlayer project and provides:
//!
//! - **Model metadata** ([`model`]) - Field tables describing how a model maps onto documents
//! - **Document codec** ([`codec`]) - Conversion between models and generic documents
//! - **Query building** ([`query`]) - Filter specifications, sort expressions and search requests
//! - **Result materialization** ([`materialize`]) - Decoding raw hits into typed models
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing search backends
//! - **Repositories** ([`repository`]) - Typed CRUD and search operations over one index
//! - **Search store** ([`store`]) - Main interface handing out repositories
//! - **Pagination** ([`page`]) - Page requests and result pages
//! - **Error handling** ([`error`]) - Error types and result types
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
//!     #[serde(rename = "display_name")]
//!     pub name: String,
//!     pub age: u32,
//! }
//! ```

pub mod backend;
pub mod codec;
pub mod document;
pub mod error;
pub mod materialize;
pub mod model;
pub mod page;
pub mod query;
pub mod repository;
pub mod store;

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
