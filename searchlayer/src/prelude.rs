//! Convenient re-exports of commonly used types from searchlayer.
//!
//! ```ignore
//! use searchlayer::prelude::*;
//! ```
//!
//! This provides access to:
//! - The `Model` trait, its derive macro and the field table types
//! - Stores, repositories and backends
//! - Filters, sort expressions and search requests
//! - Pages and error types

pub use searchlayer_core::{
    backend::{Created, SearchBackend, SearchBackendBuilder},
    document::{Document, Hit, SearchHits},
    error::{DocumentStoreError, DocumentStoreResult},
    model::{FieldKind, FieldTable, FieldType, Model, resolve},
    page::{Page, PageRequest},
    query::{Constraint, FilterSpec, RangeOp, SearchRequest, SortDirection, SortSpec, build_query, build_sort},
    repository::{Repository, SearchCriteria},
    store::{DynSearchStore, SearchStore},
};
pub use searchlayer_macros::Model;
