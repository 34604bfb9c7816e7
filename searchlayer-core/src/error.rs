//! Error types and result types for search store operations.
//!
//! Every fallible operation in this crate returns [`DocumentStoreResult<T>`]. The variants of
//! [`DocumentStoreError`] fall into a few families:
//!
//! - **Configuration** - the model's declared shape cannot support the requested operation
//!   ([`MissingIdField`](DocumentStoreError::MissingIdField),
//!   [`InvalidModel`](DocumentStoreError::InvalidModel)).
//! - **Validation** - the caller's input is rejected before any request is sent
//!   ([`MissingIdentifier`](DocumentStoreError::MissingIdentifier),
//!   [`InvalidIdentifier`](DocumentStoreError::InvalidIdentifier),
//!   [`InvalidFilter`](DocumentStoreError::InvalidFilter)).
//! - **Soft outcomes** - the store answered, but the target was absent or already present
//!   ([`DocumentNotFound`](DocumentStoreError::DocumentNotFound),
//!   [`DocumentAlreadyExists`](DocumentStoreError::DocumentAlreadyExists)).
//! - **Transport and decode** - everything else the store or the codec reports.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a search store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization error when converting a field value to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during backend initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The model type declares no identifier field, but the operation needs one.
    #[error("Model {0} declares no identifier field")]
    MissingIdField(&'static str),
    /// The model's declared shape is inconsistent (duplicate identifiers or wire names).
    #[error("Invalid model {0}: {1}")]
    InvalidModel(&'static str, String),
    /// The identifier is absent from the input (or empty) for an operation that requires it.
    #[error("Identifier '{0}' is required for this operation")]
    MissingIdentifier(String),
    /// The identifier is present but is not representable as a document id.
    #[error("Identifier '{0}' must be a string: {1}")]
    InvalidIdentifier(String, String),
    /// The filter specification cannot be turned into a query.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    /// A document with the given ID already exists in the index.
    /// The first argument is the document ID, the second is the index name.
    #[error("Document {0} already exists in index {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested document was not found in the index.
    /// The first argument is the document ID, the second is the index name.
    #[error("Document not found {0} in index {1}")]
    DocumentNotFound(String, String),
    /// A document value could not be assigned to the model field it maps to.
    #[error("Cannot decode field '{field}' of {model}: {reason}")]
    Decode {
        /// The model type being decoded.
        model: &'static str,
        /// The wire name of the offending field.
        field: String,
        /// The underlying conversion failure.
        reason: String,
    },
    /// An error occurred in the underlying storage backend or its transport.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Returns `true` when the store reported the addressed document as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocumentStoreError::DocumentNotFound(..))
    }

    /// Returns `true` when the store refused a create because the identifier is taken.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DocumentStoreError::DocumentAlreadyExists(..))
    }

    /// Returns `true` for errors raised before any request reaches the store.
    pub fn is_rejected_locally(&self) -> bool {
        matches!(
            self,
            DocumentStoreError::MissingIdField(_)
                | DocumentStoreError::InvalidModel(..)
                | DocumentStoreError::MissingIdentifier(_)
                | DocumentStoreError::InvalidIdentifier(..)
                | DocumentStoreError::InvalidFilter(_)
        )
    }
}

/// A specialized `Result` type for search store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
