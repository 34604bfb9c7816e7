//! Generic document representation exchanged with the store.
//!
//! A [`Document`] is a schemaless JSON object keyed by wire field names. Search and get
//! operations return [`Hit`]s: a store-assigned identifier plus the stored document, which the
//! [`materialize`](crate::materialize) module turns back into typed models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schemaless key/value record as stored and returned by the store.
pub type Document = Map<String, Value>;

/// One raw result returned by the store: an identifier and its stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// The document identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// The stored document, without its identifier.
    #[serde(rename = "_source", default)]
    pub source: Document,
}

impl Hit {
    pub fn new(id: impl Into<String>, source: Document) -> Self {
        Self { id: id.into(), source }
    }
}

/// The hits of one search response together with the total number of matches.
///
/// `total` counts every matching document and may exceed `hits.len()` when the search was
/// bounded by a page size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    pub total: u64,
    pub hits: Vec<Hit>,
}

/// Returns a short name for the JSON type of `value`, for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
