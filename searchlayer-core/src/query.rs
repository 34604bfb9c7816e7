//! Filter specifications and their translation into the engine's query language.
//!
//! Callers describe what they want with a [`FilterSpec`]: per wire field, either a
//! [`Constraint::Prefix`] or a [`Constraint::Range`]. [`build_query`] turns it into a conjunctive
//! [`StructuredQuery`] and [`build_sort`] parses compact sort expressions such as `"-age,+id"`.
//! Both end up in a [`SearchRequest`], which serializes to the engine's request body:
//!
//! ```json
//! {
//!   "query": { "bool": { "must": [
//!     { "prefix": { "name": "al" } },
//!     { "range": { "age": { "gte": 18 } } }
//!   ] } },
//!   "sort": [ { "age": { "order": "desc" } } ],
//!   "from": 20,
//!   "size": 10
//! }
//! ```
//!
//! # Filter building
//!
//! ```ignore
//! use searchlayer::query::{FilterSpec, RangeOp};
//!
//! let filter = FilterSpec::new()
//!     .prefix("name", "al")
//!     .range("age", RangeOp::Gte, 18)
//!     .range("age", RangeOp::Lt, 65);
//! ```
//!
//! Filters built from request parameters can use the JSON form instead, where nested objects map
//! operator tokens (`"$gte"`, `">="`, `"lt"`, ...) to bounds:
//!
//! ```ignore
//! let filter = FilterSpec::from_json(&serde_json::json!({
//!     "name": "al",
//!     "age": { "$gte": 18 }
//! }))?;
//! ```

use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq},
};
use serde_json::Value;
use std::fmt;
use tracing::{debug, trace};

use crate::{
    document::json_type_name,
    error::{DocumentStoreError, DocumentStoreResult},
    model::FieldTable,
};

/// The field name the engine sorts identifiers by.
pub const ID_SORT_FIELD: &str = "_id";

/// Comparison operators of a range constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeOp {
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
}

impl RangeOp {
    /// The bound name used by the engine (`"gt"`, `"gte"`, `"lt"`, `"lte"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeOp::Gt => "gt",
            RangeOp::Gte => "gte",
            RangeOp::Lt => "lt",
            RangeOp::Lte => "lte",
        }
    }

    /// Parses an operator token.
    ///
    /// Accepts symbolic tokens (`">"`, `">="`, `"<"`, `"<="`), bound names (`"gte"`), and bound
    /// names behind a single leading marker character (`"$gte"`), which is stripped.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidFilter`] for anything else.
    pub fn from_token(token: &str) -> DocumentStoreResult<Self> {
        match token {
            ">" => return Ok(RangeOp::Gt),
            ">=" => return Ok(RangeOp::Gte),
            "<" => return Ok(RangeOp::Lt),
            "<=" => return Ok(RangeOp::Lte),
            _ => {}
        }

        let name = match token.chars().next() {
            Some(marker) if !marker.is_ascii_alphanumeric() => &token[marker.len_utf8()..],
            _ => token,
        };

        match name {
            "gt" => Ok(RangeOp::Gt),
            "gte" => Ok(RangeOp::Gte),
            "lt" => Ok(RangeOp::Lt),
            "lte" => Ok(RangeOp::Lte),
            _ => Err(DocumentStoreError::InvalidFilter(format!(
                "unknown range operator '{token}'"
            ))),
        }
    }
}

impl fmt::Display for RangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The constraint placed on one field by a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// The field value starts with the given literal.
    Prefix(Value),
    /// The field value falls within all of the given bounds.
    Range(Vec<(RangeOp, Value)>),
}

/// A filter over wire field names, in insertion order.
///
/// Each field carries at most one constraint: inserting a field again replaces its constraint
/// in place (the range helpers merge bounds instead).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    entries: Vec<(String, Constraint)>,
}

impl FilterSpec {
    /// Creates an empty filter, which matches every document.
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Adds a prefix constraint on `field`.
    pub fn prefix(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, Constraint::Prefix(value.into()));
        self
    }

    /// Adds one bound to the range constraint on `field`.
    ///
    /// Bounds accumulate across calls for the same field; a repeated operator replaces the
    /// earlier bound. A prefix constraint on the same field is replaced.
    pub fn range(mut self, field: impl Into<String>, op: RangeOp, value: impl Into<Value>) -> Self {
        self.add_bound(field.into(), op, value.into());
        self
    }

    /// Sets the constraint on `field`, replacing any earlier one in place.
    pub fn insert(&mut self, field: impl Into<String>, constraint: Constraint) {
        let field = field.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = constraint,
            None => self.entries.push((field, constraint)),
        }
    }

    /// Builds a filter from its JSON form.
    ///
    /// Object values become range constraints keyed by operator tokens; every other non-null
    /// value becomes a prefix constraint. `null` values are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidFilter`] when `value` is not an object, when an
    /// operator token is unknown, or when a range has no bounds.
    pub fn from_json(value: &Value) -> DocumentStoreResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            DocumentStoreError::InvalidFilter(format!(
                "expected an object, found {}",
                json_type_name(value)
            ))
        })?;

        let mut filter = FilterSpec::new();
        for (field, value) in object {
            match value {
                Value::Null => continue,
                Value::Object(bounds) => {
                    if bounds.is_empty() {
                        return Err(DocumentStoreError::InvalidFilter(format!(
                            "range on '{field}' has no bounds"
                        )));
                    }
                    let mut range = Vec::with_capacity(bounds.len());
                    for (token, bound) in bounds {
                        push_bound(&mut range, RangeOp::from_token(token)?, bound.clone());
                    }
                    filter.insert(field.clone(), Constraint::Range(range));
                }
                scalar => filter.insert(field.clone(), Constraint::Prefix(scalar.clone())),
            }
        }

        Ok(filter)
    }

    /// Whether the filter has no constraints, and so matches every document.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The number of constrained fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns the constraint on `field`, if any.
    pub fn get(&self, field: &str) -> Option<&Constraint> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, constraint)| constraint)
    }

    /// Iterates constraints in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.entries
            .iter()
            .map(|(field, constraint)| (field.as_str(), constraint))
    }

    fn add_bound(&mut self, field: String, op: RangeOp, value: Value) {
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some((_, Constraint::Range(bounds))) => push_bound(bounds, op, value),
            Some(entry) => entry.1 = Constraint::Range(vec![(op, value)]),
            None => self.entries.push((field, Constraint::Range(vec![(op, value)]))),
        }
    }
}

impl FromIterator<(String, Constraint)> for FilterSpec {
    fn from_iter<I: IntoIterator<Item = (String, Constraint)>>(iter: I) -> Self {
        let mut filter = FilterSpec::new();
        for (field, constraint) in iter {
            filter.insert(field, constraint);
        }
        filter
    }
}

impl TryFrom<Value> for FilterSpec {
    type Error = DocumentStoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        FilterSpec::from_json(&value)
    }
}

fn push_bound(bounds: &mut Vec<(RangeOp, Value)>, op: RangeOp, value: Value) {
    match bounds.iter_mut().find(|(existing, _)| *existing == op) {
        Some(bound) => bound.1 = value,
        None => bounds.push((op, value)),
    }
}

/// One clause of a structured query.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Matches documents whose `field` starts with `value`.
    Prefix { field: String, value: Value },
    /// Matches documents whose `field` satisfies every bound.
    Range { field: String, bounds: Vec<(RangeOp, Value)> },
}

impl Clause {
    pub fn field(&self) -> &str {
        match self {
            Clause::Prefix { field, .. } | Clause::Range { field, .. } => field,
        }
    }
}

/// A conjunctive query: a document matches when it satisfies every clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredQuery {
    must: Vec<Clause>,
}

impl StructuredQuery {
    /// A query matching every document.
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Whether the query has no clauses.
    pub fn is_match_all(&self) -> bool {
        self.must.is_empty()
    }

    /// The conjunctive clauses, in filter order.
    pub fn clauses(&self) -> &[Clause] {
        &self.must
    }
}

/// Translates a filter into a conjunctive query, one clause per filtered field.
///
/// Clause order follows filter order. An empty filter yields [`StructuredQuery::match_all`].
pub fn build_query(filter: &FilterSpec) -> StructuredQuery {
    StructuredQuery {
        must: filter
            .iter()
            .map(|(field, constraint)| match constraint {
                Constraint::Prefix(value) => Clause::Prefix {
                    field: field.to_string(),
                    value: value.clone(),
                },
                Constraint::Range(bounds) => Clause::Range {
                    field: field.to_string(),
                    bounds: bounds.clone(),
                },
            })
            .collect(),
    }
}

/// Sort direction for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Sorts results by one field.
#[derive(Debug, Clone, PartialEq)]
pub struct SortClause {
    /// The engine field to sort by ([`ID_SORT_FIELD`] for the identifier).
    pub field: String,
    pub direction: SortDirection,
}

/// An ordered list of sort clauses. Empty means the engine's default order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortSpec {
    clauses: Vec<SortClause>,
}

impl SortSpec {
    pub fn new(clauses: Vec<SortClause>) -> Self {
        Self { clauses }
    }

    /// Whether no sort is applied, leaving order to the engine.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The sort clauses, most significant first.
    pub fn clauses(&self) -> &[SortClause] {
        &self.clauses
    }
}

/// Parses a sort expression such as `"-age,+id"` against a model's fields.
///
/// Tokens are comma separated. A leading `-` sorts descending and `+` ascending; tokens without
/// one of these markers contribute nothing. The rest of the token is a wire field name. The
/// identifier field sorts by [`ID_SORT_FIELD`].
///
/// Names the model does not declare are passed to the engine unchanged. Text fields other than
/// the identifier cannot be sorted by the engine without a keyword sub-field: when a token names
/// one, the whole expression is rejected and the returned specification is empty.
pub fn build_sort<M>(expression: &str, table: &FieldTable<M>) -> SortSpec {
    let mut clauses = Vec::new();

    for token in expression
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
    {
        let (direction, name) = if let Some(name) = token.strip_prefix('-') {
            (SortDirection::Desc, name)
        } else if let Some(name) = token.strip_prefix('+') {
            (SortDirection::Asc, name)
        } else {
            trace!(token, "sort token has no direction marker; skipped");
            continue;
        };

        let name = name.trim();
        if name.is_empty() {
            trace!(token, "sort token names no field; skipped");
            continue;
        }

        match sortable_field(name, table) {
            Some(field) => clauses.push(SortClause { field, direction }),
            None => {
                debug!(
                    model = table.model_name(),
                    field = name,
                    "sort expression rejected: field is free text"
                );
                return SortSpec::default();
            }
        }
    }

    SortSpec { clauses }
}

fn sortable_field<M>(wire_name: &str, table: &FieldTable<M>) -> Option<String> {
    let Some(field) = table.by_wire_name(wire_name) else {
        return Some(wire_name.to_string());
    };

    if field.is_identifier() {
        Some(ID_SORT_FIELD.to_string())
    } else if field.kind().is_text() {
        None
    } else {
        Some(field.wire_name().to_string())
    }
}

/// A complete search: query, sort and optional bounds.
///
/// Unset `from`/`size` leave paging to the engine's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub query: StructuredQuery,
    pub sort: SortSpec,
    /// Number of matches to skip.
    pub from: Option<usize>,
    /// Maximum number of hits to return.
    pub size: Option<usize>,
}

impl SearchRequest {
    /// Creates a request builder.
    pub fn builder() -> SearchRequestBuilder {
        SearchRequestBuilder::new()
    }

    /// Renders the engine's JSON request body.
    ///
    /// # Errors
    ///
    /// Returns an error only if a filter value cannot be serialized.
    pub fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchRequestBuilder {
    request: SearchRequest,
}

impl SearchRequestBuilder {
    pub fn new() -> Self {
        Self { request: SearchRequest::default() }
    }

    /// Sets the query from a filter.
    pub fn filter(mut self, filter: &FilterSpec) -> Self {
        self.request.query = build_query(filter);
        self
    }

    /// Sets an already built query.
    pub fn query(mut self, query: StructuredQuery) -> Self {
        self.request.query = query;
        self
    }

    /// Sets the sort.
    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.request.sort = sort;
        self
    }

    /// Skips the first `from` matches.
    pub fn from(mut self, from: usize) -> Self {
        self.request.from = Some(from);
        self
    }

    /// Returns at most `size` hits.
    pub fn size(mut self, size: usize) -> Self {
        self.request.size = Some(size);
        self
    }

    /// Finishes the request.
    pub fn build(self) -> SearchRequest {
        self.request
    }
}

/// Visits the clauses of a structured query.
///
/// Backends that evaluate or translate queries themselves implement this.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_prefix(&mut self, field: &str, value: &Value) -> Result<Self::Output, Self::Error>;
    fn visit_range(
        &mut self,
        field: &str,
        bounds: &[(RangeOp, Value)],
    ) -> Result<Self::Output, Self::Error>;

    fn visit_clause(&mut self, clause: &Clause) -> Result<Self::Output, Self::Error> {
        match clause {
            Clause::Prefix { field, value } => self.visit_prefix(field, value),
            Clause::Range { field, bounds } => self.visit_range(field, bounds),
        }
    }
}

struct Entry<'a, V: ?Sized>(&'a str, &'a V);

impl<V: Serialize + ?Sized> Serialize for Entry<'_, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0, self.1)?;
        map.end()
    }
}

struct Bounds<'a>(&'a [(RangeOp, Value)]);

impl Serialize for Bounds<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (op, value) in self.0 {
            map.serialize_entry(op.as_str(), value)?;
        }
        map.end()
    }
}

impl Serialize for Clause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Clause::Prefix { field, value } => {
                Entry("prefix", &Entry(field, value)).serialize(serializer)
            }
            Clause::Range { field, bounds } => {
                Entry("range", &Entry(field, &Bounds(bounds))).serialize(serializer)
            }
        }
    }
}

impl Serialize for StructuredQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Entry("bool", &Entry("must", &self.must)).serialize(serializer)
    }
}

impl Serialize for SortClause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Entry(&self.field, &Entry("order", self.direction.as_str())).serialize(serializer)
    }
}

impl Serialize for SortSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.clauses.len()))?;
        for clause in &self.clauses {
            seq.serialize_element(clause)?;
        }
        seq.end()
    }
}

impl Serialize for SearchRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("query", &self.query)?;
        if !self.sort.is_empty() {
            map.serialize_entry("sort", &self.sort)?;
        }
        if let Some(from) = self.from {
            map.serialize_entry("from", &from)?;
        }
        if let Some(size) = self.size {
            map.serialize_entry("size", &size)?;
        }
        map.serialize_entry("track_total_hits", &true)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDecl, FieldKind, FieldTable, ModelDescriptor};
    use serde_json::json;

    #[derive(Default)]
    struct Person;

    fn field(name: &'static str, kind: FieldKind) -> FieldDecl<Person> {
        FieldDecl::new(name, kind, |_| Ok(Value::Null), |_, _| Ok(()))
    }

    fn people() -> FieldTable<Person> {
        FieldTable::build(
            ModelDescriptor::new("Person")
                .field(field("id", FieldKind::Text).identifier())
                .field(field("name", FieldKind::Text))
                .field(field("age", FieldKind::Integer))
                .field(field("joined", FieldKind::Date).rename("joined_at")),
        )
        .unwrap()
    }

    fn desc(field: &str) -> SortClause {
        SortClause { field: field.into(), direction: SortDirection::Desc }
    }

    fn asc(field: &str) -> SortClause {
        SortClause { field: field.into(), direction: SortDirection::Asc }
    }

    #[test]
    fn empty_filter_matches_all() {
        let query = build_query(&FilterSpec::new());

        assert!(query.is_match_all());
        assert_eq!(serde_json::to_value(&query).unwrap(), json!({ "bool": { "must": [] } }));
    }

    #[test]
    fn scalar_becomes_prefix_clause() {
        let query = build_query(&FilterSpec::new().prefix("name", "al"));

        assert_eq!(
            query.clauses(),
            &[Clause::Prefix { field: "name".into(), value: json!("al") }]
        );
    }

    #[test]
    fn nested_operator_becomes_range_clause() {
        let filter = FilterSpec::from_json(&json!({ "age": { ">=": 18 } })).unwrap();
        let query = build_query(&filter);

        assert_eq!(
            query.clauses(),
            &[Clause::Range { field: "age".into(), bounds: vec![(RangeOp::Gte, json!(18))] }]
        );
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({ "bool": { "must": [ { "range": { "age": { "gte": 18 } } } ] } })
        );
    }

    #[test]
    fn clauses_follow_filter_order() {
        let filter = FilterSpec::from_json(&json!({
            "name": "al",
            "age": { "$gte": 18, "$lt": 65 },
            "city": "Ber"
        }))
        .unwrap();

        let fields = build_query(&filter)
            .clauses()
            .iter()
            .map(|clause| clause.field().to_string())
            .collect::<Vec<_>>();
        assert_eq!(fields, ["name", "age", "city"]);
    }

    #[test]
    fn operator_tokens_strip_leading_marker() {
        assert_eq!(RangeOp::from_token("$gte").unwrap(), RangeOp::Gte);
        assert_eq!(RangeOp::from_token("@lt").unwrap(), RangeOp::Lt);
        assert_eq!(RangeOp::from_token("lte").unwrap(), RangeOp::Lte);
        assert_eq!(RangeOp::from_token(">").unwrap(), RangeOp::Gt);
        assert!(RangeOp::from_token("$between").is_err());
    }

    #[test]
    fn repeated_field_replaces_earlier_constraint() {
        let filter = FilterSpec::new()
            .prefix("name", "al")
            .prefix("age", "1")
            .prefix("name", "bo");

        assert_eq!(filter.len(), 2);
        assert_eq!(filter.get("name"), Some(&Constraint::Prefix(json!("bo"))));
        assert_eq!(filter.iter().next().map(|(field, _)| field), Some("name"));
    }

    #[test]
    fn range_helpers_merge_bounds() {
        let filter = FilterSpec::new()
            .range("age", RangeOp::Gte, 18)
            .range("age", RangeOp::Lt, 65)
            .range("age", RangeOp::Gte, 21);

        assert_eq!(
            filter.get("age"),
            Some(&Constraint::Range(vec![(RangeOp::Gte, json!(21)), (RangeOp::Lt, json!(65))]))
        );
    }

    #[test]
    fn json_filter_rejects_bad_input() {
        assert!(FilterSpec::from_json(&json!(["name"])).is_err());
        assert!(FilterSpec::from_json(&json!({ "age": {} })).is_err());
        assert!(FilterSpec::from_json(&json!({ "age": { "~": 1 } })).is_err());
        assert!(FilterSpec::from_json(&json!({ "name": null })).unwrap().is_empty());
    }

    #[test]
    fn sort_skips_unmarked_text_token() {
        let sort = build_sort("-age,name", &people());

        assert_eq!(sort.clauses(), &[desc("age")]);
    }

    #[test]
    fn sort_on_text_field_collapses_whole_specification() {
        let sort = build_sort("-age,-name", &people());

        assert!(sort.is_empty());
    }

    #[test]
    fn sort_on_identifier_uses_engine_id() {
        let sort = build_sort("+joined_at, -id", &people());

        assert_eq!(sort.clauses(), &[asc("joined_at"), desc(ID_SORT_FIELD)]);
    }

    #[test]
    fn sort_passes_undeclared_fields_through() {
        let sort = build_sort("-age,+salary", &people());

        assert_eq!(
            sort.clauses(),
            [
                SortClause { field: "age".into(), direction: SortDirection::Desc },
                SortClause { field: "salary".into(), direction: SortDirection::Asc },
            ]
        );
        assert!(build_sort("-", &people()).is_empty());
        assert!(build_sort("", &people()).is_empty());
    }

    #[test]
    fn request_renders_engine_body() {
        let table = people();
        let request = SearchRequest::builder()
            .filter(&FilterSpec::new().prefix("name", "al"))
            .sort(build_sort("-age", &table))
            .from(20)
            .size(10)
            .build();

        assert_eq!(
            request.to_json().unwrap(),
            json!({
                "query": { "bool": { "must": [ { "prefix": { "name": "al" } } ] } },
                "sort": [ { "age": { "order": "desc" } } ],
                "from": 20,
                "size": 10,
                "track_total_hits": true
            })
        );
    }
}
