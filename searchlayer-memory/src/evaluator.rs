//! Query evaluation for in-memory search.
//!
//! This module evaluates structured queries against stored JSON documents and orders the
//! matches, following the engine's semantics for the clauses the adapter produces.

use std::cmp::Ordering;
use serde_json::Value;

use searchlayer_core::{
    document::Document,
    error::{DocumentStoreError, DocumentStoreResult},
    query::{ID_SORT_FIELD, QueryVisitor, RangeOp, SortDirection, SortSpec, StructuredQuery},
};


/// Comparable view of a JSON value.
///
/// Integers and floats are normalized to `f64`. For range checks values of different types do
/// not compare; sorting uses the total order of [`Comparable::sort_cmp`].
#[derive(Debug, PartialEq)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    String(&'a str),
    /// Arrays and objects take no part in ordering.
    Composite,
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(value) => Comparable::Bool(*value),
            Value::Number(value) => value
                .as_f64()
                .map_or(Comparable::Null, Comparable::Number),
            Value::String(value) => Comparable::String(value),
            Value::Array(_) | Value::Object(_) => Comparable::Composite,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl Comparable<'_> {
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Composite => 4,
        }
    }

    /// Total order for sorting. Values of different types order by type: booleans, then
    /// numbers, then strings.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.total_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Evaluates query clauses against one document.
///
/// Multi-valued fields (arrays) match when any of their elements matches, as in the engine.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Returns whether the document satisfies every clause of `query`.
    pub fn matches(&mut self, query: &StructuredQuery) -> DocumentStoreResult<bool> {
        for clause in query.clauses() {
            if !self.visit_clause(clause)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn values(&self, field: &str) -> Vec<&'a Value> {
        match self.document.get(field) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(value) => vec![value],
        }
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_prefix(&mut self, field: &str, value: &Value) -> Result<Self::Output, Self::Error> {
        let prefix = match value {
            Value::String(prefix) => prefix.clone(),
            Value::Number(_) | Value::Bool(_) => value.to_string(),
            other => {
                return Err(DocumentStoreError::InvalidFilter(format!(
                    "prefix on '{field}' must be a scalar, found {other}"
                )));
            }
        };

        Ok(self
            .values(field)
            .into_iter()
            .any(|item| matches!(item, Value::String(text) if text.starts_with(prefix.as_str()))))
    }

    fn visit_range(&mut self, field: &str, bounds: &[(RangeOp, Value)]) -> Result<Self::Output, Self::Error> {
        Ok(self.values(field).into_iter().any(|item| {
            let item = Comparable::from(item);

            bounds.iter().all(|(op, bound)| {
                match item.partial_cmp(&Comparable::from(bound)) {
                    Some(ordering) => match op {
                        RangeOp::Gt => ordering == Ordering::Greater,
                        RangeOp::Gte => ordering != Ordering::Less,
                        RangeOp::Lt => ordering == Ordering::Less,
                        RangeOp::Lte => ordering != Ordering::Greater,
                    },
                    None => false,
                }
            })
        }))
    }
}

/// Orders two matches by `sort`.
///
/// Documents missing a sort value come last in either direction. [`ID_SORT_FIELD`] sorts by
/// document id.
pub(crate) fn compare(
    sort: &SortSpec,
    (left_id, left): (&str, &Document),
    (right_id, right): (&str, &Document),
) -> Ordering {
    for clause in sort.clauses() {
        let (a, b) = if clause.field == ID_SORT_FIELD {
            (Some(Comparable::String(left_id)), Some(Comparable::String(right_id)))
        } else {
            (sort_value(left, &clause.field), sort_value(right, &clause.field))
        };

        let ordering = match (a, b) {
            (Some(a), Some(b)) => {
                let ordering = a.sort_cmp(&b);
                match clause.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

fn sort_value<'a>(document: &'a Document, field: &str) -> Option<Comparable<'a>> {
    match document.get(field).map(Comparable::from) {
        None | Some(Comparable::Null) | Some(Comparable::Composite) => None,
        value => value,
    }
}
