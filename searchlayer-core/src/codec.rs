//! Conversion between typed models and generic documents.
//!
//! The codec never transmits the identifier inside a document body: the identifier addresses the
//! document and travels next to it. [`from_document`] puts it back when decoding.

use serde_json::{Number, Value};

use crate::{
    document::{Document, json_type_name},
    error::{DocumentStoreError, DocumentStoreResult},
    model::{FieldMeta, FieldTable, Model},
};

/// Builds the insert/update body of `model`: every non-identifier field under its wire name.
///
/// # Errors
///
/// Returns [`DocumentStoreError::Serialization`] if a field value cannot be represented as JSON.
pub fn to_document<M>(model: &M, table: &FieldTable<M>) -> DocumentStoreResult<Document> {
    table
        .fields()
        .iter()
        .filter(|field| !field.is_identifier())
        .map(|field| {
            field
                .read(model)
                .map(|value| (field.wire_name().to_string(), value))
        })
        .collect()
}

/// Splits a partial-update map into its body and the identifier it addresses.
///
/// The input is left untouched; the returned body is a copy without the identifier key.
///
/// # Errors
///
/// - [`DocumentStoreError::MissingIdentifier`] when the key is absent, null or empty.
/// - [`DocumentStoreError::InvalidIdentifier`] when the value is not a string.
pub fn to_patch_document(changes: &Document, id_wire_name: &str) -> DocumentStoreResult<(Document, String)> {
    let id = match changes.get(id_wire_name) {
        None | Some(Value::Null) => {
            return Err(DocumentStoreError::MissingIdentifier(id_wire_name.to_string()));
        }
        Some(Value::String(id)) if id.is_empty() => {
            return Err(DocumentStoreError::MissingIdentifier(id_wire_name.to_string()));
        }
        Some(Value::String(id)) => id.clone(),
        Some(other) => {
            return Err(DocumentStoreError::InvalidIdentifier(
                id_wire_name.to_string(),
                format!("found {}", json_type_name(other)),
            ));
        }
    };

    let body = changes
        .iter()
        .filter(|(key, _)| key.as_str() != id_wire_name)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok((body, id))
}

/// Decodes a stored document into a model, injecting `hit_id` into the identifier field.
///
/// Keys without a matching field are ignored, and so are `null` values; the fields they would
/// have set keep their default value.
///
/// # Errors
///
/// Returns [`DocumentStoreError::Decode`] when a value does not fit its field's type.
pub fn from_document<M: Model>(document: Document, hit_id: &str, table: &FieldTable<M>) -> DocumentStoreResult<M> {
    let mut model = M::default();

    if let Some(id_field) = table.identifier() {
        write_identifier(id_field, &mut model, hit_id)?;
    }

    for (key, value) in document {
        if value.is_null() {
            continue;
        }
        match table.by_wire_name(&key) {
            Some(field) if !field.is_identifier() => field.write(&mut model, value)?,
            _ => {}
        }
    }

    Ok(model)
}

/// Reads the identifier of `model` as a document id.
///
/// Returns `Ok(None)` when the identifier is unset (null or empty string). Numeric identifiers
/// are rendered in decimal.
///
/// # Errors
///
/// - [`DocumentStoreError::MissingIdField`] when the model declares no identifier.
/// - [`DocumentStoreError::InvalidIdentifier`] when the value is neither a string nor a number.
pub fn identifier_of<M>(model: &M, table: &FieldTable<M>) -> DocumentStoreResult<Option<String>> {
    let field = table.require_identifier()?;

    match field.read(model)? {
        Value::Null => Ok(None),
        Value::String(id) if id.is_empty() => Ok(None),
        Value::String(id) => Ok(Some(id)),
        Value::Number(id) => Ok(Some(id.to_string())),
        other => Err(DocumentStoreError::InvalidIdentifier(
            field.wire_name().to_string(),
            format!("found {}", json_type_name(&other)),
        )),
    }
}

/// Writes a store-assigned identifier back into `model`.
///
/// # Errors
///
/// Returns [`DocumentStoreError::Decode`] when `id` fits the identifier field neither as a
/// string nor as a number.
pub fn assign_identifier<M>(model: &mut M, id: &str, table: &FieldTable<M>) -> DocumentStoreResult<()> {
    write_identifier(table.require_identifier()?, model, id)
}

// Document ids are strings on the wire; numeric identifiers take the id's decimal form.
fn write_identifier<M>(field: &FieldMeta<M>, model: &mut M, id: &str) -> DocumentStoreResult<()> {
    match field.write(model, Value::String(id.to_string())) {
        Ok(()) => Ok(()),
        Err(err) => match id.parse::<Number>() {
            Ok(number) => field.write(model, Value::Number(number)),
            Err(_) => Err(err),
        },
    }
}
