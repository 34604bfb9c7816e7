//! Model declarations and field metadata resolution.
//!
//! A [`Model`] describes its own shape through a [`ModelDescriptor`]: an ordered list of
//! [`FieldDecl`]s, each carrying the declared field name, the wire name used in documents and
//! filters, a [`FieldKind`], and a pair of accessor functions. The descriptor is usually generated
//! with `#[derive(Model)]`, but it can be written by hand:
//!
//! ```ignore
//! use searchlayer_core::model::{FieldDecl, FieldKind, Model, ModelDescriptor};
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! pub struct User {
//!     pub id: String,
//!     pub name: String,
//!     pub age: i64,
//! }
//!
//! impl Model for User {
//!     fn index_name() -> &'static str {
//!         "users"
//!     }
//!
//!     fn declare() -> ModelDescriptor<Self> {
//!         ModelDescriptor::new("User")
//!             .field(
//!                 FieldDecl::new(
//!                     "id",
//!                     FieldKind::Text,
//!                     |m: &User| serde_json::to_value(&m.id),
//!                     |m: &mut User, v| { m.id = serde_json::from_value(v)?; Ok(()) },
//!                 )
//!                 .identifier(),
//!             )
//!             .field(FieldDecl::new(
//!                 "name",
//!                 FieldKind::Text,
//!                 |m: &User| serde_json::to_value(&m.name),
//!                 |m: &mut User, v| { m.name = serde_json::from_value(v)?; Ok(()) },
//!             ))
//! #           .field(FieldDecl::new(
//! #               "age",
//! #               FieldKind::Integer,
//! #               |m: &User| serde_json::to_value(&m.age),
//! #               |m: &mut User, v| { m.age = serde_json::from_value(v)?; Ok(()) },
//! #           ))
//!     }
//! }
//! ```
//!
//! [`resolve`] turns a descriptor into a [`FieldTable`] exactly once per model type and hands out
//! shared references to it afterwards.

use serde_json::Value;
use std::{
    any::{Any, TypeId},
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    fmt,
    sync::{Arc, OnceLock, PoisonError, RwLock},
};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Reads one field of a model as a JSON value.
pub type Getter<M> = fn(&M) -> serde_json::Result<Value>;

/// Assigns a JSON value to one field of a model.
pub type Setter<M> = fn(&mut M, Value) -> serde_json::Result<()>;

/// Trait implemented by every type that can be stored in and loaded from a search index.
///
/// Models must be default-constructible: decoding starts from `Default::default()` and
/// overwrites the fields present in the stored document.
pub trait Model: Default + Send + Sync + 'static {
    /// Returns the name of the index this model is stored in.
    fn index_name() -> &'static str;

    /// Returns the declared shape of this model.
    ///
    /// This is called once per process by [`resolve`]; the result is cached.
    fn declare() -> ModelDescriptor<Self>;
}

/// The declared storage kind of a field.
///
/// Only [`FieldKind::Text`] has behavioral consequences today: text fields other than the
/// identifier are not sortable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Free text (strings, UUIDs).
    Text,
    /// Whole numbers.
    Integer,
    /// Floating point numbers.
    Float,
    /// Booleans.
    Boolean,
    /// Dates and timestamps.
    Date,
    /// Arrays and sets.
    Sequence,
    /// Nested objects and maps.
    Nested,
    /// Anything else, such as raw JSON values.
    Unknown,
}

impl FieldKind {
    /// Returns `true` for free-text fields.
    pub fn is_text(self) -> bool {
        matches!(self, FieldKind::Text)
    }

    /// Parses a kind from its lowercase name (`"text"`, `"integer"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "text" => FieldKind::Text,
            "integer" => FieldKind::Integer,
            "float" => FieldKind::Float,
            "boolean" => FieldKind::Boolean,
            "date" => FieldKind::Date,
            "sequence" => FieldKind::Sequence,
            "nested" => FieldKind::Nested,
            "unknown" => FieldKind::Unknown,
            _ => return None,
        })
    }
}

/// Maps a Rust field type to its [`FieldKind`].
///
/// Implemented for the common scalar, date, collection and map types. Types without an
/// implementation can still be used with `#[derive(Model)]` by naming the kind explicitly with
/// `#[model(kind = "nested")]`.
pub trait FieldType {
    const KIND: FieldKind;
}

macro_rules! impl_field_type {
    ($kind:ident => $($ty:ty),+ $(,)?) => {
        $(impl FieldType for $ty {
            const KIND: FieldKind = FieldKind::$kind;
        })+
    };
}

impl_field_type!(Text => String, char, uuid::Uuid);
impl_field_type!(Integer => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
impl_field_type!(Float => f32, f64);
impl_field_type!(Boolean => bool);
impl_field_type!(Date => chrono::NaiveDate, chrono::NaiveDateTime);
impl_field_type!(Nested => serde_json::Map<String, Value>);
impl_field_type!(Unknown => Value);

impl<Tz: chrono::TimeZone> FieldType for chrono::DateTime<Tz> {
    const KIND: FieldKind = FieldKind::Date;
}

impl<T: FieldType> FieldType for Option<T> {
    const KIND: FieldKind = T::KIND;
}

impl<T: FieldType> FieldType for Box<T> {
    const KIND: FieldKind = T::KIND;
}

impl<T> FieldType for Vec<T> {
    const KIND: FieldKind = FieldKind::Sequence;
}

impl<T> FieldType for HashSet<T> {
    const KIND: FieldKind = FieldKind::Sequence;
}

impl<T> FieldType for BTreeSet<T> {
    const KIND: FieldKind = FieldKind::Sequence;
}

impl<K, V> FieldType for HashMap<K, V> {
    const KIND: FieldKind = FieldKind::Nested;
}

impl<K, V> FieldType for BTreeMap<K, V> {
    const KIND: FieldKind = FieldKind::Nested;
}

/// Declaration of a single model field.
pub struct FieldDecl<M> {
    name: &'static str,
    wire_name: &'static str,
    kind: FieldKind,
    identifier: bool,
    get: Getter<M>,
    set: Setter<M>,
}

impl<M> FieldDecl<M> {
    /// Declares a field whose wire name equals its declared name.
    pub fn new(name: &'static str, kind: FieldKind, get: Getter<M>, set: Setter<M>) -> Self {
        Self { name, wire_name: name, kind, identifier: false, get, set }
    }

    /// Sets the wire name used in documents, filters and sort expressions.
    pub fn rename(mut self, wire_name: &'static str) -> Self {
        self.wire_name = wire_name;
        self
    }

    /// Marks this field as the model's identifier.
    pub fn identifier(mut self) -> Self {
        self.identifier = true;
        self
    }
}

impl<M> Clone for FieldDecl<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            wire_name: self.wire_name,
            kind: self.kind,
            identifier: self.identifier,
            get: self.get,
            set: self.set,
        }
    }
}

impl<M> fmt::Debug for FieldDecl<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDecl")
            .field("name", &self.name)
            .field("wire_name", &self.wire_name)
            .field("kind", &self.kind)
            .field("identifier", &self.identifier)
            .finish()
    }
}

/// The declared shape of a model type: its name and ordered fields.
#[derive(Debug, Clone)]
pub struct ModelDescriptor<M> {
    type_name: &'static str,
    fields: Vec<FieldDecl<M>>,
}

impl<M> ModelDescriptor<M> {
    /// Creates an empty descriptor for the named type.
    pub fn new(type_name: &'static str) -> Self {
        Self { type_name, fields: Vec::new() }
    }

    /// Appends a field declaration. Fields keep their declaration order.
    pub fn field(mut self, field: FieldDecl<M>) -> Self {
        self.fields.push(field);
        self
    }
}

/// A resolved field: a declaration plus its position in the model.
pub struct FieldMeta<M> {
    index: usize,
    model: &'static str,
    decl: FieldDecl<M>,
}

impl<M> FieldMeta<M> {
    /// Position of the field in declaration order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The field's declared (Rust) name.
    pub fn name(&self) -> &'static str {
        self.decl.name
    }

    /// The field's externally visible name.
    pub fn wire_name(&self) -> &'static str {
        self.decl.wire_name
    }

    /// The field's declared storage kind.
    pub fn kind(&self) -> FieldKind {
        self.decl.kind
    }

    /// Whether this field is the model's identifier.
    pub fn is_identifier(&self) -> bool {
        self.decl.identifier
    }

    /// Reads the field's current value from `model`.
    pub fn read(&self, model: &M) -> DocumentStoreResult<Value> {
        (self.decl.get)(model).map_err(|e| {
            DocumentStoreError::Serialization(format!(
                "field '{}' of {}: {}",
                self.decl.wire_name, self.model, e
            ))
        })
    }

    /// Assigns `value` to the field. A value of the wrong JSON shape is a decode error.
    pub fn write(&self, model: &mut M, value: Value) -> DocumentStoreResult<()> {
        (self.decl.set)(model, value).map_err(|e| DocumentStoreError::Decode {
            model: self.model,
            field: self.decl.wire_name.to_string(),
            reason: e.to_string(),
        })
    }
}

impl<M> fmt::Debug for FieldMeta<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMeta")
            .field("index", &self.index)
            .field("decl", &self.decl)
            .finish()
    }
}

/// The resolved, immutable field table of a model type.
pub struct FieldTable<M> {
    model: &'static str,
    fields: Vec<FieldMeta<M>>,
    id: Option<usize>,
    by_wire: HashMap<&'static str, usize>,
}

impl<M> FieldTable<M> {
    /// Builds a table from a descriptor without consulting the cache.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidModel`] when more than one field is marked as the
    /// identifier or two fields share a wire name.
    pub fn build(descriptor: ModelDescriptor<M>) -> DocumentStoreResult<Self> {
        let model = descriptor.type_name;
        let mut id = None;
        let mut by_wire = HashMap::with_capacity(descriptor.fields.len());
        let mut fields = Vec::with_capacity(descriptor.fields.len());

        for (index, decl) in descriptor.fields.into_iter().enumerate() {
            if decl.identifier {
                if let Some(previous) = id.replace(index) {
                    let previous: &FieldMeta<M> = &fields[previous];
                    return Err(DocumentStoreError::InvalidModel(
                        model,
                        format!(
                            "fields '{}' and '{}' are both marked as identifier",
                            previous.name(),
                            decl.name
                        ),
                    ));
                }
            }
            if by_wire.insert(decl.wire_name, index).is_some() {
                return Err(DocumentStoreError::InvalidModel(
                    model,
                    format!("wire name '{}' is declared twice", decl.wire_name),
                ));
            }
            fields.push(FieldMeta { index, model, decl });
        }

        Ok(Self { model, fields, id, by_wire })
    }

    /// The model's type name, as declared.
    pub fn model_name(&self) -> &'static str {
        self.model
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> &[FieldMeta<M>] {
        &self.fields
    }

    /// The identifier field, if the model declares one.
    pub fn identifier(&self) -> Option<&FieldMeta<M>> {
        self.id.map(|index| &self.fields[index])
    }

    /// The identifier field, or a configuration error when the model declares none.
    pub fn require_identifier(&self) -> DocumentStoreResult<&FieldMeta<M>> {
        self.identifier()
            .ok_or(DocumentStoreError::MissingIdField(self.model))
    }

    /// Looks a field up by its wire name.
    pub fn by_wire_name(&self, wire_name: &str) -> Option<&FieldMeta<M>> {
        self.by_wire
            .get(wire_name)
            .map(|index| &self.fields[*index])
    }

    /// Looks a field up by its declared (Rust) name.
    pub fn by_name(&self, name: &str) -> Option<&FieldMeta<M>> {
        self.fields
            .iter()
            .find(|field| field.name() == name)
    }

    /// Looks a field up by its position in declaration order.
    pub fn by_index(&self, index: usize) -> Option<&FieldMeta<M>> {
        self.fields.get(index)
    }
}

impl<M> fmt::Debug for FieldTable<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldTable")
            .field("model", &self.model)
            .field("fields", &self.fields)
            .field("id", &self.id)
            .finish()
    }
}

type TableCache = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

fn table_cache() -> &'static TableCache {
    static CACHE: OnceLock<TableCache> = OnceLock::new();
    CACHE.get_or_init(Default::default)
}

/// Returns the field table of `M`, building it on first use.
///
/// The table is built at most once per process; concurrent first callers wait for the builder
/// and then share the same [`Arc`].
///
/// # Errors
///
/// Propagates [`FieldTable::build`] errors. Failed builds are not cached.
pub fn resolve<M: Model>() -> DocumentStoreResult<Arc<FieldTable<M>>> {
    let key = TypeId::of::<M>();

    let cached = table_cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned();
    if let Some(entry) = cached {
        return downcast_table(entry);
    }

    let mut tables = table_cache()
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(entry) = tables.get(&key).cloned() {
        return downcast_table(entry);
    }

    let table = Arc::new(FieldTable::build(M::declare())?);
    tables.insert(key, table.clone());

    Ok(table)
}

fn downcast_table<M: Model>(entry: Arc<dyn Any + Send + Sync>) -> DocumentStoreResult<Arc<FieldTable<M>>> {
    entry.downcast::<FieldTable<M>>().map_err(|_| {
        DocumentStoreError::InvalidModel(
            std::any::type_name::<M>(),
            "cached field table belongs to another type".to_string(),
        )
    })
}
