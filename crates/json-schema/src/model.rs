//! Schema Model: a 2020-12 keyword set plus the `raw` companion that keeps
//! the original document available for `$ref` targets pointing into
//! keywords this crate doesn't interpret.
//!
//! Laid out as a flat, directly-addressable struct rather than a packed
//! enum tape: every field here is just an `Option`/`Vec` a tree-walking
//! validator reads straight off, with no intermediate compilation pass.

use indexmap::IndexMap;
use json::{Type, Value};
use std::rc::Rc;

/// A Schema is either the trivial boolean form (`true` accepts everything,
/// `false` rejects everything) or a full keyword descriptor.
///
/// The descriptor variant holds an `Rc` rather than a `Box` so that a
/// [`crate::resource::Resource`] can hold its own `Schema` handle to a
/// sub-schema without deep-cloning the keyword tree or borrowing from the
/// document that produced it.
#[derive(Debug, Clone)]
pub enum Schema {
    Bool(bool),
    Descriptor(Rc<Descriptor>),
}

impl Schema {
    pub fn accepts_everything() -> Schema {
        Schema::Bool(true)
    }

    pub fn as_descriptor(&self) -> Option<&Descriptor> {
        match self {
            Schema::Descriptor(d) => Some(d),
            Schema::Bool(_) => None,
        }
    }

    /// The original JSON this schema was built from.
    pub fn raw(&self) -> &Value {
        match self {
            Schema::Bool(true) => &TRUE_RAW,
            Schema::Bool(false) => &FALSE_RAW,
            Schema::Descriptor(d) => &d.raw,
        }
    }
}

static TRUE_RAW: Value = Value::Bool(true);
static FALSE_RAW: Value = Value::Bool(false);

/// Every sub-schema-valued keyword, flattened into one struct. Every
/// field is independently optional — absence means "this keyword was not
/// present", not "empty schema".
#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    // --- Core vocabulary ---
    pub id: Option<String>,
    pub schema_dialect: Option<String>,
    pub anchor: Option<String>,
    pub dynamic_anchor: Option<String>,
    pub reference: Option<String>,
    pub dynamic_reference: Option<String>,
    /// Draft 2019-09 legacy alias, resolved through the same dynamic-scope
    /// machinery as `$dynamicRef` with an implicit empty anchor name.
    pub recursive_ref: Option<String>,
    pub recursive_anchor: bool,
    pub defs: IndexMap<String, Schema>,
    pub comment: Option<String>,

    // --- Applicator vocabulary ---
    pub all_of: Vec<Schema>,
    pub any_of: Vec<Schema>,
    pub one_of: Vec<Schema>,
    pub not: Option<Schema>,
    pub if_: Option<Schema>,
    pub then: Option<Schema>,
    pub else_: Option<Schema>,
    pub properties: IndexMap<String, Schema>,
    pub pattern_properties: Vec<(String, Schema)>,
    pub additional_properties: Option<Schema>,
    pub property_names: Option<Schema>,
    pub prefix_items: Vec<Schema>,
    pub items: Option<Schema>,
    pub contains: Option<Schema>,
    pub dependent_schemas: IndexMap<String, Schema>,

    // --- Unevaluated vocabulary ---
    pub unevaluated_properties: Option<Schema>,
    pub unevaluated_items: Option<Schema>,

    // --- Validation vocabulary ---
    pub ty: Option<Vec<Type>>,
    pub enum_: Option<Vec<Value>>,
    pub const_: Option<Value>,
    pub multiple_of: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub minimum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub max_length: Option<u64>,
    pub min_length: Option<u64>,
    pub pattern: Option<String>,
    pub max_items: Option<u64>,
    pub min_items: Option<u64>,
    pub unique_items: bool,
    pub max_contains: Option<u64>,
    pub min_contains: Option<u64>,
    pub max_properties: Option<u64>,
    pub min_properties: Option<u64>,
    pub required: Vec<String>,
    pub dependent_required: IndexMap<String, Vec<String>>,

    // --- Metadata vocabulary ---
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub deprecated: bool,
    pub read_only: bool,
    pub write_only: bool,
    pub examples: Vec<Value>,

    // --- Format vocabulary ---
    pub format: Option<String>,

    // --- Content vocabulary (annotation only) ---
    pub content_encoding: Option<String>,
    pub content_media_type: Option<String>,
    pub content_schema: Option<Schema>,

    /// The original schema object, preserved so `$ref`s into keywords this
    /// crate doesn't model (vendor extensions, `examples`, ...) still
    /// resolve.
    pub raw: Value,
}

impl Descriptor {
    pub fn empty(raw: Value) -> Descriptor {
        Descriptor {
            raw,
            ..Default::default()
        }
    }
}
