use indexmap::IndexMap;
use std::hash::{Hash, Hasher};

/// `Object` is an ordered mapping from property name to [`Value`].
///
/// Iteration order follows insertion order (via [`IndexMap`]), matching the
/// corpus's general preference for `indexmap`/`serde_json`'s `preserve_order`
/// feature over a plain `BTreeMap`. Per the data model, external callers must
/// not rely on this order being anything but stable within a single run.
pub type Object = IndexMap<String, Value>;

/// `Value` is the tagged JSON value model shared by every other subsystem in
/// this workspace: Pointer/Location navigate it, Patch/Merge rewrite it, and
/// Schema validates it.
///
/// `Integer` and `Float` are always distinct: `Value::Integer(1)` is never
/// equal to `Value::Float(1.0)`, matching RFC 6902 `test` semantics and the
/// JSON Schema `type` keyword's distinction between `integer` and `number`.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(Object),
}

/// The seven type names a [`Value`] classifies as. `Number` only ever
/// results from schema-context classification (`Type::Number` subsumes
/// `Type::Integer`); `Value::kind` never returns it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl Type {
    pub fn name(self) -> &'static str {
        match self {
            Type::Null => "null",
            Type::Boolean => "boolean",
            Type::Integer => "integer",
            Type::Number => "number",
            Type::String => "string",
            Type::Array => "array",
            Type::Object => "object",
        }
    }
}

impl Value {
    pub fn null() -> Value {
        Value::Null
    }

    pub fn array() -> Value {
        Value::Array(Vec::new())
    }

    pub fn object() -> Value {
        Value::Object(Object::new())
    }

    /// Classifies this value into one of the seven concrete JSON types.
    /// Never returns [`Type::Number`] — that classification only exists for
    /// schema `type` keyword matching, via [`Value::is_a`].
    pub fn kind(&self) -> Type {
        match self {
            Value::Null => Type::Null,
            Value::Bool(_) => Type::Boolean,
            Value::Integer(_) => Type::Integer,
            Value::Float(_) => Type::Number,
            Value::String(_) => Type::String,
            Value::Array(_) => Type::Array,
            Value::Object(_) => Type::Object,
        }
    }

    /// Returns true if this value satisfies the schema-context type `ty`,
    /// where `number` subsumes `integer` but not vice versa.
    pub fn is_a(&self, ty: Type) -> bool {
        match (self.kind(), ty) {
            (k, t) if k == t => true,
            (Type::Integer, Type::Number) => true,
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Returns this value as an `f64` if it is numeric (integer or float).
    /// Used by the schema validator's numeric keywords, which must compare
    /// across the integer/float boundary without spurious overflow.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Number of direct children: array length, object size, or zero for a
    /// scalar. Used by the path evaluator's `length()` function for arrays
    /// and objects (string length is the code-point count, handled
    /// separately).
    pub fn child_count(&self) -> usize {
        match self {
            Value::Array(a) => a.len(),
            Value::Object(o) => o.len(),
            _ => 0,
        }
    }

    /// Depth-first iterator over every descendant value (not including
    /// `self`), in document order. Backs the path evaluator's descendant
    /// segment and the schema builder's cycle-free traversal assumptions.
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack = Vec::new();
        push_children(self, &mut stack);
        Descendants { stack }
    }
}

fn push_children<'a>(v: &'a Value, stack: &mut Vec<&'a Value>) {
    match v {
        Value::Array(items) => {
            for item in items.iter().rev() {
                stack.push(item);
            }
        }
        Value::Object(fields) => {
            for (_, v) in fields.iter().rev() {
                stack.push(v);
            }
        }
        _ => {}
    }
}

/// Iterator produced by [`Value::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Value>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<&'a Value> {
        let top = self.stack.pop()?;
        push_children(top, &mut self.stack);
        Some(top)
    }
}

/// Structural equality: object equality is key-set and pairwise-value based
/// (order independent); `Integer` and `Float` are never equal to one
/// another, even when numerically identical.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k).map_or(false, |bv| bv == v))
            }
            _ => false,
        }
    }
}
impl Eq for Value {}

/// Canonical, order-independent hash: an object's hash is the XOR of its
/// per-field hashes, so `{"a":1,"b":2}` and `{"b":2,"a":1}` hash identically
/// even though their `IndexMap` iteration orders differ.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Integer(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            Value::Float(f) => {
                3u8.hash(state);
                f.to_bits().hash(state);
            }
            Value::String(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            Value::Array(a) => {
                5u8.hash(state);
                a.len().hash(state);
                for v in a {
                    v.hash(state);
                }
            }
            Value::Object(o) => {
                6u8.hash(state);
                o.len().hash(state);
                let mut acc: u64 = 0;
                for (k, v) in o {
                    let mut h = std::collections::hash_map::DefaultHasher::new();
                    k.hash(&mut h);
                    v.hash(&mut h);
                    acc ^= h.finish();
                }
                acc.hash(state);
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::Array(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => {
                Value::Object(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> serde_json::Value {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Integer(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(a) => serde_json::Value::Array(a.into_iter().map(Into::into).collect()),
            Value::Object(o) => {
                serde_json::Value::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(a) => serde::Serialize::serialize(a, serializer),
            Value::Object(o) => serde::Serialize::serialize(o, serializer),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from(raw))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}
impl From<i64> for Value {
    fn from(i: i64) -> Value {
        Value::Integer(i)
    }
}
impl From<f64> for Value {
    fn from(f: f64) -> Value {
        Value::Float(f)
    }
}
impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::String(s)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::String(s.to_string())
    }
}
impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Value {
        Value::Array(v)
    }
}

/// Convenience macro mirroring `serde_json::json!`, used pervasively in this
/// workspace's tests: builds a `serde_json::Value` from the literal and
/// converts it through `Value::from`.
#[macro_export]
macro_rules! jsonv {
    ($($tt:tt)*) => {
        $crate::Value::from(serde_json::json!($($tt)*))
    };
}
