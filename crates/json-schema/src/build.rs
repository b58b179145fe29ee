//! Schema builder: parses a raw [`Value`] into the [`Schema`] model,
//! building a flat [`Descriptor`] directly instead of a packed keyword
//! tape.

use crate::model::{Descriptor, Schema};
use indexmap::IndexMap;
use json::{Object, Type, Value};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error("schema must be a boolean or an object, found {0:?}")]
    NotASchema(Type),
    #[error("keyword {keyword:?} must be a {expected}")]
    InvalidKeywordType { keyword: &'static str, expected: &'static str },
    #[error("unknown type name {0:?} in \"type\" keyword")]
    InvalidTypeName(String),
    #[error("keyword {keyword:?} must be a non-negative integer")]
    NegativeInteger { keyword: &'static str },
}

pub fn build(raw: &Value) -> Result<Schema, BuildError> {
    match raw {
        Value::Bool(b) => Ok(Schema::Bool(*b)),
        Value::Object(_) => Ok(Schema::Descriptor(Rc::new(build_descriptor(raw)?))),
        other => Err(BuildError::NotASchema(other.kind())),
    }
}

fn build_descriptor(raw: &Value) -> Result<Descriptor, BuildError> {
    let obj = raw.as_object().expect("caller checked object shape");
    let mut d = Descriptor::empty(raw.clone());

    d.id = str_field(obj, "$id")?;
    d.schema_dialect = str_field(obj, "$schema")?;
    d.anchor = str_field(obj, "$anchor")?;
    d.dynamic_anchor = str_field(obj, "$dynamicAnchor")?;
    d.reference = str_field(obj, "$ref")?;
    d.dynamic_reference = str_field(obj, "$dynamicRef")?;
    d.recursive_ref = str_field(obj, "$recursiveRef")?;
    d.recursive_anchor = bool_field(obj, "$recursiveAnchor")?.unwrap_or(false);
    d.comment = str_field(obj, "$comment")?;

    // $defs and the legacy "definitions" keyword share one namespace;
    // $defs entries win on key collision since it's the current keyword.
    let mut defs = IndexMap::new();
    if let Some(legacy) = obj.get("definitions").and_then(Value::as_object) {
        for (k, v) in legacy {
            defs.insert(k.clone(), build(v)?);
        }
    }
    if let Some(current) = obj.get("$defs").and_then(Value::as_object) {
        for (k, v) in current {
            defs.insert(k.clone(), build(v)?);
        }
    }
    d.defs = defs;

    d.all_of = schema_vec(obj, "allOf")?;
    d.any_of = schema_vec(obj, "anyOf")?;
    d.one_of = schema_vec(obj, "oneOf")?;
    d.not = schema_opt(obj, "not")?;
    d.if_ = schema_opt(obj, "if")?;
    d.then = schema_opt(obj, "then")?;
    d.else_ = schema_opt(obj, "else")?;
    d.properties = schema_map(obj, "properties")?;
    d.pattern_properties = schema_map(obj, "patternProperties")?.into_iter().collect();
    d.additional_properties = schema_opt(obj, "additionalProperties")?;
    d.property_names = schema_opt(obj, "propertyNames")?;
    d.prefix_items = schema_vec(obj, "prefixItems")?;
    d.items = schema_opt(obj, "items")?;
    d.contains = schema_opt(obj, "contains")?;

    let mut dependent_schemas = schema_map(obj, "dependentSchemas")?;
    let mut dependent_required: IndexMap<String, Vec<String>> = IndexMap::new();
    if let Some(req) = obj.get("dependentRequired").and_then(Value::as_object) {
        for (k, v) in req {
            dependent_required.insert(k.clone(), string_array(v, "dependentRequired")?);
        }
    }
    // Legacy "dependencies": an array value behaves like
    // dependentRequired, an object/boolean value like dependentSchemas.
    if let Some(deps) = obj.get("dependencies").and_then(Value::as_object) {
        for (k, v) in deps {
            match v {
                Value::Array(_) => {
                    dependent_required.insert(k.clone(), string_array(v, "dependencies")?);
                }
                _ => {
                    dependent_schemas.insert(k.clone(), build(v)?);
                }
            }
        }
    }
    d.dependent_schemas = dependent_schemas;
    d.dependent_required = dependent_required;

    d.unevaluated_properties = schema_opt(obj, "unevaluatedProperties")?;
    d.unevaluated_items = schema_opt(obj, "unevaluatedItems")?;

    d.ty = type_field(obj)?;
    d.enum_ = obj.get("enum").and_then(Value::as_array).map(|a| a.to_vec());
    d.const_ = obj.get("const").cloned();
    d.multiple_of = f64_field(obj, "multipleOf")?;
    d.maximum = f64_field(obj, "maximum")?;
    d.minimum = f64_field(obj, "minimum")?;
    d.exclusive_maximum = f64_field(obj, "exclusiveMaximum")?;
    d.exclusive_minimum = f64_field(obj, "exclusiveMinimum")?;
    d.max_length = u64_field(obj, "maxLength")?;
    d.min_length = u64_field(obj, "minLength")?;
    d.pattern = str_field(obj, "pattern")?;
    d.max_items = u64_field(obj, "maxItems")?;
    d.min_items = u64_field(obj, "minItems")?;
    d.unique_items = bool_field(obj, "uniqueItems")?.unwrap_or(false);
    d.max_contains = u64_field(obj, "maxContains")?;
    d.min_contains = u64_field(obj, "minContains")?;
    d.max_properties = u64_field(obj, "maxProperties")?;
    d.min_properties = u64_field(obj, "minProperties")?;
    d.required = obj
        .get("required")
        .map(|v| string_array(v, "required"))
        .transpose()?
        .unwrap_or_default();

    d.title = str_field(obj, "title")?;
    d.description = str_field(obj, "description")?;
    d.default = obj.get("default").cloned();
    d.deprecated = bool_field(obj, "deprecated")?.unwrap_or(false);
    d.read_only = bool_field(obj, "readOnly")?.unwrap_or(false);
    d.write_only = bool_field(obj, "writeOnly")?.unwrap_or(false);
    d.examples = obj
        .get("examples")
        .and_then(Value::as_array)
        .map(|a| a.to_vec())
        .unwrap_or_default();

    d.format = str_field(obj, "format")?;

    d.content_encoding = str_field(obj, "contentEncoding")?;
    d.content_media_type = str_field(obj, "contentMediaType")?;
    d.content_schema = schema_opt(obj, "contentSchema")?;

    Ok(d)
}

fn str_field(obj: &Object, key: &'static str) -> Result<Option<String>, BuildError> {
    match obj.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(BuildError::InvalidKeywordType { keyword: key, expected: "string" }),
    }
}

fn bool_field(obj: &Object, key: &'static str) -> Result<Option<bool>, BuildError> {
    match obj.get(key) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(BuildError::InvalidKeywordType { keyword: key, expected: "boolean" }),
    }
}

fn f64_field(obj: &Object, key: &'static str) -> Result<Option<f64>, BuildError> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or(BuildError::InvalidKeywordType { keyword: key, expected: "number" }),
    }
}

fn u64_field(obj: &Object, key: &'static str) -> Result<Option<u64>, BuildError> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => {
            let n = v.as_f64().ok_or(BuildError::InvalidKeywordType { keyword: key, expected: "integer" })?;
            if n < 0.0 || n.fract() != 0.0 {
                return Err(BuildError::NegativeInteger { keyword: key });
            }
            Ok(Some(n as u64))
        }
    }
}

fn string_array(v: &Value, keyword: &'static str) -> Result<Vec<String>, BuildError> {
    let arr = v
        .as_array()
        .ok_or(BuildError::InvalidKeywordType { keyword, expected: "array of strings" })?;
    arr.iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or(BuildError::InvalidKeywordType { keyword, expected: "array of strings" })
        })
        .collect()
}

fn type_field(obj: &Object) -> Result<Option<Vec<Type>>, BuildError> {
    let to_type = |s: &str| -> Result<Type, BuildError> {
        match s {
            "null" => Ok(Type::Null),
            "boolean" => Ok(Type::Boolean),
            "integer" => Ok(Type::Integer),
            "number" => Ok(Type::Number),
            "string" => Ok(Type::String),
            "array" => Ok(Type::Array),
            "object" => Ok(Type::Object),
            other => Err(BuildError::InvalidTypeName(other.to_string())),
        }
    };
    match obj.get("type") {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(vec![to_type(s)?])),
        Some(Value::Array(items)) => {
            let types: Result<Vec<Type>, BuildError> = items
                .iter()
                .map(|v| {
                    v.as_str()
                        .ok_or(BuildError::InvalidKeywordType { keyword: "type", expected: "string or array of strings" })
                        .and_then(to_type)
                })
                .collect();
            Ok(Some(types?))
        }
        Some(_) => Err(BuildError::InvalidKeywordType { keyword: "type", expected: "string or array of strings" }),
    }
}

fn schema_vec(obj: &Object, key: &'static str) -> Result<Vec<Schema>, BuildError> {
    match obj.get(key) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(build).collect(),
        Some(_) => Err(BuildError::InvalidKeywordType { keyword: key, expected: "array of schemas" }),
    }
}

fn schema_map(obj: &Object, key: &'static str) -> Result<IndexMap<String, Schema>, BuildError> {
    match obj.get(key) {
        None => Ok(IndexMap::new()),
        Some(Value::Object(fields)) => {
            fields.iter().map(|(k, v)| Ok((k.clone(), build(v)?))).collect()
        }
        Some(_) => Err(BuildError::InvalidKeywordType { keyword: key, expected: "object of schemas" }),
    }
}

fn schema_opt(obj: &Object, key: &'static str) -> Result<Option<Schema>, BuildError> {
    match obj.get(key) {
        None => Ok(None),
        Some(v) => Ok(Some(build(v)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use json::jsonv;

    #[test]
    fn builds_boolean_schemas() {
        assert!(matches!(build(&jsonv!(true)).unwrap(), Schema::Bool(true)));
        assert!(matches!(build(&jsonv!(false)).unwrap(), Schema::Bool(false)));
    }

    #[test]
    fn builds_object_descriptor_with_nested_properties() {
        let raw = jsonv!({
            "type": "object",
            "properties": {"n": {"type": "integer", "default": 0}},
            "required": ["name"],
        });
        let schema = build(&raw).unwrap();
        let d = schema.as_descriptor().unwrap();
        assert_eq!(d.ty, Some(vec![Type::Object]));
        assert_eq!(d.required, vec!["name".to_string()]);
        let n_schema = d.properties.get("n").unwrap().as_descriptor().unwrap();
        assert_eq!(n_schema.default, Some(jsonv!(0)));
    }

    #[test]
    fn rejects_unknown_type_name() {
        let raw = jsonv!({"type": "weird"});
        assert!(matches!(build(&raw), Err(BuildError::InvalidTypeName(_))));
    }

    #[test]
    fn legacy_dependencies_splits_into_required_and_schemas() {
        let raw = jsonv!({
            "dependencies": {
                "credit_card": ["billing_address"],
                "shipping": {"required": ["address"]},
            }
        });
        let d = build(&raw).unwrap();
        let d = d.as_descriptor().unwrap();
        assert_eq!(
            d.dependent_required.get("credit_card"),
            Some(&vec!["billing_address".to_string()])
        );
        assert!(d.dependent_schemas.contains_key("shipping"));
    }
}
