use crate::value_type::{TypedValue, ValueType};
use fancy_regex::Regex;
use json::Value;

/// Names recognized by [`call`], checked at parse time so that an unknown
/// function name is rejected as a parse error rather than silently
/// evaluating to `Nothing` at query time (RFC 9535 §2.4.3's
/// well-typedness requirement).
pub const KNOWN_FUNCTIONS: &[&str] = &[
    "length", "count", "match", "search", "value", "values", "contains", "subset",
];

/// Evaluates a built-in function call. `length`, `count`, and `value` are
/// the RFC 9535 `ValueType`/`NodesType`-returning core functions; `match`
/// and `search` are its `LogicalType`-returning core functions. `values`,
/// `contains`, and `subset` are supplemented extensions (not in RFC 9535)
/// kept in this same registry for consistency.
pub fn call<'v>(name: &str, args: Vec<TypedValue<'v>>) -> TypedValue<'v> {
    match name {
        "length" => length(args),
        "count" => count(args),
        "match" => regex_test(args, true),
        "search" => regex_test(args, false),
        "value" => value_of(args),
        "values" => values_of(args),
        "contains" => contains(args),
        "subset" => subset(args),
        _ => TypedValue::Value(ValueType::Nothing),
    }
}

/// Coerces a `TypedValue` to a `ValueType`, per the implicit query-to-value
/// conversion RFC 9535 §2.4.2 applies when a `ValueType` parameter receives
/// a query argument: a single-node result passes its value through,
/// anything else (zero or multiple nodes, or a logical) becomes `Nothing`.
fn as_value_type<'v>(tv: TypedValue<'v>) -> ValueType<'v> {
    match tv {
        TypedValue::Value(v) => v,
        TypedValue::Nodes(mut nodes) if nodes.len() == 1 => {
            ValueType::Borrowed(nodes.pop().unwrap().0)
        }
        _ => ValueType::Nothing,
    }
}

fn first_value(mut args: Vec<TypedValue>) -> ValueType {
    as_value_type(args.pop().unwrap_or(TypedValue::Value(ValueType::Nothing)))
}

fn length(args: Vec<TypedValue>) -> TypedValue<'static> {
    let v = first_value(args);
    let n = match v.as_value() {
        Some(Value::String(s)) => Some(s.chars().count() as i64),
        Some(Value::Array(a)) => Some(a.len() as i64),
        Some(Value::Object(o)) => Some(o.len() as i64),
        _ => None,
    };
    TypedValue::Value(match n {
        Some(n) => ValueType::Owned(Value::Integer(n)),
        None => ValueType::Nothing,
    })
}

fn count<'v>(mut args: Vec<TypedValue<'v>>) -> TypedValue<'v> {
    let nodes = match args.pop() {
        Some(TypedValue::Nodes(nodes)) => nodes.len(),
        // A query that matched nothing may arrive already collapsed to a
        // single ValueType::Nothing rather than an empty NodesType.
        Some(TypedValue::Value(ValueType::Nothing)) => 0,
        Some(TypedValue::Value(_)) => 1,
        _ => 0,
    };
    TypedValue::Value(ValueType::Owned(Value::Integer(nodes as i64)))
}

fn value_of<'v>(mut args: Vec<TypedValue<'v>>) -> TypedValue<'v> {
    match args.pop() {
        Some(TypedValue::Nodes(mut nodes)) if nodes.len() == 1 => {
            TypedValue::Value(ValueType::Borrowed(nodes.pop().unwrap().0))
        }
        Some(TypedValue::Value(v)) => TypedValue::Value(v),
        _ => TypedValue::Value(ValueType::Nothing),
    }
}

fn values_of<'v>(mut args: Vec<TypedValue<'v>>) -> TypedValue<'v> {
    match args.pop() {
        Some(TypedValue::Nodes(nodes)) => TypedValue::Nodes(nodes),
        _ => TypedValue::Nodes(Vec::new()),
    }
}

fn as_str(v: &ValueType) -> Option<String> {
    v.as_value().and_then(Value::as_str).map(|s| s.to_string())
}

fn regex_test<'v>(mut args: Vec<TypedValue<'v>>, anchored: bool) -> TypedValue<'v> {
    if args.len() != 2 {
        return TypedValue::Logical(false);
    }
    let pattern_v = as_value_type(args.pop().unwrap());
    let subject_v = as_value_type(args.pop().unwrap());
    let (Some(pattern), Some(subject)) = (as_str(&pattern_v), as_str(&subject_v)) else {
        return TypedValue::Logical(false);
    };
    let pattern = if anchored {
        format!("^(?:{pattern})$")
    } else {
        pattern
    };
    match Regex::new(&pattern) {
        Ok(re) => TypedValue::Logical(re.is_match(&subject).unwrap_or(false)),
        Err(_) => TypedValue::Logical(false),
    }
}

fn contains<'v>(mut args: Vec<TypedValue<'v>>) -> TypedValue<'v> {
    if args.len() != 2 {
        return TypedValue::Logical(false);
    }
    let haystack = args.pop().unwrap();
    let needle = args.pop().unwrap();
    let needle_value = as_value_type(needle).as_value().cloned();
    let Some(needle_value) = needle_value else {
        return TypedValue::Logical(false);
    };
    let found = match haystack {
        TypedValue::Nodes(nodes) => nodes.iter().any(|(v, _)| **v == needle_value),
        TypedValue::Value(v) => match v.as_value() {
            Some(Value::Array(a)) => a.iter().any(|item| *item == needle_value),
            Some(Value::String(s)) => needle_value
                .as_str()
                .map(|needle_s| s.contains(needle_s))
                .unwrap_or(false),
            Some(other) => *other == needle_value,
            None => false,
        },
        TypedValue::Logical(_) => false,
    };
    TypedValue::Logical(found)
}

fn subset<'v>(mut args: Vec<TypedValue<'v>>) -> TypedValue<'v> {
    if args.len() != 2 {
        return TypedValue::Logical(false);
    }
    let superset = args.pop().unwrap();
    let subset = args.pop().unwrap();
    let (TypedValue::Nodes(sub), TypedValue::Nodes(sup)) = (subset, superset) else {
        return TypedValue::Logical(false);
    };
    let is_subset = sub
        .iter()
        .all(|(v, _)| sup.iter().any(|(sv, _)| *sv == *v));
    TypedValue::Logical(is_subset)
}
