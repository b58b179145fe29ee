use crate::ast::*;
use crate::functions;
use crate::value_type::{TypedValue, ValueType};
use json::{Location, Value};

/// A node produced by query evaluation: the value together with the
/// [`Location`] it was found at, relative to the document root the query
/// was run against.
pub type NodeList<'v> = Vec<(&'v Value, Location)>;

/// Evaluates `query` against `root`, returning every matching node in the
/// document order RFC 9535 §2.5 prescribes (child-segment selectors are
/// applied left to right per node; descendant segments visit a node before
/// its descendants).
pub fn evaluate<'v>(query: &Query, root: &'v Value) -> NodeList<'v> {
    let mut current = vec![(root, Location::root())];
    for segment in &query.segments {
        current = step(segment, &current, root);
    }
    current
}

fn step<'v>(segment: &Segment, nodes: &NodeList<'v>, root: &'v Value) -> NodeList<'v> {
    let mut out = Vec::new();
    match segment {
        Segment::Child(selectors) => {
            for (value, loc) in nodes {
                for sel in selectors {
                    out.extend(apply_selector(sel, value, loc, root));
                }
            }
        }
        Segment::Descendant(selectors) => {
            for (value, loc) in nodes {
                for (dvalue, dloc) in descendants_preorder(value, loc) {
                    for sel in selectors {
                        out.extend(apply_selector(sel, dvalue, &dloc, root));
                    }
                }
            }
        }
    }
    out
}

/// `(self, descendant, descendant, ...)` in preorder, mirroring
/// `Value::descendants` but threading the `Location` of each node alongside
/// it (the untyped iterator in the `json` crate has no location to offer).
fn descendants_preorder<'v>(value: &'v Value, loc: &Location) -> Vec<(&'v Value, Location)> {
    let mut out = vec![(value, loc.clone())];
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                out.extend(descendants_preorder(item, &loc.push_index(i as i64)));
            }
        }
        Value::Object(fields) => {
            for (k, v) in fields {
                out.extend(descendants_preorder(v, &loc.push_member(k.clone())));
            }
        }
        _ => {}
    }
    out
}

fn apply_selector<'v>(
    sel: &Selector,
    value: &'v Value,
    loc: &Location,
    root: &'v Value,
) -> NodeList<'v> {
    match sel {
        Selector::Name(name) => match value.as_object().and_then(|o| o.get(name)) {
            Some(v) => vec![(v, loc.push_member(name.clone()))],
            None => Vec::new(),
        },
        Selector::Wildcard => match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (v, loc.push_index(i as i64)))
                .collect(),
            Value::Object(fields) => fields
                .iter()
                .map(|(k, v)| (v, loc.push_member(k.clone())))
                .collect(),
            _ => Vec::new(),
        },
        Selector::Index(i) => match value.as_array() {
            Some(items) => resolve_index(*i, items.len())
                .map(|idx| vec![(&items[idx], loc.push_index(idx as i64))])
                .unwrap_or_default(),
            None => Vec::new(),
        },
        Selector::Slice { start, end, step } => match value.as_array() {
            Some(items) => slice_indices(items.len(), *start, *end, *step)
                .into_iter()
                .map(|idx| (&items[idx], loc.push_index(idx as i64)))
                .collect(),
            None => Vec::new(),
        },
        Selector::Filter(expr) => {
            let candidates: Vec<(&'v Value, Location)> = match value {
                Value::Array(items) => items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (v, loc.push_index(i as i64)))
                    .collect(),
                Value::Object(fields) => fields
                    .iter()
                    .map(|(k, v)| (v, loc.push_member(k.clone())))
                    .collect(),
                _ => Vec::new(),
            };
            candidates
                .into_iter()
                .filter(|(v, _)| eval_filter(expr, v, root))
                .collect()
        }
    }
}

/// Resolves an RFC 9535 index selector (negative indices count from the
/// end) against an array of `len` elements; `None` when out of bounds.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        let i = index as usize;
        (i < len).then_some(i)
    } else {
        let from_end = len as i64 + index;
        (from_end >= 0).then_some(from_end as usize)
    }
}

/// RFC 9535 §2.3.4's slice normalization algorithm: negative `start`/`end`
/// are rebased against `len`, then clamped, with the iteration direction
/// determined by the sign of `step` (default `1`; `step == 0` selects
/// nothing).
fn slice_indices(len: usize, start: Option<i64>, end: Option<i64>, step: Option<i64>) -> Vec<usize> {
    let len_i = len as i64;
    let step = step.unwrap_or(1);
    if step == 0 {
        return Vec::new();
    }

    let normalize = |v: i64| -> i64 {
        if v >= 0 {
            v
        } else {
            len_i + v
        }
    };

    let mut out = Vec::new();
    if step > 0 {
        let lower = start.map(normalize).unwrap_or(0).clamp(0, len_i);
        let upper = end.map(normalize).unwrap_or(len_i).clamp(0, len_i);
        let mut i = lower;
        while i < upper {
            out.push(i as usize);
            i += step;
        }
    } else {
        let lower = start.map(normalize).unwrap_or(len_i - 1).clamp(-1, len_i - 1);
        let upper = end.map(normalize).unwrap_or(-1).clamp(-1, len_i - 1);
        let mut i = lower;
        while i > upper {
            if i >= 0 {
                out.push(i as usize);
            }
            i += step;
        }
    }
    out
}

/// Evaluates a filter-selector predicate with `@` bound to `current`.
pub fn eval_filter(expr: &FilterExpr, current: &Value, root: &Value) -> bool {
    match expr {
        FilterExpr::Not(inner) => !eval_filter(inner, current, root),
        FilterExpr::And(l, r) => eval_filter(l, current, root) && eval_filter(r, current, root),
        FilterExpr::Or(l, r) => eval_filter(l, current, root) || eval_filter(r, current, root),
        FilterExpr::Compare(l, op, r) => {
            let left = eval_comparable(l, current, root);
            let right = eval_comparable(r, current, root);
            compare(left.as_value(), *op, right.as_value())
        }
        FilterExpr::Test { query, negated } => {
            let truth = match eval_test_query(query, current, root) {
                TypedValue::Nodes(nodes) => !nodes.is_empty(),
                TypedValue::Logical(b) => b,
                TypedValue::Value(v) => v.truthy_as_logical(),
            };
            if *negated {
                !truth
            } else {
                truth
            }
        }
    }
}

fn eval_comparable<'v>(c: &Comparable, current: &'v Value, root: &'v Value) -> ValueType<'v> {
    match c {
        Comparable::Literal(lit) => ValueType::Owned(literal_to_value(lit)),
        Comparable::SingularQuery(tq) => match eval_test_query(tq, current, root) {
            TypedValue::Value(v) => v,
            TypedValue::Nodes(mut nodes) if nodes.len() == 1 => {
                ValueType::Borrowed(nodes.pop().unwrap().0)
            }
            _ => ValueType::Nothing,
        },
        Comparable::Function(f) => match eval_function(f, current, root) {
            TypedValue::Value(v) => v,
            _ => ValueType::Nothing,
        },
    }
}

fn eval_test_query<'v>(tq: &TestQuery, current: &'v Value, root: &'v Value) -> TypedValue<'v> {
    match tq {
        TestQuery::Relative(q) => TypedValue::Nodes(evaluate(q, current)),
        TestQuery::Absolute(q) => TypedValue::Nodes(evaluate(q, root)),
        TestQuery::Function(f) => eval_function(f, current, root),
    }
}

fn eval_function<'v>(f: &FunctionCall, current: &'v Value, root: &'v Value) -> TypedValue<'v> {
    let args = f
        .args
        .iter()
        .map(|arg| eval_function_arg(arg, current, root))
        .collect();
    functions::call(&f.name, args)
}

fn eval_function_arg<'v>(arg: &FunctionArg, current: &'v Value, root: &'v Value) -> TypedValue<'v> {
    match arg {
        FunctionArg::Literal(lit) => TypedValue::Value(ValueType::Owned(literal_to_value(lit))),
        FunctionArg::Query(tq) => eval_test_query(tq, current, root),
        FunctionArg::Filter(expr) => TypedValue::Logical(eval_filter(expr, current, root)),
    }
}

fn literal_to_value(lit: &Literal) -> Value {
    match lit {
        Literal::String(s) => Value::String(s.clone()),
        Literal::Number(n) => {
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                Value::Integer(*n as i64)
            } else {
                Value::Float(*n)
            }
        }
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

/// Numeric equality crosses the Integer/Float tag boundary (`1 == 1.0` is
/// true in JSONPath filter comparisons, unlike [`Value`]'s own `PartialEq`,
/// which is intentionally stricter for patch/schema `test`/`const`
/// semantics).
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(left: Option<&Value>, op: CompareOp, right: Option<&Value>) -> bool {
    match (left, right) {
        (None, None) => matches!(op, CompareOp::Eq),
        (None, Some(_)) | (Some(_), None) => matches!(op, CompareOp::Ne),
        (Some(a), Some(b)) => match op {
            CompareOp::Eq => values_equal(a, b),
            CompareOp::Ne => !values_equal(a, b),
            CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
                ordered(op, a, b)
            }
        },
    }
}

fn ordered(op: CompareOp, a: &Value, b: &Value) -> bool {
    let ord = match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => match (a.as_str(), b.as_str()) {
            (Some(x), Some(y)) => Some(x.cmp(y)),
            _ => None,
        },
    };
    let Some(ord) = ord else { return false };
    match op {
        CompareOp::Lt => ord.is_lt(),
        CompareOp::Le => ord.is_le(),
        CompareOp::Gt => ord.is_gt(),
        CompareOp::Ge => ord.is_ge(),
        CompareOp::Eq | CompareOp::Ne => unreachable!(),
    }
}
