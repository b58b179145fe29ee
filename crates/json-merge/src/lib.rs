//! RFC 7396 JSON Merge Patch, plus symmetric/override value-merge and a
//! refinement relation built on top of it (used by the schema validator's
//! default-propagation `merge` mode).

use json::{Object, Value};

/// RFC 7396 `MergePatch(Target, Patch)`: if `patch` is an object, recurses
/// member-by-member (`null` removes, anything else merges); otherwise
/// `patch` replaces `target` wholesale.
pub fn merge_patch(target: &Value, patch: &Value) -> Value {
    let Value::Object(patch_obj) = patch else {
        return patch.clone();
    };
    let mut result = match target {
        Value::Object(o) => o.clone(),
        _ => Object::new(),
    };
    for (key, patch_value) in patch_obj {
        if patch_value.is_null() {
            result.shift_remove(key);
        } else {
            let existing = result.get(key).cloned().unwrap_or(Value::Null);
            result.insert(key.clone(), merge_patch(&existing, patch_value));
        }
    }
    Value::Object(result)
}

/// Symmetric merge: combines `a` and `b` only where they're mutually
/// compatible, returning `None` on any conflict. The result — when it
/// exists — refines both inputs.
pub fn symmetric_merge(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::Array(xa), Value::Array(xb)) if xa.len() == xb.len() => {
            let merged: Option<Vec<Value>> = xa
                .iter()
                .zip(xb.iter())
                .map(|(x, y)| symmetric_merge(x, y))
                .collect();
            merged.map(Value::Array)
        }
        (Value::Object(oa), Value::Object(ob)) => {
            let mut out = Object::new();
            for (k, v) in oa {
                match ob.get(k) {
                    Some(other) => out.insert(k.clone(), symmetric_merge(v, other)?),
                    None => out.insert(k.clone(), v.clone()),
                };
            }
            for (k, v) in ob {
                if !oa.contains_key(k) {
                    out.insert(k.clone(), v.clone());
                }
            }
            Some(Value::Object(out))
        }
        _ if a == b => Some(a.clone()),
        _ => None,
    }
}

/// Override merge: like [`symmetric_merge`], except every conflict
/// resolves to `b`, and arrays merge index-wise up to `min(len)` with the
/// remainder of the longer array appended verbatim — so it always
/// succeeds.
pub fn override_merge(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Array(xa), Value::Array(xb)) => {
            let n = xa.len().min(xb.len());
            let mut out: Vec<Value> = (0..n).map(|i| override_merge(&xa[i], &xb[i])).collect();
            if xa.len() > n {
                out.extend(xa[n..].iter().cloned());
            }
            if xb.len() > n {
                out.extend(xb[n..].iter().cloned());
            }
            Value::Array(out)
        }
        (Value::Object(oa), Value::Object(ob)) => {
            let mut out = oa.clone();
            for (k, v) in ob {
                let merged = match out.get(k) {
                    Some(existing) => override_merge(existing, v),
                    None => v.clone(),
                };
                out.insert(k.clone(), merged);
            }
            Value::Object(out)
        }
        _ => b.clone(),
    }
}

/// `a` refines `b`: walking `b`, every array element
/// or object member is matched and equal-or-refined in `a`. `a` may carry
/// extra object keys `b` doesn't mention; arrays must match in length (no
/// analogous "extra element" allowance).
pub fn refines(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(oa), Value::Object(ob)) => {
            ob.iter().all(|(k, bv)| oa.get(k).is_some_and(|av| refines(av, bv)))
        }
        (Value::Array(xa), Value::Array(xb)) => {
            xa.len() == xb.len() && xa.iter().zip(xb).all(|(x, y)| refines(x, y))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use json::jsonv;

    #[test]
    fn s4_merge_patch_scenario() {
        let target = jsonv!({
            "title": "Old",
            "author": {"first": "A", "last": "B"},
            "tags": ["x", "y"],
        });
        let patch = jsonv!({
            "title": "New",
            "author": {"last": null},
            "tags": ["x"],
        });
        let merged = merge_patch(&target, &patch);
        assert_eq!(
            merged,
            jsonv!({"title": "New", "author": {"first": "A"}, "tags": ["x"]})
        );
    }

    #[test]
    fn merge_patch_identity_on_empty_object_patch() {
        let target = jsonv!({"a": 1});
        assert_eq!(merge_patch(&target, &jsonv!({})), target);
        // When `v` is not an object, merging against `{}` replaces it with `{}`.
        assert_eq!(merge_patch(&jsonv!([1, 2]), &jsonv!({})), jsonv!({}));
    }

    #[test]
    fn merge_patch_non_object_patch_replaces_wholesale() {
        assert_eq!(merge_patch(&jsonv!({"a": 1}), &jsonv!([1, 2])), jsonv!([1, 2]));
    }

    #[test]
    fn symmetric_merge_is_commutative_and_refines_both() {
        let a = jsonv!({"a": 1, "shared": {"x": 1}});
        let b = jsonv!({"b": 2, "shared": {"y": 2}});
        let merged = symmetric_merge(&a, &b).unwrap();
        assert_eq!(merged, symmetric_merge(&b, &a).unwrap());
        assert!(refines(&merged, &a));
        assert!(refines(&merged, &b));
    }

    #[test]
    fn symmetric_merge_conflict_returns_none() {
        let a = jsonv!({"a": 1});
        let b = jsonv!({"a": 2});
        assert_eq!(symmetric_merge(&a, &b), None);
    }

    #[test]
    fn override_merge_resolves_conflicts_to_rhs() {
        let a = jsonv!({"a": 1, "b": 2});
        let b = jsonv!({"a": 9});
        assert_eq!(override_merge(&a, &b), jsonv!({"a": 9, "b": 2}));
    }

    #[test]
    fn override_merge_appends_remainder_of_longer_array() {
        let a = jsonv!([1, 2, 3]);
        let b = jsonv!([10, 20]);
        assert_eq!(override_merge(&a, &b), jsonv!([10, 20, 3]));
    }

    #[test]
    fn refinement_transitivity() {
        let a = jsonv!({"x": 1, "y": 2, "z": 3});
        let b = jsonv!({"x": 1, "y": 2});
        let c = jsonv!({"x": 1});
        assert!(refines(&b, &c));
        assert!(refines(&a, &b));
        assert!(refines(&a, &c));
    }

    #[test]
    fn refinement_allows_extra_object_keys_not_extra_array_elements() {
        assert!(refines(&jsonv!({"a": 1, "extra": true}), &jsonv!({"a": 1})));
        assert!(!refines(&jsonv!([1, 2, 3]), &jsonv!([1, 2])));
    }
}
