use super::Number;
use itertools::{EitherOrBoth, Itertools};
use serde_json::Value;
use std::cmp::Ordering;

/// json_cmp evaluates the deep ordering of |lhs| and |rhs|.
/// This function establishes an arbitrary ordering over JSON
/// types, in order to provide a total ordering. Arrays and
/// objects are compared lexicographically, and the natural
/// Object order is used (by default, sorted on property name).
pub fn json_cmp(lhs: &Value, rhs: &Value) -> Ordering {
    match (lhs, rhs) {
        // Simple scalar comparisons:
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(lhs), Value::Bool(rhs)) => lhs.cmp(rhs),
        (Value::Number(lhs), Value::Number(rhs)) => {
            let lhs = Number::from(lhs);
            let rhs = Number::from(rhs);
            lhs.cmp(&rhs)
        }
        (Value::String(lhs), Value::String(rhs)) => lhs.cmp(rhs),
        (Value::Array(lhs), Value::Array(rhs)) => lhs
            .iter()
            .zip_longest(rhs)
            .map(|eob| match eob {
                EitherOrBoth::Both(lhs, rhs) => json_cmp(lhs, rhs),
                EitherOrBoth::Right(_) => Ordering::Less,
                EitherOrBoth::Left(_) => Ordering::Greater,
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal),
        // Deeply compare object (sorted, or otherwise ordered) properties
        // and values in lexicographic order.
        (Value::Object(lhs), Value::Object(rhs)) => lhs
            .iter()
            .zip_longest(rhs)
            .map(|eob| match eob {
                EitherOrBoth::Both((lhs_p, lhs_v), (rhs_p, rhs_v)) => {
                    let prop_ord = lhs_p.cmp(rhs_p);
                    match prop_ord {
                        Ordering::Equal => json_cmp(lhs_v, rhs_v),
                        _ => prop_ord,
                    }
                }
                EitherOrBoth::Right(_) => Ordering::Less,
                EitherOrBoth::Left(_) => Ordering::Greater,
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal),

        // Types are not equal. Define an (arbitrary) total ordering.
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Bool(_), _) => Ordering::Less,
        (_, Value::Bool(_)) => Ordering::Greater,
        (Value::Number(_), _) => Ordering::Less,
        (_, Value::Number(_)) => Ordering::Greater,
        (Value::String(_), _) => Ordering::Less,
        (_, Value::String(_)) => Ordering::Greater,
        (Value::Array(_), _) => Ordering::Less,
        (_, Value::Array(_)) => Ordering::Greater,
    }
}

/// json_cmp_at evaluates the deep ordering of |lhs| and |rhs| with respect
/// to a composite key, specified as a slice of JSON-Pointers relative to the
/// respective document roots. JSON-Pointers which point to a document location
/// that does not exist assume an implicit "null" value. In other words, they
/// behave identically to a document where the location *does* exist but with
/// an explicit null value.
pub fn json_cmp_at<S>(key_ptrs: &[S], lhs: &Value, rhs: &Value) -> Ordering
where
    S: AsRef<str>,
{
    key_ptrs
        .iter()
        .map(|ptr| {
            json_cmp(
                lhs.pointer(ptr.as_ref()).unwrap_or(&Value::Null),
                rhs.pointer(ptr.as_ref()).unwrap_or(&Value::Null),
            )
        })
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}
