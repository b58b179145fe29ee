//! Patch synthesis: produces a minimal RFC 6902 patch transforming `source`
//! into `target`.

use crate::{Operation, Patch};
use json::pointer::Pointer;
use json::Value;

/// Synthesizes a [`Patch`] such that `json_patch::apply(source, &diff(source,
/// target)) == Ok(target)`.
pub fn diff(source: &Value, target: &Value) -> Patch {
    let mut ops = Vec::new();
    diff_at(&Pointer::root(), source, target, &mut ops);
    Patch(ops)
}

fn diff_at(path: &Pointer, source: &Value, target: &Value, ops: &mut Vec<Operation>) {
    if source == target {
        return;
    }
    match (source, target) {
        (Value::Object(s), Value::Object(t)) => diff_object(path, s, t, ops),
        (Value::Array(s), Value::Array(t)) => diff_array(path, s, t, ops),
        _ => ops.push(Operation::Replace {
            path: path.clone(),
            value: target.clone(),
        }),
    }
}

fn diff_object(path: &Pointer, source: &json::Object, target: &json::Object, ops: &mut Vec<Operation>) {
    for key in source.keys() {
        if !target.contains_key(key) {
            ops.push(Operation::Remove {
                path: path.pushed(json::pointer::Token::Member(key.clone())),
            });
        }
    }
    for (key, tv) in target {
        let child_path = path.pushed(json::pointer::Token::Member(key.clone()));
        match source.get(key) {
            Some(sv) => diff_at(&child_path, sv, tv, ops),
            None => ops.push(Operation::Add {
                path: child_path,
                value: tv.clone(),
            }),
        }
    }
}

/// One step of the classic LCS-alignment edit script between two arrays.
enum Edit<'a> {
    Keep,
    Delete(&'a Value),
    Insert(&'a Value),
    /// A `Delete` immediately paired with an `Insert` at the same aligned
    /// position — emitted as a single `replace` (recursing when both sides
    /// share a container shape) rather than remove-then-add.
    Replace(&'a Value, &'a Value),
}

fn diff_array(path: &Pointer, source: &[Value], target: &[Value], ops: &mut Vec<Operation>) {
    let raw = lcs_edit_script(source, target);
    let edits = pair_adjacent_delete_insert(raw);

    let mut pos = 0usize;
    for edit in edits {
        match edit {
            Edit::Keep => pos += 1,
            Edit::Delete(_) => {
                ops.push(Operation::Remove {
                    path: path.pushed(index_token(pos)),
                });
                // position stays: the next element shifts into `pos`.
            }
            Edit::Insert(v) => {
                ops.push(Operation::Add {
                    path: path.pushed(index_token(pos)),
                    value: v.clone(),
                });
                pos += 1;
            }
            Edit::Replace(old, new) => {
                let child_path = path.pushed(index_token(pos));
                diff_at(&child_path, old, new, ops);
                pos += 1;
            }
        }
    }
}

fn index_token(i: usize) -> json::pointer::Token {
    json::pointer::Token::Index {
        raw: i.to_string(),
        parsed: Some(i),
    }
}

/// Dynamic-programming LCS table backtrack, producing the edit script in
/// forward (source-to-target) order.
fn lcs_edit_script<'a>(a: &'a [Value], b: &'a [Value]) -> Vec<Edit<'a>> {
    let (n, m) = (a.len(), b.len());
    let mut dp = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            dp[i][j] = if a[i] == b[j] {
                dp[i + 1][j + 1] + 1
            } else {
                dp[i + 1][j].max(dp[i][j + 1])
            };
        }
    }

    let mut edits = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    while i < n && j < m {
        if a[i] == b[j] {
            edits.push(Edit::Keep);
            i += 1;
            j += 1;
        } else if dp[i + 1][j] >= dp[i][j + 1] {
            edits.push(Edit::Delete(&a[i]));
            i += 1;
        } else {
            edits.push(Edit::Insert(&b[j]));
            j += 1;
        }
    }
    while i < n {
        edits.push(Edit::Delete(&a[i]));
        i += 1;
    }
    while j < m {
        edits.push(Edit::Insert(&b[j]));
        j += 1;
    }
    edits
}

/// Merges a `Delete` immediately followed by an `Insert` (or vice versa)
/// into a single `Replace`, so an element-level change synthesizes as one
/// `replace` op instead of a `remove` + `add` pair.
fn pair_adjacent_delete_insert(edits: Vec<Edit<'_>>) -> Vec<Edit<'_>> {
    let mut out = Vec::with_capacity(edits.len());
    let mut iter = edits.into_iter().peekable();
    while let Some(edit) = iter.next() {
        match edit {
            Edit::Delete(old) => match iter.peek() {
                Some(Edit::Insert(_)) => {
                    let Some(Edit::Insert(new)) = iter.next() else {
                        unreachable!()
                    };
                    out.push(Edit::Replace(old, new));
                }
                _ => out.push(Edit::Delete(old)),
            },
            Edit::Insert(new) => match iter.peek() {
                Some(Edit::Delete(_)) => {
                    let Some(Edit::Delete(old)) = iter.next() else {
                        unreachable!()
                    };
                    out.push(Edit::Replace(old, new));
                }
                _ => out.push(Edit::Insert(new)),
            },
            other => out.push(other),
        }
    }
    out
}
