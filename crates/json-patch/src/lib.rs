//! RFC 6902 JSON Patch: the `test`/`add`/`remove`/`replace`/`move`/`copy`
//! operations, transactional application, and patch synthesis (diff).
//!
//! Application walks a working clone of the document one operation at a
//! time; any failure discards the clone and returns the original document
//! untouched.

pub mod diff;

pub use diff::diff;

use json::pointer::{Pointer, RefError, Token};
use json::Value;
use serde::{Deserialize, Serialize};

/// A single RFC 6902 patch operation, tagged on the wire by its `op` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    Add { path: PointerField, value: Value },
    Remove { path: PointerField },
    Replace { path: PointerField, value: Value },
    Move { from: PointerField, path: PointerField },
    Copy { from: PointerField, path: PointerField },
    Test { path: PointerField, value: Value },
}

/// `Pointer` already has a `Serialize`/`Deserialize` impl via its `Display`/
/// `FromStr`, so `path`/`from` fields can just use it directly — this alias
/// only exists to give the wire-facing field a name distinct from the
/// navigation type it carries.
pub type PointerField = Pointer;

/// An ordered sequence of operations, applied left to right.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(pub Vec<Operation>);

impl Patch {
    pub fn new(ops: Vec<Operation>) -> Patch {
        Patch(ops)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Failure applying one operation of a [`Patch`]. `index` is the
/// zero-based position of the failing operation within the patch.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum PatchError {
    #[error("operation {index}: {source}")]
    Reference { index: usize, source: RefError },
    #[error("operation {index}: test failed at {path}: expected {expected:?}, found {found:?}")]
    TestFailed {
        index: usize,
        path: String,
        expected: Value,
        found: Option<Value>,
    },
    #[error("operation {index}: move target {path} is a descendant of source {from}")]
    MoveIntoDescendant {
        index: usize,
        from: String,
        path: String,
    },
}

/// Applies `patch` to `doc`, returning the resulting document. On any
/// failure, `doc` is returned unmodified-in-spirit: the function never
/// mutates its argument (it's `&Value`), so the caller's original document
/// was never at risk in the first place; this just makes the "all or
/// nothing" contract explicit at the type level.
pub fn apply(doc: &Value, patch: &Patch) -> Result<Value, PatchError> {
    let mut working = doc.clone();
    for (index, op) in patch.0.iter().enumerate() {
        working = apply_one(&working, op).map_err(|source| to_patch_error(index, source))?;
    }
    Ok(working)
}

fn to_patch_error(index: usize, source: StepError) -> PatchError {
    match source {
        StepError::Ref(e) => PatchError::Reference { index, source: e },
        StepError::TestFailed { path, expected, found } => {
            PatchError::TestFailed { index, path, expected, found }
        }
        StepError::MoveIntoDescendant { from, path } => {
            PatchError::MoveIntoDescendant { index, from, path }
        }
    }
}

enum StepError {
    Ref(RefError),
    TestFailed {
        path: String,
        expected: Value,
        found: Option<Value>,
    },
    MoveIntoDescendant { from: String, path: String },
}
impl From<RefError> for StepError {
    fn from(e: RefError) -> StepError {
        StepError::Ref(e)
    }
}

fn apply_one(doc: &Value, op: &Operation) -> Result<Value, StepError> {
    match op {
        Operation::Add { path, value } => add(doc, path, value.clone()),
        Operation::Remove { path } => remove(doc, path),
        Operation::Replace { path, value } => replace(doc, path, value.clone()),
        Operation::Test { path, value } => {
            let found = path.get(doc).cloned();
            if found.as_ref() == Some(value) {
                Ok(doc.clone())
            } else {
                Err(StepError::TestFailed {
                    path: path.to_string(),
                    expected: value.clone(),
                    found,
                })
            }
        }
        Operation::Move { from, path } => {
            if is_prefix_of(from, path) {
                return Err(StepError::MoveIntoDescendant {
                    from: from.to_string(),
                    path: path.to_string(),
                });
            }
            let value = from
                .get(doc)
                .cloned()
                .ok_or_else(|| RefError::ErroneousMemberSelection(from.to_string()))?;
            let removed = remove(doc, from)?;
            add(&removed, path, value)
        }
        Operation::Copy { from, path } => {
            let value = from
                .get(doc)
                .cloned()
                .ok_or_else(|| RefError::ErroneousMemberSelection(from.to_string()))?;
            add(doc, path, value)
        }
    }
}

/// True iff `path` is `from` itself or a proper descendant of it — the
/// condition RFC 6902 §4.4 forbids for `move`'s target.
fn is_prefix_of(from: &Pointer, path: &Pointer) -> bool {
    let from_tokens = from.tokens();
    let path_tokens = path.tokens();
    path_tokens.len() > from_tokens.len() && path_tokens[..from_tokens.len()] == *from_tokens
}

/// `add`: object member is created-or-replaced; array element at an
/// in-bounds index or the `"-"` token is inserted (shifting), extending by
/// one; the *parent* path must already exist.
fn add(doc: &Value, path: &Pointer, value: Value) -> Result<Value, StepError> {
    if path.is_root() {
        return Ok(value);
    }
    let (parent, last) = path
        .deselect()
        .expect("non-root pointer has a parent/last split");
    let mut out = doc.clone();
    parent.mutate(&mut out, false, |slot| match (slot, last) {
        (Value::Object(map), _) => {
            map.insert(last.as_member_str().to_string(), value);
            Ok(())
        }
        (Value::Array(arr), Token::EndOfArray) => {
            arr.push(value);
            Ok(())
        }
        (Value::Array(arr), Token::Index { parsed: Some(i), .. }) if *i <= arr.len() => {
            arr.insert(*i, value);
            Ok(())
        }
        (Value::Array(_), tok) => {
            Err(RefError::ErroneousIndexSelection(tok.as_member_str().to_string()))
        }
        (other, tok) => Err(RefError::ErroneousMemberSelection(format!(
            "{:?} has no slot {}",
            other.kind(),
            tok.as_member_str()
        ))),
    })?;
    Ok(out)
}

/// `remove`: the target must already exist.
fn remove(doc: &Value, path: &Pointer) -> Result<Value, StepError> {
    Ok(path.remove(doc)?)
}

/// `replace`: the target must already exist; unlike `add`, an
/// out-of-bounds array index or a missing object member is an error rather
/// than a create/append.
fn replace(doc: &Value, path: &Pointer, value: Value) -> Result<Value, StepError> {
    let (parent, last) = path
        .deselect()
        .ok_or_else(|| RefError::ErroneousMemberSelection("<root>".to_string()))?;
    let mut out = doc.clone();
    parent.mutate(&mut out, false, |slot| match (slot, last) {
        (Value::Object(map), _) if map.contains_key(last.as_member_str()) => {
            map.insert(last.as_member_str().to_string(), value);
            Ok(())
        }
        (Value::Array(arr), Token::Index { parsed: Some(i), .. }) if *i < arr.len() => {
            arr[*i] = value;
            Ok(())
        }
        (other, tok) => Err(RefError::ErroneousMemberSelection(format!(
            "{:?} has no existing slot {}",
            other.kind(),
            tok.as_member_str()
        ))),
    })?;
    Ok(out)
}
