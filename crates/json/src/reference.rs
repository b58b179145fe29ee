use crate::location::Location;
use crate::pointer::{Pointer, RefError};
use crate::value::Value;
use std::fmt;

/// A `Reference` unifies [`Pointer`] and [`Location`] behind a single
/// segmentable-reference protocol: something that names exactly one value
/// within a document and supports `get`/`set`/`segments`/`deselect`
/// regardless of which concrete representation produced it.
///
/// A `Pointer` is always convertible to a `Reference`; a `Location` is too,
/// though round-tripping back to a `Pointer` can fail when the `Location`
/// carries a negative index (see [`Location::to_pointer`]).
#[derive(Debug, Clone)]
pub enum Reference {
    Pointer(Pointer),
    Location(Location),
}

impl Reference {
    pub fn is_root(&self) -> bool {
        match self {
            Reference::Pointer(p) => p.is_root(),
            Reference::Location(l) => l.is_root(),
        }
    }

    pub fn get<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        match self {
            Reference::Pointer(p) => p.get(root),
            Reference::Location(l) => l.get(root),
        }
    }

    pub fn set(&self, root: &Value, new_value: Value) -> Result<Value, RefError> {
        match self {
            Reference::Pointer(p) => p.set(root, new_value),
            Reference::Location(l) => l.set(root, new_value),
        }
    }

    /// The result together with the `Location` it resolved at — a
    /// `(value, location, exists)` triple, here returned as
    /// `(Option<&Value>, Location)` so the `exists` bit is just `.is_some()`.
    pub fn located<'v>(&self, root: &'v Value) -> (Option<&'v Value>, Location) {
        (self.get(root), self.to_location())
    }

    pub fn to_location(&self) -> Location {
        match self {
            Reference::Pointer(p) => Location::from_pointer(p),
            Reference::Location(l) => l.clone(),
        }
    }

    pub fn to_pointer(&self) -> Option<Pointer> {
        match self {
            Reference::Pointer(p) => Some(p.clone()),
            Reference::Location(l) => l.to_pointer(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Pointer(p) => write!(f, "{p}"),
            Reference::Location(l) => write!(f, "{l}"),
        }
    }
}

impl From<Pointer> for Reference {
    fn from(p: Pointer) -> Reference {
        Reference::Pointer(p)
    }
}
impl From<Location> for Reference {
    fn from(l: Location) -> Reference {
        Reference::Location(l)
    }
}

/// Disambiguates a reference string: the empty string or one starting
/// with `/` parses as a JSON Pointer; anything else (starting with `$` or
/// bare, per the singular-query grammar) parses as a JSONPath-singular query
/// and is resolved to a `Location` form. Since `json-path` parsing lives in
/// a separate crate (to keep `json` free of a JSONPath-grammar dependency),
/// this crate only implements the pointer half; `jsonkit::reference` is
/// where both halves meet.
pub fn reference(s: &str) -> Result<Reference, RefError> {
    if s.is_empty() || s.starts_with('/') {
        return Pointer::parse(s)
            .map(Reference::Pointer)
            .map_err(|_| RefError::ErroneousMemberSelection(s.to_string()));
    }
    Err(RefError::ErroneousMemberSelection(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonv;

    #[test]
    fn pointer_and_location_agree_on_get() {
        let doc = jsonv!({"a": [1, 2, 3]});
        let ptr_ref: Reference = Pointer::parse("/a/1").unwrap().into();
        let loc_ref: Reference = Location::root().push_member("a").push_index(1).into();
        assert_eq!(ptr_ref.get(&doc), loc_ref.get(&doc));
    }

    #[test]
    fn reference_dispatches_pointer_strings() {
        assert!(matches!(reference("/a/b"), Ok(Reference::Pointer(_))));
        assert!(matches!(reference(""), Ok(Reference::Pointer(_))));
    }
}
