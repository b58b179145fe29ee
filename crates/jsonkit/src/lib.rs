//! Facade crate: re-exports the value model, reference model, patch,
//! merge, and schema-validation crates behind one dependency, and supplies
//! the one operation that genuinely needs all of them in scope at once —
//! [`reference`], the dispatch factory that completes
//! [`json::reference::reference`]'s pointer-only half with the
//! JSONPath-singular-query half `json-path` provides.
//!
//! A thin library crate that wires together its lower-level `json`/
//! `json-path`/`json-patch`/`json-merge`/`json-schema` crates without
//! adding logic of its own beyond that composition.

pub use json::{self, Location, Object, Pointer, PointerError, RefError, Reference, Segment, Token, Type, Value};
pub use json_merge as merge;
pub use json_patch as patch;
pub use json_path as path;
pub use json_schema as schema;

use json_path::ParseError as PathParseError;

/// Disambiguates `s`: the empty string or a string
/// starting with `/` is a JSON Pointer; anything else is parsed as a
/// JSONPath singular query and converted to the [`Location`] it denotes.
/// This is the completed form of [`json::reference::reference`], whose own
/// doc comment notes it only implements the pointer half since `json` stays
/// free of a JSONPath-grammar dependency.
pub fn reference(s: &str) -> Result<Reference, ReferenceError> {
    if s.is_empty() || s.starts_with('/') {
        return json::reference::reference(s)
            .map_err(ReferenceError::Pointer);
    }
    let query = json_path::parse_tolerant(s).map_err(ReferenceError::Path)?;
    let location = json_path::to_location(&query).ok_or_else(|| ReferenceError::NotSingular(s.to_string()))?;
    Ok(Reference::Location(location))
}

/// Failure modes of [`reference`]: either half of the dispatch can reject
/// `s`, or a syntactically valid but non-singular JSONPath query (e.g. one
/// using a wildcard or filter selector) names more than one location and so
/// cannot become a `Reference`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReferenceError {
    #[error("invalid JSON pointer: {0}")]
    Pointer(RefError),
    #[error("invalid JSONPath query: {0}")]
    Path(PathParseError),
    #[error("JSONPath query {0:?} is not a singular query and names no single location")]
    NotSingular(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use json::jsonv;

    #[test]
    fn dispatches_pointer_strings() {
        let r = reference("/a/b").unwrap();
        assert!(matches!(r, Reference::Pointer(_)));
    }

    #[test]
    fn dispatches_singular_jsonpath_queries() {
        let r = reference("$.store.book[0]").unwrap();
        assert!(matches!(r, Reference::Location(_)));
        assert_eq!(r.to_string(), "$['store']['book'][0]");
    }

    #[test]
    fn dispatches_bare_shorthand_names() {
        let r = reference("store.book").unwrap();
        assert_eq!(r.to_string(), "$['store']['book']");
    }

    #[test]
    fn non_singular_query_is_rejected() {
        let err = reference("$.store.book[*]").unwrap_err();
        assert!(matches!(err, ReferenceError::NotSingular(_)));
    }

    #[test]
    fn both_halves_agree_on_a_shared_document() {
        let doc = jsonv!({"a": {"b": [1, 2, 3]}});
        let via_pointer = reference("/a/b/1").unwrap();
        let via_path = reference("$.a.b[1]").unwrap();
        assert_eq!(via_pointer.get(&doc), via_path.get(&doc));
    }
}
