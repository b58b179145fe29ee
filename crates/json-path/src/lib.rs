//! RFC 9535 JSONPath: parser, AST, and evaluator.
//!
//! This crate is deliberately silent on the `json` crate's Pointer/Location
//! grammar — it only knows how to turn a JSONPath string into an AST and run
//! that AST against a [`json::Value`]. The singular-query <-> [`json::Location`]
//! bridge lives here (in [`to_location`]/[`singular_query_string`]) since it's
//! the one place both vocabularies meet.

pub mod ast;
pub mod error;
pub mod eval;
pub mod functions;
pub mod parser;
pub mod value_type;

pub use ast::{Query, Segment, Selector};
pub use error::ParseError;
pub use eval::{evaluate, NodeList};
pub use parser::parse;

use json::Location;

/// Parses and evaluates `query` against `root` in one call — the common
/// case when the AST itself doesn't need to be retained.
pub fn query(query: &str, root: &json::Value) -> Result<NodeList<'_>, ParseError> {
    let q = parse(query)?;
    Ok(evaluate(&q, root))
}

/// Converts a singular [`Query`] to the [`Location`] it denotes,
/// *without* evaluating it against any document — the AST alone carries
/// enough information, since every segment is a single name or index
/// selector. Returns `None` when the query is not singular.
pub fn to_location(q: &Query) -> Option<Location> {
    if !q.is_singular() {
        return None;
    }
    let mut loc = Location::root();
    for seg in &q.segments {
        let Segment::Child(sels) = seg else {
            return None;
        };
        loc = match &sels[0] {
            Selector::Name(name) => loc.push_member(name.clone()),
            Selector::Index(i) => loc.push_index(*i),
            _ => return None,
        };
    }
    Some(loc)
}

/// Renders `loc` as the canonical singular-JSONPath-query string RFC 9535's
/// singular-query grammar expects — delegating straight to
/// [`Location`]'s own `Display`, since it already produces exactly that
/// form (e.g. `$['foo'][2]`).
pub fn singular_query_string(loc: &Location) -> String {
    loc.to_string()
}

/// Accepts shorthand reference forms kept for backwards compatibility: a
/// bare member name or a leading-`.` path with no `$` prefix is rewritten
/// to `$.` + the rest before parsing.
pub fn parse_tolerant(input: &str) -> Result<Query, ParseError> {
    let trimmed = input.trim();
    if trimmed.starts_with('$') {
        return parse(trimmed);
    }
    let rewritten = if let Some(rest) = trimmed.strip_prefix('.') {
        format!("${}", format_args!(".{rest}"))
    } else {
        format!("$.{trimmed}")
    };
    parse(&rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;
    use json::jsonv;

    #[test]
    fn singular_query_round_trips_through_location() {
        let q = parse("$.store.book[2]").unwrap();
        assert!(q.is_singular());
        let loc = to_location(&q).unwrap();
        assert_eq!(loc.to_string(), "$['store']['book'][2]");
        let reparsed = parse(&singular_query_string(&loc)).unwrap();
        assert_eq!(to_location(&reparsed).unwrap(), loc);
    }

    #[test]
    fn non_singular_query_has_no_location() {
        let q = parse("$.store.book[*]").unwrap();
        assert!(!q.is_singular());
        assert!(to_location(&q).is_none());
    }

    #[test]
    fn s2_path_query_scenario() {
        let doc = jsonv!({"store":{"book":[{"p":5},{"p":15},{"p":25}]}});
        let got = query("$.store.book[?@.p > 10].p", &doc).unwrap();
        let values: Vec<&json::Value> = got.into_iter().map(|(v, _)| v).collect();
        assert_eq!(values, vec![&jsonv!(15), &jsonv!(25)]);
    }

    #[test]
    fn parse_tolerant_accepts_bare_member_name() {
        let a = parse_tolerant("foo.bar").unwrap();
        let b = parse("$.foo.bar").unwrap();
        assert_eq!(a, b);
    }
}
