use crate::pointer::{Pointer, Token};
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// `Location` is a reference built from a sequence of member names and
/// integer indices; unlike [`Pointer`] it is owned (cheaply, via an `Rc`
/// spine) rather than borrowed, and its indices may be negative
/// (relative-to-end), which is what lets it represent the result of a
/// JSONPath negative-index selector (`$[-1]`) losslessly.
///
/// Cloning a `Location` is O(1): it shares its parent chain via `Rc`, so
/// evaluators can return `Location`s detached from the value they were
/// computed against rather than borrowing from it.
#[derive(Clone)]
pub struct Location(Rc<Node>);

enum Node {
    Root,
    Member { parent: Location, name: String },
    Index { parent: Location, index: i64 },
}

impl Location {
    pub fn root() -> Location {
        Location(Rc::new(Node::Root))
    }

    pub fn is_root(&self) -> bool {
        matches!(&*self.0, Node::Root)
    }

    pub fn push_member(&self, name: impl Into<String>) -> Location {
        Location(Rc::new(Node::Member {
            parent: self.clone(),
            name: name.into(),
        }))
    }

    pub fn push_index(&self, index: i64) -> Location {
        Location(Rc::new(Node::Index {
            parent: self.clone(),
            index,
        }))
    }

    /// The parent location, or `None` for the root.
    pub fn parent(&self) -> Option<&Location> {
        match &*self.0 {
            Node::Root => None,
            Node::Member { parent, .. } => Some(parent),
            Node::Index { parent, .. } => Some(parent),
        }
    }

    /// `(parent, segment)` for the last segment of this location, i.e. the
    /// segmentable-reference `deselect` operation. `None` for root.
    pub fn deselect(&self) -> Option<(&Location, Segment<'_>)> {
        match &*self.0 {
            Node::Root => None,
            Node::Member { parent, name } => Some((parent, Segment::Member(name))),
            Node::Index { parent, index } => Some((parent, Segment::Index(*index))),
        }
    }

    /// Segments from root to this location, in document order.
    pub fn segments(&self) -> Vec<Segment<'_>> {
        let mut out = Vec::new();
        let mut cur = self;
        let mut chain = Vec::new();
        loop {
            match &*cur.0 {
                Node::Root => break,
                Node::Member { parent, name } => {
                    chain.push(Segment::Member(name));
                    cur = parent;
                }
                Node::Index { parent, index } => {
                    chain.push(Segment::Index(*index));
                    cur = parent;
                }
            }
        }
        chain.reverse();
        out.extend(chain);
        out
    }

    /// Converts to a [`Pointer`], succeeding only when every segment uses a
    /// non-negative index.
    pub fn to_pointer(&self) -> Option<Pointer> {
        let mut tokens = Vec::new();
        for seg in self.segments() {
            match seg {
                Segment::Member(name) => tokens.push(Token::Member(name.to_string())),
                Segment::Index(i) if i >= 0 => tokens.push(Token::Index {
                    raw: i.to_string(),
                    parsed: Some(i as usize),
                }),
                Segment::Index(_) => return None,
            }
        }
        Some(Pointer(tokens))
    }

    /// Builds a `Location` from a [`Pointer`], whose tokens are always
    /// non-negative or member names (never negative indices), and whose
    /// `EndOfArray`/append token has no instance-location equivalent (a
    /// not-yet-existing slot cannot be "the location of a value").
    pub fn from_pointer(ptr: &Pointer) -> Location {
        let mut loc = Location::root();
        for token in ptr.tokens() {
            loc = match token {
                Token::Member(name) => loc.push_member(name.clone()),
                Token::Index { raw, parsed: Some(i) } => {
                    let _ = raw;
                    loc.push_index(*i as i64)
                }
                Token::Index { raw, parsed: None } => loc.push_member(raw.clone()),
                Token::EndOfArray => loc.push_member("-"),
            };
        }
        loc
    }

    /// Resolves a possibly-negative array index against a container length.
    fn resolve_index(index: i64, len: usize) -> Option<usize> {
        if index >= 0 {
            let i = index as usize;
            (i < len).then_some(i)
        } else {
            let from_end = len as i64 + index;
            (from_end >= 0).then_some(from_end as usize)
        }
    }

    pub fn get<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        let segments = self.segments();
        let mut cur = root;
        for seg in segments {
            cur = match (cur, seg) {
                (Value::Object(map), Segment::Member(name)) => map.get(name)?,
                (Value::Array(arr), Segment::Index(i)) => {
                    let idx = Location::resolve_index(i, arr.len())?;
                    &arr[idx]
                }
                _ => return None,
            };
        }
        Some(cur)
    }

    /// Pure-functional set over a `Location`; fails the same way
    /// `Pointer::set` does when an intermediate location doesn't exist.
    pub fn set(&self, root: &Value, new_value: Value) -> Result<Value, crate::pointer::RefError> {
        match self.to_pointer() {
            Some(ptr) => ptr.set(root, new_value),
            None => {
                // A negative-index location can still be *read*, but it
                // never denotes a location that doesn't yet exist, so it's
                // always safe to resolve it down to a concrete (now
                // non-negative) pointer before writing.
                let concrete = self.to_concrete_pointer(root).ok_or_else(|| {
                    crate::pointer::RefError::ErroneousIndexSelection("<negative>".to_string())
                })?;
                concrete.set(root, new_value)
            }
        }
    }

    fn to_concrete_pointer(&self, root: &Value) -> Option<Pointer> {
        let mut tokens = Vec::new();
        let mut cur = root;
        for seg in self.segments() {
            match seg {
                Segment::Member(name) => {
                    tokens.push(Token::Member(name.to_string()));
                    cur = match cur {
                        Value::Object(map) => map.get(name)?,
                        _ => return None,
                    };
                }
                Segment::Index(i) => {
                    let arr = cur.as_array()?;
                    let idx = Location::resolve_index(i, arr.len())?;
                    tokens.push(Token::Index {
                        raw: idx.to_string(),
                        parsed: Some(idx),
                    });
                    cur = &arr[idx];
                }
            }
        }
        Some(Pointer(tokens))
    }
}

/// One segment of a [`Location`]: an object member or an array index
/// (possibly negative).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Member(&'a str),
    Index(i64),
}

impl PartialEq for Location {
    fn eq(&self, other: &Location) -> bool {
        self.segments() == other.segments()
    }
}
impl Eq for Location {}

impl std::hash::Hash for Location {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for seg in self.segments() {
            match seg {
                Segment::Member(m) => {
                    0u8.hash(state);
                    m.hash(state);
                }
                Segment::Index(i) => {
                    1u8.hash(state);
                    i.hash(state);
                }
            }
        }
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Renders the canonical singular-JSONPath-query string form of this
/// location, e.g. `$['foo'][2]['-']`: every segment is bracket-notation, so
/// it round-trips through the path parser without shorthand-name ambiguity.
impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for seg in self.segments() {
            match seg {
                Segment::Member(name) => write!(f, "[{}]", quote(name))?,
                Segment::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
