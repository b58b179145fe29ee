use crate::value::{Object, Value};
use std::fmt;
use std::str::FromStr;

/// A single parsed token of a JSON Pointer.
///
/// `Index` retains both the original token string and, when it parses as a
/// valid RFC 6901 array index, the parsed integer — an ambiguous token like
/// `"04"` (a valid property name but not a valid array index, since leading
/// zeros are disallowed) is always a `Member`, never an `Index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// An object member name.
    Member(String),
    /// An array index. `parsed` is `Some` exactly when `raw` is `"0"` or a
    /// non-zero-leading decimal numeral that fits in a `usize`.
    Index { raw: String, parsed: Option<usize> },
    /// The `"-"` token: "one past the end of the array", used by `add` to
    /// append.
    EndOfArray,
}

impl Token {
    fn parse(raw: &str) -> Token {
        if raw == "-" {
            return Token::EndOfArray;
        }
        let is_valid_index = !raw.is_empty()
            && raw.chars().all(|c| c.is_ascii_digit())
            && (raw == "0" || !raw.starts_with('0'));
        let parsed = if is_valid_index {
            raw.parse::<usize>().ok()
        } else {
            None
        };
        if parsed.is_some() {
            Token::Index {
                raw: raw.to_string(),
                parsed,
            }
        } else {
            Token::Member(raw.to_string())
        }
    }

    /// The original (unescaped) token text, usable as an object member name
    /// regardless of whether it also parses as an index.
    pub fn as_member_str(&self) -> &str {
        match self {
            Token::Member(s) => s,
            Token::Index { raw, .. } => raw,
            Token::EndOfArray => "-",
        }
    }
}

/// Escapes `~` as `~0` and `/` as `~1`, per RFC 6901 §3.
pub fn escape(s: &str) -> String {
    if !s.contains('~') && !s.contains('/') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '~' => out.push_str("~0"),
            '/' => out.push_str("~1"),
            c => out.push(c),
        }
    }
    out
}

/// Reverses [`escape`]: `~1 -> /`, `~0 -> ~`. Order matters — `~1` must be
/// decoded before `~0` would otherwise double-unescape a literal `~1`
/// sequence, so this performs a single left-to-right pass rather than two
/// sequential `str::replace` calls.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.peek() {
                Some('0') => {
                    out.push('~');
                    chars.next();
                }
                Some('1') => {
                    out.push('/');
                    chars.next();
                }
                _ => out.push('~'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// A parsed JSON Pointer (RFC 6901): an ordered sequence of tokens navigating
/// from the document root. The empty pointer (no tokens) denotes the root
/// itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pointer(pub Vec<Token>);

/// Failure to parse a string as a JSON Pointer: a non-empty pointer must
/// either be empty or begin with `/`.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PointerError {
    #[error("JSON pointer must be empty or start with '/', got {0:?}")]
    MissingLeadingSlash(String),
}

impl Pointer {
    pub fn root() -> Pointer {
        Pointer(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    pub fn push(&mut self, token: Token) -> &mut Pointer {
        self.0.push(token);
        self
    }

    pub fn pushed(&self, token: Token) -> Pointer {
        let mut next = self.clone();
        next.push(token);
        next
    }

    /// Parent pointer and final token, or `None` for the root pointer.
    /// This is the `deselect` half of the segmentable-reference protocol:
    /// `(parent, last)` such that `parent.pushed(last) == self`.
    pub fn deselect(&self) -> Option<(Pointer, &Token)> {
        let (last, rest) = self.0.split_last()?;
        Some((Pointer(rest.to_vec()), last))
    }

    /// Strict RFC 6901 parse: a non-empty string must start with `/`.
    pub fn parse(s: &str) -> Result<Pointer, PointerError> {
        if s.is_empty() {
            return Ok(Pointer::root());
        }
        if !s.starts_with('/') {
            return Err(PointerError::MissingLeadingSlash(s.to_string()));
        }
        Ok(Pointer::from_str_lenient(s))
    }

    /// Lenient parse accepting a missing leading slash, treating the string
    /// as already rooted rather than rejecting it.
    pub fn from_str_lenient(s: &str) -> Pointer {
        if s.is_empty() {
            return Pointer::root();
        }
        let trimmed = s.strip_prefix('/').unwrap_or(s);
        let mut ptr = Pointer::root();
        for raw in trimmed.split('/') {
            ptr.push(Token::parse(&unescape(raw)));
        }
        ptr
    }
}

impl FromStr for Pointer {
    type Err = PointerError;
    fn from_str(s: &str) -> Result<Pointer, PointerError> {
        Pointer::parse(s)
    }
}

impl<S: AsRef<str>> From<S> for Pointer {
    fn from(s: S) -> Pointer {
        Pointer::from_str_lenient(s.as_ref())
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.0 {
            write!(f, "/")?;
            match token {
                Token::Member(s) => write!(f, "{}", escape(s))?,
                Token::Index { raw, .. } => write!(f, "{}", escape(raw))?,
                Token::EndOfArray => write!(f, "-")?,
            }
        }
        Ok(())
    }
}

impl serde::Serialize for Pointer {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Pointer {
    fn deserialize<D>(deserializer: D) -> Result<Pointer, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Pointer::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Reference errors, raised by `set`/`mutate` when a parent location does
/// not exist to host the requested write.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum RefError {
    #[error("cannot select member {0:?} of a non-object value")]
    ErroneousMemberSelection(String),
    #[error("cannot select index {0} of a non-array value, or index is out of bounds")]
    ErroneousIndexSelection(String),
}

impl Pointer {
    /// Walk this pointer against `root`, returning the referenced value, or
    /// `None` on any mismatch. An index token falls back to a
    /// member lookup when the current value is an object, since a pointer
    /// token like `"3"` is ambiguous between "array index 3" and "object
    /// property \"3\"" until the container type is known.
    pub fn get<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        let mut cur = root;
        for token in &self.0 {
            cur = step_get(cur, token)?;
        }
        Some(cur)
    }

    /// Pure-functional set: returns a new `Value` with the pointed-to slot
    /// replaced by `new_value`. The one RFC 6902 special case: when the
    /// final token is an array index equal to the array's current length,
    /// or is `"-"`, the value is appended rather than requiring the slot to
    /// already exist.
    pub fn set(&self, root: &Value, new_value: Value) -> Result<Value, RefError> {
        let mut root = root.clone();
        self.mutate(&mut root, false, |slot| {
            *slot = new_value;
            Ok(())
        })?;
        Ok(root)
    }

    /// In-place mutation: descends to the pointed-to slot and invokes `f`
    /// with a mutable reference to it, creating the path along the way when
    /// `insert` is true (missing object members are created as `null`; a
    /// missing trailing array index is appended, per Set's append rule).
    pub fn mutate(
        &self,
        root: &mut Value,
        insert: bool,
        f: impl FnOnce(&mut Value) -> Result<(), RefError>,
    ) -> Result<(), RefError> {
        mutate_at(root, &self.0, insert, f)
    }

    pub fn remove(&self, root: &Value) -> Result<Value, RefError> {
        let (parent, last) = self
            .deselect()
            .ok_or_else(|| RefError::ErroneousMemberSelection("<root>".into()))?;
        let mut out = root.clone();
        parent.mutate(&mut out, false, |slot| match slot {
            Value::Object(map) => {
                let name = last.as_member_str();
                map.shift_remove(name)
                    .map(|_| ())
                    .ok_or_else(|| RefError::ErroneousMemberSelection(name.to_string()))
            }
            Value::Array(arr) => match last {
                Token::Index { parsed: Some(i), .. } if *i < arr.len() => {
                    arr.remove(*i);
                    Ok(())
                }
                _ => Err(RefError::ErroneousIndexSelection(last.as_member_str().to_string())),
            },
            _ => Err(RefError::ErroneousMemberSelection(last.as_member_str().to_string())),
        })?;
        Ok(out)
    }
}

fn step_get<'v>(cur: &'v Value, token: &Token) -> Option<&'v Value> {
    match cur {
        Value::Object(map) => map.get(token.as_member_str()),
        Value::Array(arr) => match token {
            Token::Index { parsed: Some(i), .. } => arr.get(*i),
            _ => None,
        },
        _ => None,
    }
}

fn mutate_at(
    cur: &mut Value,
    tokens: &[Token],
    insert: bool,
    f: impl FnOnce(&mut Value) -> Result<(), RefError>,
) -> Result<(), RefError> {
    let Some((token, rest)) = tokens.split_first() else {
        return f(cur);
    };

    if insert {
        if let Value::Null = cur {
            *cur = match token {
                Token::Member(_) => Value::Object(Object::new()),
                Token::Index { .. } | Token::EndOfArray => Value::Array(Vec::new()),
            };
        }
    }

    match cur {
        Value::Object(map) => {
            let name = token.as_member_str();
            if !map.contains_key(name) {
                if insert {
                    map.insert(name.to_string(), Value::Null);
                } else {
                    return Err(RefError::ErroneousMemberSelection(name.to_string()));
                }
            }
            let slot = map.get_mut(name).expect("just inserted or present");
            mutate_at(slot, rest, insert, f)
        }
        Value::Array(arr) => {
            let index = match token {
                Token::Index { parsed: Some(i), .. } => Some(*i),
                Token::EndOfArray => Some(arr.len()),
                Token::Index { raw, parsed: None } => {
                    return Err(RefError::ErroneousIndexSelection(raw.clone()))
                }
                Token::Member(name) => {
                    return Err(RefError::ErroneousMemberSelection(name.clone()))
                }
            };
            let index = index.unwrap();
            if index == arr.len() {
                // Append rule: the terminal index equals the current length,
                // or was the "-" token. Only legal for the *last* token,
                // since intermediate containers must already exist.
                if rest.is_empty() || insert {
                    arr.push(Value::Null);
                } else {
                    return Err(RefError::ErroneousIndexSelection(index.to_string()));
                }
            } else if index > arr.len() {
                if insert {
                    arr.resize_with(index + 1, || Value::Null);
                } else {
                    return Err(RefError::ErroneousIndexSelection(index.to_string()));
                }
            }
            mutate_at(&mut arr[index], rest, insert, f)
        }
        _ => Err(RefError::ErroneousMemberSelection(token.as_member_str().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonv;

    #[test]
    fn escape_roundtrip() {
        for s in ["plain", "with~tilde", "with/slash", "~0~1", ""] {
            assert_eq!(unescape(&escape(s)), s);
        }
        assert_eq!(escape("~"), "~0");
        assert_eq!(escape("/"), "~1");
    }

    #[test]
    fn parses_rfc6901_examples() {
        let doc = jsonv!({
            "foo": ["bar", "baz"],
            "": 0,
            "a/b": 1,
            "c%d": 2,
            "e^f": 3,
            "g|h": 4,
            "i\\j": 5,
            "k\"l": 6,
            " ": 7,
            "m~n": 8,
        });
        let cases = [
            ("", doc.clone()),
            ("/foo", jsonv!(["bar", "baz"])),
            ("/foo/0", jsonv!("bar")),
            ("/foo/1", jsonv!("baz")),
            ("/", jsonv!(0)),
            ("/a~1b", jsonv!(1)),
            ("/c%d", jsonv!(2)),
            ("/e^f", jsonv!(3)),
            ("/g|h", jsonv!(4)),
            ("/i\\j", jsonv!(5)),
            ("/k\"l", jsonv!(6)),
            ("/ ", jsonv!(7)),
            ("/m~0n", jsonv!(8)),
        ];
        for (ptr_str, expect) in cases {
            let ptr = Pointer::parse(ptr_str).unwrap();
            assert_eq!(ptr.get(&doc), Some(&expect), "pointer {ptr_str:?}");
        }
    }

    #[test]
    fn s1_pointer_get_and_append() {
        let doc = jsonv!({"a": {"b": [10, 20, 30]}});
        assert_eq!(
            Pointer::parse("/a/b/1").unwrap().get(&doc),
            Some(&jsonv!(20))
        );
        assert_eq!(Pointer::parse("/a/b/-").unwrap().get(&doc), None);

        let appended = Pointer::parse("/a/b/-").unwrap().set(&doc, jsonv!(40)).unwrap();
        assert_eq!(appended, jsonv!({"a": {"b": [10, 20, 30, 40]}}));
    }

    #[test]
    fn rejects_missing_leading_slash() {
        assert!(Pointer::parse("foo/bar").is_err());
        assert!(Pointer::parse("").is_ok());
    }

    #[test]
    fn mutate_with_insert_creates_path() {
        let mut root = Value::Null;
        let ptr = Pointer::from("/foo/2/a");
        ptr.mutate(&mut root, true, |slot| {
            *slot = jsonv!("hello");
            Ok(())
        })
        .unwrap();
        assert_eq!(root, jsonv!({"foo": [null, null, {"a": "hello"}]}));
    }

    #[test]
    fn set_round_trip_invariant() {
        // For any Value v and Pointer p, if p.get(v) = some(x) then p.set(v, x) = v.
        let doc = jsonv!({"a": {"b": [10, 20, 30]}});
        for ptr_str in ["/a", "/a/b", "/a/b/0", "/a/b/2"] {
            let ptr = Pointer::parse(ptr_str).unwrap();
            let existing = ptr.get(&doc).unwrap().clone();
            assert_eq!(ptr.set(&doc, existing).unwrap(), doc);
        }
    }
}
