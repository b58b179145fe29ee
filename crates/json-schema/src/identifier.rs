//! Schema Identifier: a thin wrapper over a URI-reference string providing
//! the handful of operations the Registry's `$ref` resolution needs —
//! absoluteness, fragment splitting, and RFC 3986 relative resolution
//! against a base.

use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

#[derive(Debug, Clone, Error, PartialEq)]
pub enum IdentifierError {
    #[error("cannot resolve {reference:?} against base {base}: {message}")]
    Resolve {
        reference: String,
        base: String,
        message: String,
    },
}

impl Identifier {
    pub fn new(s: impl Into<String>) -> Identifier {
        Identifier(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when this identifier carries a URI scheme (`scheme ":" ...`),
    /// per RFC 3986 §3.1 — a relative reference (including a fragment-only
    /// one like `"#/a/b"`) is never absolute.
    pub fn is_absolute(&self) -> bool {
        scheme_len(&self.0).is_some()
    }

    /// The identifier with any `#fragment` suffix stripped.
    pub fn base_identifier(&self) -> &str {
        self.0.split('#').next().unwrap_or("")
    }

    /// The text after the first `#`, or `None` if there is no fragment.
    pub fn fragment(&self) -> Option<&str> {
        self.0.split_once('#').map(|(_, frag)| frag)
    }

    /// Resolves this identifier relative to `base` per RFC 3986 §5.3. An
    /// empty identifier resolves to `base` itself.
    pub fn relative(&self, base: &Url) -> Result<Url, IdentifierError> {
        if self.0.is_empty() {
            return Ok(base.clone());
        }
        base.join(&self.0).map_err(|e| IdentifierError::Resolve {
            reference: self.0.clone(),
            base: base.to_string(),
            message: e.to_string(),
        })
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Identifier {
        Identifier::new(s)
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Identifier {
        Identifier(s)
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn scheme_len(s: &str) -> Option<usize> {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() => {}
        _ => return None,
    }
    for (i, c) in chars {
        if c == ':' {
            return Some(i);
        }
        if !(c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.') {
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_identifiers_have_a_scheme() {
        assert!(Identifier::new("https://example.com/schema.json").is_absolute());
        assert!(!Identifier::new("#/$defs/foo").is_absolute());
        assert!(!Identifier::new("other.json").is_absolute());
    }

    #[test]
    fn base_and_fragment_split_on_first_hash() {
        let id = Identifier::new("https://example.com/schema.json#/a/b");
        assert_eq!(id.base_identifier(), "https://example.com/schema.json");
        assert_eq!(id.fragment(), Some("/a/b"));
        assert_eq!(Identifier::new("https://example.com/s").fragment(), None);
    }

    #[test]
    fn empty_identifier_relative_to_base_yields_base() {
        let base = Url::parse("https://example.com/schema.json").unwrap();
        assert_eq!(Identifier::new("").relative(&base).unwrap(), base);
    }

    #[test]
    fn relative_resolution_follows_rfc3986() {
        let base = Url::parse("https://example.com/a/schema.json").unwrap();
        assert_eq!(
            Identifier::new("other.json").relative(&base).unwrap().as_str(),
            "https://example.com/a/other.json"
        );
        assert_eq!(
            Identifier::new("/b/other.json").relative(&base).unwrap().as_str(),
            "https://example.com/b/other.json"
        );
        assert_eq!(
            Identifier::new("#/$defs/foo").relative(&base).unwrap().as_str(),
            "https://example.com/a/schema.json#/$defs/foo"
        );
    }
}
