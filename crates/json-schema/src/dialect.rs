//! Dialect: the set of vocabularies a Resource's schema is interpreted
//! under, including an opt-in flag recognizing the 2019-09 legacy
//! `$recursiveRef`/`$recursiveAnchor` pair as a dialect variant rather than
//! a silently-always-on compatibility shim.

pub const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

/// A named `$vocabulary`; only its identifier matters to this crate —
/// vocabularies that aren't one of the ones this validator implements are
/// accepted but have no effect rather than being rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    pub uri: String,
    pub required: bool,
}

/// The dialect a Resource was declared under (via `$schema`, or inherited
/// from its enclosing Resource).
#[derive(Debug, Clone, PartialEq)]
pub struct Dialect {
    pub uri: String,
    pub vocabularies: Vec<Vocabulary>,
    /// Recognize `$recursiveRef`/`$recursiveAnchor` as a `$dynamicRef`
    /// against the implicit anchor name `""`.
    pub legacy_recursive_ref: bool,
}

impl Dialect {
    pub fn draft2020_12() -> Dialect {
        Dialect {
            uri: DRAFT_2020_12.to_string(),
            vocabularies: vec![
                Vocabulary { uri: "https://json-schema.org/draft/2020-12/vocab/core".to_string(), required: true },
                Vocabulary { uri: "https://json-schema.org/draft/2020-12/vocab/applicator".to_string(), required: true },
                Vocabulary { uri: "https://json-schema.org/draft/2020-12/vocab/unevaluated".to_string(), required: true },
                Vocabulary { uri: "https://json-schema.org/draft/2020-12/vocab/validation".to_string(), required: true },
                Vocabulary { uri: "https://json-schema.org/draft/2020-12/vocab/meta-data".to_string(), required: false },
                Vocabulary { uri: "https://json-schema.org/draft/2020-12/vocab/format-annotation".to_string(), required: false },
                Vocabulary { uri: "https://json-schema.org/draft/2020-12/vocab/content".to_string(), required: false },
            ],
            legacy_recursive_ref: false,
        }
    }

    /// The same dialect, but with `format` treated as an assertion rather
    /// than a bare annotation (the "format-assertion" vocabulary).
    pub fn draft2020_12_format_assertion() -> Dialect {
        let mut d = Dialect::draft2020_12();
        for v in &mut d.vocabularies {
            if v.uri.ends_with("format-annotation") {
                v.uri = "https://json-schema.org/draft/2020-12/vocab/format-assertion".to_string();
            }
        }
        d
    }

    /// Draft 2019-09-style legacy compatibility: same vocabulary set, but
    /// `$recursiveRef`/`$recursiveAnchor` are honored.
    pub fn draft2019_09_legacy() -> Dialect {
        let mut d = Dialect::draft2020_12();
        d.legacy_recursive_ref = true;
        d
    }

    pub fn format_is_assertion(&self) -> bool {
        self.vocabularies.iter().any(|v| v.uri.ends_with("format-assertion"))
    }
}

impl Default for Dialect {
    fn default() -> Dialect {
        Dialect::draft2020_12()
    }
}
