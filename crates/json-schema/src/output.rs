//! Basic output structure: a flat, serializable summary of a
//! [`ValidationResult`], shaped like the `"basic"` output format the JSON
//! Schema core specification describes — one unit per reported error, each
//! carrying the instance location, the schema location that rejected it,
//! and a human-readable message. Flattens the richer internal result the
//! same way before handing it to a caller outside the crate.

use crate::result::ValidationResult;
use serde::Serialize;

/// One finding in a [`BasicOutput`] — either the top-level "valid" summary
/// unit or one per-error unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicOutputUnit {
    pub valid: bool,
    #[serde(rename = "instanceLocation")]
    pub instance_location: String,
    #[serde(rename = "keywordLocation")]
    pub keyword_location: String,
    /// The absolute identifier of the Resource that owns `keyword_location`,
    /// present whenever that Resource isn't the root being validated
    /// against (mirrors the core spec's `absoluteKeywordLocation`).
    #[serde(rename = "absoluteKeywordLocation", skip_serializing_if = "Option::is_none")]
    pub absolute_keyword_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The `"basic"` output structure: `valid` plus, when invalid, a flat list
/// of per-error units (no nesting of sub-schema results, unlike the
/// `"detailed"`/`"verbose"` structures the core specification also
/// defines, which this crate does not implement).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicOutput {
    pub valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<BasicOutputUnit>,
}

impl BasicOutput {
    pub fn from_result(result: &ValidationResult) -> BasicOutput {
        if result.is_valid() {
            return BasicOutput { valid: true, errors: Vec::new() };
        }
        let errors = result
            .errors
            .iter()
            .map(|e| BasicOutputUnit {
                valid: false,
                instance_location: e.instance_location.to_string(),
                keyword_location: e.schema_location.to_string(),
                absolute_keyword_location: Some(e.schema_resource.clone()),
                error: Some(e.reason.to_string()),
            })
            .collect();
        BasicOutput { valid: false, errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::validator::validate_document;
    use json::jsonv;

    #[test]
    fn valid_instance_yields_a_single_valid_true_unit() {
        let mut registry = Registry::builder().build();
        let schema = jsonv!({"type": "string"});
        let result = validate_document(&mut registry, &schema, &jsonv!("ok")).unwrap();
        let output = BasicOutput::from_result(&result);
        assert!(output.valid);
        assert!(output.errors.is_empty());
    }

    #[test]
    fn invalid_instance_reports_one_unit_per_error() {
        let mut registry = Registry::builder().build();
        let schema = jsonv!({"type": "string", "minLength": 5});
        let result = validate_document(&mut registry, &schema, &jsonv!("no")).unwrap();
        let output = BasicOutput::from_result(&result);
        assert!(!output.valid);
        assert_eq!(output.errors.len(), 1);
        assert_eq!(output.errors[0].instance_location, "$");
        assert!(output.errors[0].error.is_some());
    }
}
