//! Validation Result: the accumulator every vocabulary routine in
//! [`crate::validator`] mutates as it walks a schema against an instance,
//! laid out as one flat, owned struct passed through by mutable reference
//! rather than a per-frame outcome tape.

use indexmap::IndexMap;
use json::{Location, Type, Value};
use json_patch::{Operation, Patch};
use std::collections::HashSet;

/// One failed constraint (`notMultipleOf`, `belowMinimum`,
/// `propertiesMissing`, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    FalseSchema,
    InvalidType { expected: Vec<Type>, found: Type },
    NotMultipleOf { divisor: f64 },
    AboveMaximum { maximum: f64 },
    AtOrAboveExclusiveMaximum { maximum: f64 },
    BelowMinimum { minimum: f64 },
    AtOrBelowExclusiveMinimum { minimum: f64 },
    MaxLengthExceeded { max: u64, actual: u64 },
    MinLengthNotMet { min: u64, actual: u64 },
    PatternNotMatching { pattern: String },
    MaxItemsExceeded { max: u64, actual: u64 },
    MinItemsNotMet { min: u64, actual: u64 },
    ItemsNotUnique,
    ContainCountMismatch { min: u64, max: Option<u64>, actual: u64 },
    MaxPropertiesExceeded { max: u64, actual: u64 },
    MinPropertiesNotMet { min: u64, actual: u64 },
    PropertiesMissing { names: Vec<String> },
    DependentPropertiesMissing { key: String, names: Vec<String> },
    ConstNotMatched,
    EnumNotMatched,
    NotIsValid,
    AnyOfNotMatched,
    OneOfNotMatched { matched: usize },
    AdditionalPropertyNotAllowed { name: String },
    UnevaluatedPropertyNotAllowed { name: String },
    UnevaluatedItemNotAllowed { index: usize },
    FormatNotMatched { format: String },
    UnresolvableReference { reference: String, message: String },
    ValidationDepthExhausted,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::FalseSchema => write!(f, "schema is `false`, which rejects every instance"),
            FailureReason::InvalidType { expected, found } => {
                let names: Vec<&str> = expected.iter().map(|t| t.name()).collect();
                write!(f, "expected type {}, found {}", names.join(" or "), found.name())
            }
            FailureReason::NotMultipleOf { divisor } => write!(f, "is not a multiple of {divisor}"),
            FailureReason::AboveMaximum { maximum } => write!(f, "is above maximum {maximum}"),
            FailureReason::AtOrAboveExclusiveMaximum { maximum } => {
                write!(f, "is at or above exclusive maximum {maximum}")
            }
            FailureReason::BelowMinimum { minimum } => write!(f, "is below minimum {minimum}"),
            FailureReason::AtOrBelowExclusiveMinimum { minimum } => {
                write!(f, "is at or below exclusive minimum {minimum}")
            }
            FailureReason::MaxLengthExceeded { max, actual } => {
                write!(f, "length {actual} exceeds maxLength {max}")
            }
            FailureReason::MinLengthNotMet { min, actual } => {
                write!(f, "length {actual} is below minLength {min}")
            }
            FailureReason::PatternNotMatching { pattern } => write!(f, "does not match pattern {pattern:?}"),
            FailureReason::MaxItemsExceeded { max, actual } => {
                write!(f, "{actual} items exceeds maxItems {max}")
            }
            FailureReason::MinItemsNotMet { min, actual } => {
                write!(f, "{actual} items is below minItems {min}")
            }
            FailureReason::ItemsNotUnique => write!(f, "items are not unique"),
            FailureReason::ContainCountMismatch { min, max, actual } => match max {
                Some(max) => write!(f, "contains {actual} matching items, expected between {min} and {max}"),
                None => write!(f, "contains {actual} matching items, expected at least {min}"),
            },
            FailureReason::MaxPropertiesExceeded { max, actual } => {
                write!(f, "{actual} properties exceeds maxProperties {max}")
            }
            FailureReason::MinPropertiesNotMet { min, actual } => {
                write!(f, "{actual} properties is below minProperties {min}")
            }
            FailureReason::PropertiesMissing { names } => write!(f, "missing required properties: {}", names.join(", ")),
            FailureReason::DependentPropertiesMissing { key, names } => {
                write!(f, "{key:?} requires properties: {}", names.join(", "))
            }
            FailureReason::ConstNotMatched => write!(f, "does not match const value"),
            FailureReason::EnumNotMatched => write!(f, "does not match any enum value"),
            FailureReason::NotIsValid => write!(f, "matches the schema negated by not"),
            FailureReason::AnyOfNotMatched => write!(f, "does not match any subschema of anyOf"),
            FailureReason::OneOfNotMatched { matched } => write!(f, "matched {matched} subschemas of oneOf, expected exactly 1"),
            FailureReason::AdditionalPropertyNotAllowed { name } => {
                write!(f, "property {name:?} is not allowed by additionalProperties")
            }
            FailureReason::UnevaluatedPropertyNotAllowed { name } => {
                write!(f, "property {name:?} is not allowed by unevaluatedProperties")
            }
            FailureReason::UnevaluatedItemNotAllowed { index } => {
                write!(f, "item at index {index} is not allowed by unevaluatedItems")
            }
            FailureReason::FormatNotMatched { format } => write!(f, "does not match format {format:?}"),
            FailureReason::UnresolvableReference { reference, message } => {
                write!(f, "cannot resolve reference {reference:?}: {message}")
            }
            FailureReason::ValidationDepthExhausted => write!(f, "validation depth exhausted, likely a schema cycle"),
        }
    }
}

/// An error, located both in the instance and in the schema that rejected
/// it.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub instance_location: Location,
    /// Absolute identifier of the Resource whose schema raised this
    /// error.
    pub schema_resource: String,
    /// Path of the failing keyword, relative to `schema_resource`'s root.
    pub schema_location: Location,
    pub reason: FailureReason,
}

/// A metadata annotation recorded at a location: `deprecated`/`readOnly`/
/// `writeOnly` plus the content-vocabulary annotations folded in alongside
/// them.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub location: Location,
    pub kind: TagKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagKind {
    Deprecated,
    ReadOnly,
    WriteOnly,
    ContentEncoding(String),
    ContentMediaType(String),
    ContentSchemaAnnotation,
}

/// Whether a `format` keyword matched, when the format-annotation
/// vocabulary is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatValidity {
    Valid,
    Invalid,
    /// No validator is registered for this format name; RFC 2020-12 treats
    /// an unrecognized format as neither a pass nor a fail.
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatConstraint {
    pub location: Location,
    pub format: String,
    pub valid: FormatValidity,
}

/// One location's collected default candidates: `present`
/// records whether the instance already had a value there, and
/// `candidates` is the set of values that `default` keywords proposed,
/// possibly narrowed by [`DefaultMode::Merge`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DefaultEntry {
    pub present: bool,
    pub candidates: Vec<Value>,
}

/// How [`ValidationResult::merge`] combines the *defaults* map of an
/// incoming sub-result into this one. Does not affect errors,
/// format constraints, or evaluated-set propagation, which always behave
/// the same way regardless of mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultMode {
    /// Drop the incoming defaults entirely (`if`'s probe, `not`'s operand).
    Suppress,
    /// Pairwise-combine candidates already present at a location with the
    /// incoming ones via symmetric merge; a conflicting pair is
    /// dropped. Used by `allOf` and unconditional applicator merges.
    Merge,
    /// Set union of candidates at a location. Used by `anyOf`/`oneOf`.
    Alternative,
}

/// Accumulates everything one schema-against-instance validation
/// produces. `isValid ⇔ errors is empty`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub location: Location,
    pub errors: Vec<ValidationError>,
    pub tags: Vec<Tag>,
    pub format_constraints: Vec<FormatConstraint>,
    pub defaults: IndexMap<Location, DefaultEntry>,
    pub evaluated_properties: HashSet<String>,
    pub evaluated_items: HashSet<usize>,
}

impl ValidationResult {
    pub fn new(location: Location) -> ValidationResult {
        ValidationResult {
            location,
            errors: Vec::new(),
            tags: Vec::new(),
            format_constraints: Vec::new(),
            defaults: IndexMap::new(),
            evaluated_properties: HashSet::new(),
            evaluated_items: HashSet::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Copies `other`'s evaluated-property/item sets into `self` (gated on
    /// `other.location == self.location`) and its format
    /// constraints/tags, without touching `self.errors` or `self.defaults`.
    /// Used where a sub-validation's *annotations* count toward the parent
    /// even though its errors must not surface as the parent's own (the
    /// `if` branch of `if`/`then`/`else`).
    pub(crate) fn absorb_annotations(&mut self, other: &ValidationResult, mode: DefaultMode) {
        if other.location == self.location {
            self.evaluated_properties.extend(other.evaluated_properties.iter().cloned());
            self.evaluated_items.extend(other.evaluated_items.iter().cloned());
        }
        self.format_constraints.extend(other.format_constraints.iter().cloned());
        self.tags.extend(other.tags.iter().cloned());
        merge_defaults(&mut self.defaults, &other.defaults, mode);
    }

    /// Merges `other` into `self`: errors and format constraints
    /// always append; evaluated-property/item sets copy only when
    /// locations match; defaults combine per `mode`. The caller decides
    /// *whether* to merge a given sub-result at all (e.g. `anyOf` only
    /// merges its passing branches) — this method always folds in
    /// everything it's given.
    pub fn merge(&mut self, other: ValidationResult, mode: DefaultMode) {
        self.absorb_annotations(&other, mode);
        self.errors.extend(other.errors);
    }

    /// Records `default` at this result's own location.
    pub fn record_default(&mut self, exists: bool, default: Value) {
        let entry = self.defaults.entry(self.location.clone()).or_default();
        entry.present = exists;
        entry.candidates.push(default);
    }

    /// Derives an RFC 6902 patch: an `add` for every
    /// location where `present=false` and at least one candidate survived,
    /// picking the first candidate deterministically.
    pub fn default_patch(&self) -> Patch {
        let mut ops = Vec::new();
        for (location, entry) in &self.defaults {
            if entry.present || entry.candidates.is_empty() {
                continue;
            }
            if let Some(pointer) = location.to_pointer() {
                ops.push(Operation::Add {
                    path: pointer,
                    value: entry.candidates[0].clone(),
                });
            }
        }
        Patch::new(ops)
    }
}

fn merge_defaults(
    target: &mut IndexMap<Location, DefaultEntry>,
    incoming: &IndexMap<Location, DefaultEntry>,
    mode: DefaultMode,
) {
    if mode == DefaultMode::Suppress {
        return;
    }
    for (location, incoming_entry) in incoming {
        match target.get_mut(location) {
            None => {
                target.insert(location.clone(), incoming_entry.clone());
            }
            Some(existing) => {
                existing.present = existing.present || incoming_entry.present;
                match mode {
                    DefaultMode::Alternative => {
                        for candidate in &incoming_entry.candidates {
                            if !existing.candidates.contains(candidate) {
                                existing.candidates.push(candidate.clone());
                            }
                        }
                    }
                    DefaultMode::Merge => {
                        let mut merged = Vec::new();
                        for a in &existing.candidates {
                            for b in &incoming_entry.candidates {
                                if let Some(m) = json_merge::symmetric_merge(a, b) {
                                    if !merged.contains(&m) {
                                        merged.push(m);
                                    }
                                }
                            }
                        }
                        existing.candidates = merged;
                    }
                    DefaultMode::Suppress => unreachable!("handled above"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use json::jsonv;

    #[test]
    fn merge_copies_errors_and_gates_evaluated_sets_on_location() {
        let mut parent = ValidationResult::new(Location::root());
        let mut child = ValidationResult::new(Location::root());
        child.evaluated_properties.insert("a".to_string());
        child.errors.push(ValidationError {
            instance_location: Location::root(),
            schema_resource: "urn:x".to_string(),
            schema_location: Location::root(),
            reason: FailureReason::FalseSchema,
        });
        parent.merge(child, DefaultMode::Merge);
        assert!(!parent.is_valid());
        assert!(parent.evaluated_properties.contains("a"));

        let mut other_location_child = ValidationResult::new(Location::root().push_member("x"));
        other_location_child.evaluated_properties.insert("b".to_string());
        parent.merge(other_location_child, DefaultMode::Merge);
        assert!(!parent.evaluated_properties.contains("b"));
    }

    #[test]
    fn default_patch_only_covers_absent_locations_with_candidates() {
        let mut result = ValidationResult::new(Location::root());
        result.location = Location::root().push_member("n");
        result.record_default(false, jsonv!(0));
        let patch = result.default_patch();
        assert_eq!(patch.0.len(), 1);
        match &patch.0[0] {
            Operation::Add { path, value } => {
                assert_eq!(path.to_string(), "/n");
                assert_eq!(*value, jsonv!(0));
            }
            _ => panic!("expected an add operation"),
        }
    }

    #[test]
    fn merge_mode_suppress_drops_incoming_defaults() {
        let mut parent = ValidationResult::new(Location::root());
        let mut child = ValidationResult::new(Location::root());
        child.record_default(false, jsonv!(1));
        parent.merge(child, DefaultMode::Suppress);
        assert!(parent.defaults.is_empty());
    }

    #[test]
    fn merge_mode_alternative_unions_candidates() {
        let mut parent = ValidationResult::new(Location::root());
        parent.record_default(false, jsonv!(1));
        let mut child = ValidationResult::new(Location::root());
        child.record_default(false, jsonv!(2));
        parent.merge(child, DefaultMode::Alternative);
        let entry = parent.defaults.get(&Location::root()).unwrap();
        assert_eq!(entry.candidates, vec![jsonv!(1), jsonv!(2)]);
    }

    #[test]
    fn merge_mode_merge_drops_conflicting_candidate_pairs() {
        let mut parent = ValidationResult::new(Location::root());
        parent.record_default(false, jsonv!({"a": 1}));
        let mut child = ValidationResult::new(Location::root());
        child.record_default(false, jsonv!({"a": 2}));
        parent.merge(child, DefaultMode::Merge);
        let entry = parent.defaults.get(&Location::root()).unwrap();
        assert!(entry.candidates.is_empty());
    }
}
