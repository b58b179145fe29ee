//! JSON Schema 2020-12: Schema Model, Schema Resource, Schema Registry &
//! Validation Context, Draft 2020-12 Validator, Format Validators. Resources
//! live in a flat arena (`resource.rs`) instead of a cyclic `Arc` graph, and
//! the validator (`validator.rs`) walks the schema tree directly instead of
//! compiling to bytecode.
//!
//! The public surface mirrors the data model's own layering: build a
//! [`Schema`] from raw JSON, register it (and anything it `$ref`s) into a
//! [`Registry`], then [`validate`] an instance against one of its
//! [`registry::ResourceRef`]s.

pub mod build;
pub mod dialect;
pub mod format;
pub mod identifier;
pub mod model;
pub mod output;
pub mod registry;
pub mod resource;
pub mod result;
pub mod validator;

pub use build::{build, BuildError};
pub use dialect::Dialect;
pub use format::Format;
pub use identifier::{Identifier, IdentifierError};
pub use model::{Descriptor, Schema};
pub use output::{BasicOutput, BasicOutputUnit};
pub use registry::{Provider, Registry, RegistryBuilder, ResolveError, ResourceRef};
pub use resource::{Anchor, Resource, ResourceArena, ResourceId};
pub use result::{
    DefaultEntry, DefaultMode, FailureReason, FormatConstraint, FormatValidity, Tag, TagKind,
    ValidationError, ValidationResult,
};
pub use validator::{validate, validate_document, ValidationContext};

#[cfg(test)]
mod tests {
    use super::*;
    use json::jsonv;

    /// A schema with a missing `required` property and an absent
    /// `default`-bearing property validates, reports the missing key, and
    /// the recorded defaults produce a one-operation patch.
    #[test]
    fn s5_end_to_end_through_the_public_api() {
        let mut registry = Registry::builder().build();
        let schema = jsonv!({
            "type": "object",
            "properties": {"count": {"type": "integer", "default": 1}},
            "required": ["name"],
        });
        let result = validate_document(&mut registry, &schema, &jsonv!({})).unwrap();
        assert!(!result.is_valid());
        let output = BasicOutput::from_result(&result);
        assert!(!output.valid);
        assert_eq!(output.errors.len(), 1);

        let patch = result.default_patch();
        assert_eq!(patch.0.len(), 1);
        let patched = json_patch::apply(&jsonv!({}), &patch).unwrap();
        assert_eq!(patched, jsonv!({"count": 1}));
    }
}
