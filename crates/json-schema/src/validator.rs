//! Draft 2020-12 Validator: a recursive, vocabulary-organized interpreter.
//! The Result is threaded by mutable reference through each vocabulary
//! routine as a tree-walking function walks the schema directly, with no
//! compilation to bytecode.
//!
//! Every vocabulary group gets its own `apply_*` function taking the active
//! [`Descriptor`], the current [`ValidationResult`] by mutable reference,
//! and whatever slice of context it needs. `validate_node` is the single
//! recursive entry point everything else calls back into.

use crate::dialect::Dialect;
use crate::format::Format;
use crate::identifier::Identifier;
use crate::model::{Descriptor, Schema};
use crate::registry::{Registry, ResourceRef};
use crate::result::{
    DefaultMode, FailureReason, FormatConstraint, FormatValidity, Tag, TagKind, ValidationError,
    ValidationResult,
};
use fancy_regex::Regex;
use fxhash::FxHashSet;
use itertools::Itertools;
use json::{Location, Value};
use url::Url;

/// Instance location depth bound. Also used, via
/// [`ValidationContext::ref_depth`], as a backstop against a pure schema
/// cycle that never grows the instance location (e.g. `{"$ref": "#"}` with
/// no intervening `properties`/`items`) — a linked-list-shaped recursive
/// schema grows instance depth with every `$ref` hop, but a degenerate
/// self-referential schema would loop at constant instance depth forever
/// without a second counter.
const MAX_DEPTH: usize = 100;

/// The instance being validated: the value, if it exists, plus the
/// [`Location`] it occupies. `value = None` is used
/// only for the `properties[k]` default-probe.
struct Instance<'v> {
    value: Option<&'v Value>,
    location: Location,
}

impl<'v> Instance<'v> {
    fn child_member(&self, value: Option<&'v Value>, name: &str) -> Instance<'v> {
        Instance { value, location: self.location.push_member(name) }
    }

    fn child_index(&self, value: &'v Value, index: usize) -> Instance<'v> {
        Instance { value: Some(value), location: self.location.push_index(index as i64) }
    }
}

/// Threads the mutable [`Registry`] (needed because a `$ref`/`$dynamicRef`
/// resolution may pull in a new document via a Provider) and the active
/// Resource stack (innermost last), used for `$dynamicRef`'s scope walk.
pub struct ValidationContext<'r> {
    registry: &'r mut Registry,
    stack: Vec<ResourceRef>,
    ref_depth: usize,
}

impl<'r> ValidationContext<'r> {
    pub fn new(registry: &'r mut Registry) -> ValidationContext<'r> {
        ValidationContext { registry, stack: Vec::new(), ref_depth: 0 }
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }
}

/// Validates `instance` against the Resource `resource`. The returned
/// [`ValidationResult`]'s `is_valid()` reflects whether the whole
/// validation succeeded; it never short-circuits on the first error.
pub fn validate(registry: &mut Registry, resource: ResourceRef, instance: &Value) -> ValidationResult {
    let mut ctx = ValidationContext::new(registry);
    validate_node(
        &mut ctx,
        resource,
        Location::root(),
        Instance { value: Some(instance), location: Location::root() },
    )
}

/// Recursive entry point: applies the depth guard, pushes `resource` onto
/// the active scope stack for the duration of this subtree, and dispatches
/// to [`validate_descriptor`].
fn validate_node(
    ctx: &mut ValidationContext,
    resource: ResourceRef,
    schema_path: Location,
    instance: Instance,
) -> ValidationResult {
    let mut result = ValidationResult::new(instance.location.clone());
    if instance.location.segments().len() > MAX_DEPTH || ctx.ref_depth > MAX_DEPTH {
        result.errors.push(depth_error(ctx, resource, &schema_path, &instance));
        return result;
    }

    let schema = ctx.registry.schema(resource).clone();
    match &schema {
        Schema::Bool(true) => {}
        Schema::Bool(false) => {
            result.errors.push(ValidationError {
                instance_location: instance.location.clone(),
                schema_resource: resource_id_str(ctx, resource),
                schema_location: schema_path,
                reason: FailureReason::FalseSchema,
            });
        }
        Schema::Descriptor(d) => {
            ctx.stack.push(resource);
            validate_descriptor(ctx, resource, d, &schema_path, &instance, &mut result);
            ctx.stack.pop();
        }
    }
    result
}

fn depth_error(ctx: &ValidationContext, resource: ResourceRef, schema_path: &Location, instance: &Instance) -> ValidationError {
    ValidationError {
        instance_location: instance.location.clone(),
        schema_resource: resource_id_str(ctx, resource),
        schema_location: schema_path.clone(),
        reason: FailureReason::ValidationDepthExhausted,
    }
}

fn resource_id_str(ctx: &ValidationContext, resource: ResourceRef) -> String {
    ctx.registry.resource(resource).id.as_str().to_string()
}

/// The central vocabulary dispatch. Order matters for the
/// `evaluated*` annotation sets: core (`$ref`) and every applicator run
/// before the unevaluated vocabulary, which consults what's accumulated so
/// far.
fn validate_descriptor(
    ctx: &mut ValidationContext,
    resource: ResourceRef,
    d: &Descriptor,
    schema_path: &Location,
    instance: &Instance,
    result: &mut ValidationResult,
) {
    apply_core(ctx, resource, d, schema_path, instance, result);
    apply_metadata(d, instance, result);
    apply_format(ctx, resource, d, schema_path, instance, result);
    apply_content(d, instance, result);

    apply_type(ctx, resource, d, schema_path, instance, result);
    apply_enum_const(ctx, resource, d, schema_path, instance, result);
    apply_numeric(ctx, resource, d, schema_path, instance, result);
    apply_string(ctx, resource, d, schema_path, instance, result);
    apply_array_bounds(ctx, resource, d, schema_path, instance, result);
    apply_object_bounds(ctx, resource, d, schema_path, instance, result);

    apply_array_applicators(ctx, resource, d, schema_path, instance, result);
    apply_object_applicators(ctx, resource, d, schema_path, instance, result);
    apply_logical_applicators(ctx, resource, d, schema_path, instance, result);

    apply_unevaluated(ctx, resource, d, schema_path, instance, result);
}

// ---------------------------------------------------------------------
// Resource-scope tracking: a sub-schema with its own `$id` validates in a
// new base-URI scope. Everything else stays in the enclosing Resource.
// ---------------------------------------------------------------------

fn child_resource(ctx: &ValidationContext, current: ResourceRef, child: &Schema) -> ResourceRef {
    let Some(d) = child.as_descriptor() else { return current };
    let Some(raw_id) = &d.id else { return current };
    let Ok(base) = Url::parse(ctx.registry.resource(current).id.as_str()) else { return current };
    let Ok(resolved) = Identifier::new(raw_id.clone()).relative(&base) else { return current };
    let mut base_only = resolved;
    base_only.set_fragment(None);
    ctx.registry.by_base(&base_only.to_string()).unwrap_or(current)
}

// ---------------------------------------------------------------------
// Core vocabulary: $ref / $dynamicRef / legacy $recursiveRef
// ---------------------------------------------------------------------

fn apply_core(
    ctx: &mut ValidationContext,
    resource: ResourceRef,
    d: &Descriptor,
    schema_path: &Location,
    instance: &Instance,
    result: &mut ValidationResult,
) {
    if let Some(r) = &d.reference {
        apply_ref(ctx, resource, r, "$ref", schema_path, instance, result, false);
    }
    if let Some(r) = &d.dynamic_reference {
        apply_ref(ctx, resource, r, "$dynamicRef", schema_path, instance, result, true);
    }
    let legacy = ctx.registry.dialect_of(resource.0).legacy_recursive_ref;
    if legacy {
        if let Some(r) = &d.recursive_ref {
            apply_ref(ctx, resource, r, "$recursiveRef", schema_path, instance, result, true);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_ref(
    ctx: &mut ValidationContext,
    resource: ResourceRef,
    reference: &str,
    keyword: &'static str,
    schema_path: &Location,
    instance: &Instance,
    result: &mut ValidationResult,
    dynamic: bool,
) {
    if ctx.ref_depth > MAX_DEPTH {
        result.errors.push(depth_error(ctx, resource, schema_path, instance));
        return;
    }
    let resolved = match ctx.registry.resolve(resource, reference) {
        Ok(r) => r,
        Err(e) => {
            result.errors.push(ValidationError {
                instance_location: instance.location.clone(),
                schema_resource: resource_id_str(ctx, resource),
                schema_location: schema_path.push_member(keyword),
                reason: FailureReason::UnresolvableReference { reference: reference.to_string(), message: e.to_string() },
            });
            return;
        }
    };
    let mut target = resolved.target;
    if dynamic {
        if let Some(name) = &resolved.dynamic_anchor_name {
            for &scope in ctx.stack.iter().rev() {
                if let Some(found) = ctx.registry.dynamic_anchor_in(scope, name) {
                    target = found;
                    break;
                }
            }
        }
    }

    ctx.ref_depth += 1;
    let sub_instance = Instance { value: instance.value, location: instance.location.clone() };
    let sub = validate_node(ctx, target, Location::root(), sub_instance);
    ctx.ref_depth -= 1;
    result.merge(sub, DefaultMode::Merge);
}

// ---------------------------------------------------------------------
// Metadata / format / content vocabularies (annotation-producing)
// ---------------------------------------------------------------------

fn apply_metadata(d: &Descriptor, instance: &Instance, result: &mut ValidationResult) {
    if let Some(default) = &d.default {
        result.record_default(instance.value.is_some(), default.clone());
    }
    if d.deprecated {
        result.tags.push(Tag { location: instance.location.clone(), kind: TagKind::Deprecated });
    }
    if d.read_only {
        result.tags.push(Tag { location: instance.location.clone(), kind: TagKind::ReadOnly });
    }
    if d.write_only {
        result.tags.push(Tag { location: instance.location.clone(), kind: TagKind::WriteOnly });
    }
}

fn apply_format(
    ctx: &mut ValidationContext,
    resource: ResourceRef,
    d: &Descriptor,
    schema_path: &Location,
    instance: &Instance,
    result: &mut ValidationResult,
) {
    let Some(format_name) = &d.format else { return };
    let Some(Value::String(s)) = instance.value else { return };
    let dialect: &Dialect = ctx.registry.dialect_of(resource.0);
    let assertion = dialect.format_is_assertion();

    let validity = match Format::parse_name(format_name) {
        Some(f) if f.validate(s) => FormatValidity::Valid,
        Some(_) => FormatValidity::Invalid,
        None => FormatValidity::Unknown,
    };
    result.format_constraints.push(FormatConstraint {
        location: instance.location.clone(),
        format: format_name.clone(),
        valid: validity,
    });
    if assertion && validity == FormatValidity::Invalid {
        result.errors.push(ValidationError {
            instance_location: instance.location.clone(),
            schema_resource: resource_id_str(ctx, resource),
            schema_location: schema_path.push_member("format"),
            reason: FailureReason::FormatNotMatched { format: format_name.clone() },
        });
    }
}

fn apply_content(d: &Descriptor, instance: &Instance, result: &mut ValidationResult) {
    if instance.value.is_none() {
        return;
    }
    if let Some(enc) = &d.content_encoding {
        result.tags.push(Tag { location: instance.location.clone(), kind: TagKind::ContentEncoding(enc.clone()) });
    }
    if let Some(mt) = &d.content_media_type {
        result.tags.push(Tag { location: instance.location.clone(), kind: TagKind::ContentMediaType(mt.clone()) });
    }
    if d.content_schema.is_some() {
        result.tags.push(Tag { location: instance.location.clone(), kind: TagKind::ContentSchemaAnnotation });
    }
}

// ---------------------------------------------------------------------
// Validation vocabulary: type / enum / const / numeric / string / simple
// array & object bounds
// ---------------------------------------------------------------------

fn apply_type(
    ctx: &ValidationContext,
    resource: ResourceRef,
    d: &Descriptor,
    schema_path: &Location,
    instance: &Instance,
    result: &mut ValidationResult,
) {
    let Some(types) = &d.ty else { return };
    let Some(v) = instance.value else { return };
    if !types.iter().any(|t| v.is_a(*t)) {
        result.errors.push(ValidationError {
            instance_location: instance.location.clone(),
            schema_resource: resource_id_str(ctx, resource),
            schema_location: schema_path.push_member("type"),
            reason: FailureReason::InvalidType { expected: types.clone(), found: v.kind() },
        });
    }
}

/// Structural equality across the Integer/Float boundary, for
/// `enum`/`const`/`uniqueItems`, delegating straight to [`Value`]'s own
/// `PartialEq`.
fn apply_enum_const(
    ctx: &ValidationContext,
    resource: ResourceRef,
    d: &Descriptor,
    schema_path: &Location,
    instance: &Instance,
    result: &mut ValidationResult,
) {
    let Some(v) = instance.value else { return };
    if let Some(c) = &d.const_ {
        if v != c {
            result.errors.push(ValidationError {
                instance_location: instance.location.clone(),
                schema_resource: resource_id_str(ctx, resource),
                schema_location: schema_path.push_member("const"),
                reason: FailureReason::ConstNotMatched,
            });
        }
    }
    if let Some(options) = &d.enum_ {
        if !options.iter().any(|opt| opt == v) {
            result.errors.push(ValidationError {
                instance_location: instance.location.clone(),
                schema_resource: resource_id_str(ctx, resource),
                schema_location: schema_path.push_member("enum"),
                reason: FailureReason::EnumNotMatched,
            });
        }
    }
}

fn apply_numeric(
    ctx: &ValidationContext,
    resource: ResourceRef,
    d: &Descriptor,
    schema_path: &Location,
    instance: &Instance,
    result: &mut ValidationResult,
) {
    let Some(v) = instance.value else { return };
    let Some(n) = v.as_f64() else { return };

    if let Some(divisor) = d.multiple_of {
        if !is_multiple_of(n, divisor) {
            push(ctx, resource, schema_path, "multipleOf", instance, result, FailureReason::NotMultipleOf { divisor });
        }
    }
    if let Some(max) = d.maximum {
        if n > max {
            push(ctx, resource, schema_path, "maximum", instance, result, FailureReason::AboveMaximum { maximum: max });
        }
    }
    if let Some(max) = d.exclusive_maximum {
        if n >= max {
            push(ctx, resource, schema_path, "exclusiveMaximum", instance, result, FailureReason::AtOrAboveExclusiveMaximum { maximum: max });
        }
    }
    if let Some(min) = d.minimum {
        if n < min {
            push(ctx, resource, schema_path, "minimum", instance, result, FailureReason::BelowMinimum { minimum: min });
        }
    }
    if let Some(min) = d.exclusive_minimum {
        if n <= min {
            push(ctx, resource, schema_path, "exclusiveMinimum", instance, result, FailureReason::AtOrBelowExclusiveMinimum { minimum: min });
        }
    }
}

/// `multipleOf`: an exact modulo when both operands are integral,
/// otherwise a float division check tolerant of the usual binary-fraction
/// rounding noise.
fn is_multiple_of(n: f64, divisor: f64) -> bool {
    if divisor == 0.0 {
        return false;
    }
    if n.fract() == 0.0 && divisor.fract() == 0.0 {
        return (n as i64).checked_rem(divisor as i64).map(|r| r == 0).unwrap_or(false);
    }
    let quotient = n / divisor;
    (quotient - quotient.round()).abs() < 1e-9
}

fn apply_string(
    ctx: &ValidationContext,
    resource: ResourceRef,
    d: &Descriptor,
    schema_path: &Location,
    instance: &Instance,
    result: &mut ValidationResult,
) {
    let Some(Value::String(s)) = instance.value else { return };
    let len = s.chars().count() as u64;

    if let Some(max) = d.max_length {
        if len > max {
            push(ctx, resource, schema_path, "maxLength", instance, result, FailureReason::MaxLengthExceeded { max, actual: len });
        }
    }
    if let Some(min) = d.min_length {
        if len < min {
            push(ctx, resource, schema_path, "minLength", instance, result, FailureReason::MinLengthNotMet { min, actual: len });
        }
    }
    if let Some(pattern) = &d.pattern {
        match Regex::new(pattern) {
            Ok(re) => {
                if !re.is_match(s).unwrap_or(false) {
                    push(ctx, resource, schema_path, "pattern", instance, result, FailureReason::PatternNotMatching { pattern: pattern.clone() });
                }
            }
            Err(_) => push(ctx, resource, schema_path, "pattern", instance, result, FailureReason::PatternNotMatching { pattern: pattern.clone() }),
        }
    }
}

fn apply_array_bounds(
    ctx: &ValidationContext,
    resource: ResourceRef,
    d: &Descriptor,
    schema_path: &Location,
    instance: &Instance,
    result: &mut ValidationResult,
) {
    let Some(Value::Array(items)) = instance.value else { return };
    let len = items.len() as u64;

    if let Some(max) = d.max_items {
        if len > max {
            push(ctx, resource, schema_path, "maxItems", instance, result, FailureReason::MaxItemsExceeded { max, actual: len });
        }
    }
    if let Some(min) = d.min_items {
        if len < min {
            push(ctx, resource, schema_path, "minItems", instance, result, FailureReason::MinItemsNotMet { min, actual: len });
        }
    }
    if d.unique_items {
        let has_dup = items.iter().enumerate().any(|(i, a)| items[..i].iter().any(|b| a == b));
        if has_dup {
            push(ctx, resource, schema_path, "uniqueItems", instance, result, FailureReason::ItemsNotUnique);
        }
    }
}

fn apply_object_bounds(
    ctx: &ValidationContext,
    resource: ResourceRef,
    d: &Descriptor,
    schema_path: &Location,
    instance: &Instance,
    result: &mut ValidationResult,
) {
    let Some(Value::Object(obj)) = instance.value else { return };
    let len = obj.len() as u64;

    if let Some(max) = d.max_properties {
        if len > max {
            push(ctx, resource, schema_path, "maxProperties", instance, result, FailureReason::MaxPropertiesExceeded { max, actual: len });
        }
    }
    if let Some(min) = d.min_properties {
        if len < min {
            push(ctx, resource, schema_path, "minProperties", instance, result, FailureReason::MinPropertiesNotMet { min, actual: len });
        }
    }
    if !d.required.is_empty() {
        let missing: Vec<String> = d.required.iter().filter(|name| !obj.contains_key(*name)).cloned().sorted().collect();
        if !missing.is_empty() {
            push(ctx, resource, schema_path, "required", instance, result, FailureReason::PropertiesMissing { names: missing });
        }
    }
    for (key, names) in &d.dependent_required {
        if !obj.contains_key(key) {
            continue;
        }
        let missing: Vec<String> = names.iter().filter(|n| !obj.contains_key(*n)).cloned().sorted().collect();
        if !missing.is_empty() {
            push(
                ctx,
                resource,
                schema_path,
                "dependentRequired",
                instance,
                result,
                FailureReason::DependentPropertiesMissing { key: key.clone(), names: missing },
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn push(
    ctx: &ValidationContext,
    resource: ResourceRef,
    schema_path: &Location,
    keyword: &'static str,
    instance: &Instance,
    result: &mut ValidationResult,
    reason: FailureReason,
) {
    result.errors.push(ValidationError {
        instance_location: instance.location.clone(),
        schema_resource: resource_id_str(ctx, resource),
        schema_location: schema_path.push_member(keyword),
        reason,
    });
}

// ---------------------------------------------------------------------
// Applicator vocabulary: arrays (prefixItems / items / contains)
// ---------------------------------------------------------------------

fn apply_array_applicators(
    ctx: &mut ValidationContext,
    resource: ResourceRef,
    d: &Descriptor,
    schema_path: &Location,
    instance: &Instance,
    result: &mut ValidationResult,
) {
    let Some(Value::Array(items)) = instance.value else { return };

    let prefix_len = d.prefix_items.len();
    for (i, sub_schema) in d.prefix_items.iter().enumerate() {
        if i >= items.len() {
            break;
        }
        let child = child_resource(ctx, resource, sub_schema);
        let sub = validate_node(
            ctx,
            child,
            schema_path.push_member("prefixItems").push_index(i as i64),
            instance.child_index(&items[i], i),
        );
        let ok = sub.is_valid();
        result.merge(sub, DefaultMode::Merge);
        if ok {
            result.evaluated_items.insert(i);
        }
    }

    if let Some(items_schema) = &d.items {
        let child = child_resource(ctx, resource, items_schema);
        for (i, item) in items.iter().enumerate().skip(prefix_len) {
            let sub = validate_node(ctx, child, schema_path.push_member("items"), instance.child_index(item, i));
            let ok = sub.is_valid();
            result.merge(sub, DefaultMode::Merge);
            if ok {
                result.evaluated_items.insert(i);
            }
        }
    }

    if let Some(contains_schema) = &d.contains {
        let child = child_resource(ctx, resource, contains_schema);
        let min_contains = d.min_contains.unwrap_or(1);
        let max_contains = d.max_contains;
        let mut count: u64 = 0;
        for (i, item) in items.iter().enumerate() {
            let sub = validate_node(ctx, child, schema_path.push_member("contains"), instance.child_index(item, i));
            if sub.is_valid() {
                count += 1;
                result.evaluated_items.insert(i);
                result.absorb_annotations(&sub, DefaultMode::Suppress);
            }
        }
        let within_max = max_contains.map(|m| count <= m).unwrap_or(true);
        if count < min_contains || !within_max {
            push(
                ctx,
                resource,
                schema_path,
                "contains",
                instance,
                result,
                FailureReason::ContainCountMismatch { min: min_contains, max: max_contains, actual: count },
            );
        }
    }
}

// ---------------------------------------------------------------------
// Applicator vocabulary: objects (properties / patternProperties /
// additionalProperties / propertyNames / dependentSchemas)
// ---------------------------------------------------------------------

fn apply_object_applicators(
    ctx: &mut ValidationContext,
    resource: ResourceRef,
    d: &Descriptor,
    schema_path: &Location,
    instance: &Instance,
    result: &mut ValidationResult,
) {
    let Some(Value::Object(obj)) = instance.value else { return };

    let mut covered: FxHashSet<&str> = FxHashSet::default();

    for (key, sub_schema) in &d.properties {
        let child = child_resource(ctx, resource, sub_schema);
        let path = schema_path.push_member("properties").push_member(key);
        match obj.get(key) {
            Some(v) => {
                covered.insert(key.as_str());
                let sub = validate_node(ctx, child, path, instance.child_member(Some(v), key));
                let ok = sub.is_valid();
                result.merge(sub, DefaultMode::Merge);
                if ok {
                    result.evaluated_properties.insert(key.clone());
                }
            }
            None => {
                // Probe validation against a non-existing Located Value
                // so `default` can still be collected — only defaults
                // propagate, never errors.
                let probe = validate_node(ctx, child, path, instance.child_member(None, key));
                result.absorb_annotations(&probe, DefaultMode::Merge);
            }
        }
    }

    for (pattern, sub_schema) in &d.pattern_properties {
        let Ok(re) = Regex::new(pattern) else { continue };
        let child = child_resource(ctx, resource, sub_schema);
        for (key, v) in obj {
            if !re.is_match(key).unwrap_or(false) {
                continue;
            }
            covered.insert(key.as_str());
            let path = schema_path.push_member("patternProperties").push_member(pattern);
            let sub = validate_node(ctx, child, path, instance.child_member(Some(v), key));
            let ok = sub.is_valid();
            result.merge(sub, DefaultMode::Merge);
            if ok {
                result.evaluated_properties.insert(key.clone());
            }
        }
    }

    if let Some(additional) = &d.additional_properties {
        let child = child_resource(ctx, resource, additional);
        for (key, v) in obj {
            if covered.contains(key.as_str()) {
                continue;
            }
            let path = schema_path.push_member("additionalProperties");
            let sub = validate_node(ctx, child, path, instance.child_member(Some(v), key));
            let ok = sub.is_valid();
            result.merge(sub, DefaultMode::Merge);
            if ok {
                result.evaluated_properties.insert(key.clone());
            }
        }
    }

    if let Some(names_schema) = &d.property_names {
        let child = child_resource(ctx, resource, names_schema);
        for key in obj.keys() {
            let path = schema_path.push_member("propertyNames");
            let key_instance = Instance { value: None, location: instance.location.push_member(key) };
            let name_as_value = Value::String(key.clone());
            let sub = validate_node(ctx, child, path, Instance { value: Some(&name_as_value), location: key_instance.location });
            result.merge(sub, DefaultMode::Merge);
        }
    }

    for (key, sub_schema) in &d.dependent_schemas {
        if !obj.contains_key(key) {
            continue;
        }
        let child = child_resource(ctx, resource, sub_schema);
        let path = schema_path.push_member("dependentSchemas").push_member(key);
        let sub = validate_node(ctx, child, path, Instance { value: instance.value, location: instance.location.clone() });
        result.merge(sub, DefaultMode::Merge);
    }
}

// ---------------------------------------------------------------------
// Applicator vocabulary: logical combinators (allOf / anyOf / oneOf / not
// / if-then-else)
// ---------------------------------------------------------------------

fn apply_logical_applicators(
    ctx: &mut ValidationContext,
    resource: ResourceRef,
    d: &Descriptor,
    schema_path: &Location,
    instance: &Instance,
    result: &mut ValidationResult,
) {
    for (i, sub_schema) in d.all_of.iter().enumerate() {
        let child = child_resource(ctx, resource, sub_schema);
        let path = schema_path.push_member("allOf").push_index(i as i64);
        let sub = validate_node(ctx, child, path, Instance { value: instance.value, location: instance.location.clone() });
        result.merge(sub, DefaultMode::Merge);
    }

    if !d.any_of.is_empty() {
        let branches: Vec<ValidationResult> = d
            .any_of
            .iter()
            .enumerate()
            .map(|(i, sub_schema)| {
                let child = child_resource(ctx, resource, sub_schema);
                let path = schema_path.push_member("anyOf").push_index(i as i64);
                validate_node(ctx, child, path, Instance { value: instance.value, location: instance.location.clone() })
            })
            .collect();
        let any_passed = branches.iter().any(ValidationResult::is_valid);
        if any_passed {
            for branch in branches.into_iter().filter(ValidationResult::is_valid) {
                result.merge(branch, DefaultMode::Alternative);
            }
        } else {
            for branch in branches {
                result.merge(branch, DefaultMode::Alternative);
            }
            push(ctx, resource, schema_path, "anyOf", instance, result, FailureReason::AnyOfNotMatched);
        }
    }

    if !d.one_of.is_empty() {
        let branches: Vec<ValidationResult> = d
            .one_of
            .iter()
            .enumerate()
            .map(|(i, sub_schema)| {
                let child = child_resource(ctx, resource, sub_schema);
                let path = schema_path.push_member("oneOf").push_index(i as i64);
                validate_node(ctx, child, path, Instance { value: instance.value, location: instance.location.clone() })
            })
            .collect();
        let matched = branches.iter().filter(|b| b.is_valid()).count();
        if matched == 1 {
            for branch in branches.into_iter().filter(ValidationResult::is_valid) {
                result.merge(branch, DefaultMode::Alternative);
            }
        } else {
            push(ctx, resource, schema_path, "oneOf", instance, result, FailureReason::OneOfNotMatched { matched });
        }
    }

    if let Some(not_schema) = &d.not {
        let child = child_resource(ctx, resource, not_schema);
        let path = schema_path.push_member("not");
        let sub = validate_node(ctx, child, path, Instance { value: instance.value, location: instance.location.clone() });
        if sub.is_valid() {
            push(ctx, resource, schema_path, "not", instance, result, FailureReason::NotIsValid);
        }
    }

    if let Some(if_schema) = &d.if_ {
        let child = child_resource(ctx, resource, if_schema);
        let path = schema_path.push_member("if");
        let if_result = validate_node(ctx, child, path, Instance { value: instance.value, location: instance.location.clone() });
        result.absorb_annotations(&if_result, DefaultMode::Suppress);
        if if_result.is_valid() {
            if let Some(then_schema) = &d.then {
                let child = child_resource(ctx, resource, then_schema);
                let path = schema_path.push_member("then");
                let sub = validate_node(ctx, child, path, Instance { value: instance.value, location: instance.location.clone() });
                result.merge(sub, DefaultMode::Merge);
            }
        } else if let Some(else_schema) = &d.else_ {
            let child = child_resource(ctx, resource, else_schema);
            let path = schema_path.push_member("else");
            let sub = validate_node(ctx, child, path, Instance { value: instance.value, location: instance.location.clone() });
            result.merge(sub, DefaultMode::Merge);
        }
    }
}

// ---------------------------------------------------------------------
// Unevaluated vocabulary: runs last, consulting whatever `evaluated*`
// sets the applicator block above accumulated.
// ---------------------------------------------------------------------

fn apply_unevaluated(
    ctx: &mut ValidationContext,
    resource: ResourceRef,
    d: &Descriptor,
    schema_path: &Location,
    instance: &Instance,
    result: &mut ValidationResult,
) {
    if let Some(schema) = &d.unevaluated_properties {
        if let Some(Value::Object(obj)) = instance.value {
            let child = child_resource(ctx, resource, schema);
            let path = schema_path.push_member("unevaluatedProperties");
            let keys: Vec<String> = obj
                .keys()
                .filter(|k| !result.evaluated_properties.contains(k.as_str()))
                .cloned()
                .collect();
            for key in keys {
                let v = obj.get(&key).expect("key came from this object");
                let sub = validate_node(ctx, child, path.clone(), instance.child_member(Some(v), &key));
                let ok = sub.is_valid();
                result.merge(sub, DefaultMode::Merge);
                if ok {
                    result.evaluated_properties.insert(key);
                }
            }
        }
    }

    if let Some(schema) = &d.unevaluated_items {
        if let Some(Value::Array(items)) = instance.value {
            let child = child_resource(ctx, resource, schema);
            let path = schema_path.push_member("unevaluatedItems");
            let indices: Vec<usize> = (0..items.len()).filter(|i| !result.evaluated_items.contains(i)).collect();
            for i in indices {
                let sub = validate_node(ctx, child, path.clone(), instance.child_index(&items[i], i));
                let ok = sub.is_valid();
                result.merge(sub, DefaultMode::Merge);
                if ok {
                    result.evaluated_items.insert(i);
                } else {
                    push(
                        ctx,
                        resource,
                        schema_path,
                        "unevaluatedItems",
                        instance,
                        result,
                        FailureReason::UnevaluatedItemNotAllowed { index: i },
                    );
                }
            }
        }
    }
}

/// Builds the schema for an ad hoc, never-registered instance (used by
/// [`crate::registry::Registry::register_document`] callers that only want
/// a one-shot validation without pre-registering a document). Exposed so
/// integration tests and callers outside this crate don't need to reach
/// into `build`/`resource` directly for the common case.
pub fn validate_document(registry: &mut Registry, raw: &Value, instance: &Value) -> Result<ValidationResult, crate::registry::ResolveError> {
    let root = registry.register_document(raw, Identifier::new(synthesize_base()))?;
    Ok(validate(registry, root, instance))
}

fn synthesize_base() -> String {
    format!("urn:uuid:{}", uuid::Uuid::new_v4())
}
