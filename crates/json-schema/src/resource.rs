//! Schema Resource construction: walks a built [`Schema`] by its known
//! applicator keywords, assigning every reachable sub-schema its own
//! [`Resource`] entry in a flat arena of plain structs addressed by
//! [`ResourceId`], rather than a self-referential `Arc<Schema>` graph —
//! owning downward links (`Vec<Resource>`) plus a non-owning upward link
//! (`outer: Option<ResourceId>`, just a `usize`, `Copy`) instead of a weak
//! pointer.

use crate::identifier::Identifier;
use crate::model::Schema;
use indexmap::IndexMap;
use json::{Location, Segment};
use url::Url;
use uuid::Uuid;

/// Index into a resource arena. Cheap, `Copy`, never dangles once the arena
/// that produced it is kept alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub usize);

/// An `$anchor` or `$dynamicAnchor` table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Static(ResourceId),
    Dynamic(ResourceId),
}

/// One schema plus its place in the resource graph.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Absolute identifier; synthesized when the schema carries no `$id`.
    pub id: Identifier,
    pub schema: Schema,
    /// The nearest enclosing non-anonymous Resource; `None` only for the
    /// root.
    pub outer: Option<ResourceId>,
    /// Every sub-schema reachable from *this* resource's own root through
    /// known applicator keywords, before crossing into a nested resource's
    /// own root, keyed by its location relative to this resource.
    pub nested: IndexMap<Location, ResourceId>,
    pub anchors: IndexMap<String, Anchor>,
    /// Present only when this resource's own schema declared `$anchor`
    /// alongside `$id`.
    pub self_anchor: Option<String>,
    pub dynamic_self_anchor: Option<String>,
    /// Segment count from the nearest non-anonymous outer.
    pub distance: usize,
}

/// The resource arena produced by [`build`]; index 0 is always the root.
#[derive(Debug, Clone)]
pub struct ResourceArena {
    resources: Vec<Resource>,
}

impl ResourceArena {
    pub fn root(&self) -> ResourceId {
        ResourceId(0)
    }

    pub fn get(&self, id: ResourceId) -> &Resource {
        &self.resources[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &Resource)> {
        self.resources.iter().enumerate().map(|(i, r)| (ResourceId(i), r))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resolves a relative anchor/pointer lookup starting at `from`, walking
    /// up through `outer` links until a match is found or the chain is
    /// exhausted (used when a fragment fails to resolve against the
    /// immediately enclosing resource, e.g. an anchor hoisted several
    /// anonymous levels up).
    pub fn anchor(&self, from: ResourceId, name: &str) -> Option<Anchor> {
        let mut cur = Some(from);
        while let Some(id) = cur {
            let r = self.get(id);
            if let Some(a) = r.anchors.get(name) {
                return Some(*a);
            }
            cur = r.outer;
        }
        None
    }
}

/// Walks `root`, assigning every reachable sub-schema its own resource,
/// and returns the resulting arena. `default_base` anchors relative `$id`s
/// when the root schema declares none of its own.
pub fn build(root: Schema, default_base: &Identifier) -> ResourceArena {
    let mut resources = Vec::new();
    let default_base_url =
        Url::parse(default_base.as_str()).unwrap_or_else(|_| synthesize_url());
    walk(&root, Location::root(), None, &default_base_url, &mut resources);
    ResourceArena { resources }
}

/// Builds a throwaway single-resource arena around `schema`, used by the
/// Registry when a `$ref`'s fragment points into a keyword `walk` doesn't
/// enumerate via the `raw` companion (e.g. a fragment that lands inside
/// `examples` or a vendor extension): the fragment is then
/// resolved by navigating `schema.raw()` directly rather than through
/// `nested`, so this arena exists only to give that ad-hoc schema a
/// `Resource`/`ResourceId` the rest of the validator can address uniformly.
pub fn ephemeral(schema: Schema) -> ResourceArena {
    ResourceArena {
        resources: vec![Resource {
            id: Identifier::new(""),
            schema,
            outer: None,
            nested: IndexMap::new(),
            anchors: IndexMap::new(),
            self_anchor: None,
            dynamic_self_anchor: None,
            distance: 0,
        }],
    }
}

fn synthesize_url() -> Url {
    let uuid = Uuid::new_v4();
    Url::parse(&format!("urn:uuid:{uuid}")).expect("urn:uuid: URLs are always well-formed")
}

/// Recursively visits `schema`, located at `relative_location` inside the
/// resource owning it (`owner`, `None` only on the very first call), and
/// returns this sub-schema's own [`ResourceId`].
fn walk(
    schema: &Schema,
    relative_location: Location,
    owner: Option<ResourceId>,
    enclosing_base: &Url,
    resources: &mut Vec<Resource>,
) -> ResourceId {
    let own_id = ResourceId(resources.len());
    resources.push(placeholder());

    let descriptor = schema.as_descriptor();
    let own_raw_id = descriptor.and_then(|d| d.id.as_deref());

    let (absolute, is_non_anonymous, base_for_children) = match own_raw_id {
        Some(raw) => {
            let resolved = Identifier::new(raw)
                .relative(enclosing_base)
                .unwrap_or_else(|_| enclosing_base.clone());
            (Identifier::new(resolved.to_string()), true, resolved)
        }
        None if owner.is_none() => {
            // Root with no `$id` of its own: the default base stands in.
            (Identifier::new(enclosing_base.to_string()), true, enclosing_base.clone())
        }
        None => {
            // Anonymous: identified by the owner's base plus a JSON
            // Pointer fragment to this location, purely descriptive.
            let fragment = relative_location
                .to_pointer()
                .map(|p| p.to_string())
                .unwrap_or_default();
            let mut url = enclosing_base.clone();
            url.set_fragment(Some(&fragment));
            (Identifier::new(url.to_string()), false, enclosing_base.clone())
        }
    };

    let outer = if is_non_anonymous { own_id } else { owner.unwrap_or(own_id) };
    let distance = if is_non_anonymous { 0 } else { relative_location.segments().len() };

    let (own_anchor, own_dynamic_anchor) = match descriptor {
        Some(d) if is_non_anonymous => (d.anchor.clone(), d.dynamic_anchor.clone()),
        _ => (None, None),
    };

    resources[own_id.0] = Resource {
        id: absolute,
        schema: schema.clone(),
        outer: if own_id == outer { None.or(owner) } else { Some(outer) },
        nested: IndexMap::new(),
        anchors: IndexMap::new(),
        self_anchor: own_anchor,
        dynamic_self_anchor: own_dynamic_anchor,
        distance,
    };

    if let Some(owner_id) = owner {
        let owner_relative = if is_non_anonymous {
            // Registered in the grandparent's `nested` table under the
            // location that introduced this new resource.
            relative_location.clone()
        } else {
            relative_location.clone()
        };
        resources[owner_id.0].nested.insert(owner_relative, own_id);
    }

    // Anchors not co-located with `$id` hoist to the enclosing
    // non-anonymous resource's anchor table, pointing back at this
    // resource.
    if !is_non_anonymous {
        if let Some(d) = descriptor {
            if let Some(name) = &d.anchor {
                resources[outer.0].anchors.insert(name.clone(), Anchor::Static(own_id));
            }
            if let Some(name) = &d.dynamic_anchor {
                resources[outer.0].anchors.insert(name.clone(), Anchor::Dynamic(own_id));
            }
        }
    } else if let Some(d) = descriptor {
        if let Some(name) = &d.anchor {
            resources[own_id.0].anchors.insert(name.clone(), Anchor::Static(own_id));
        }
        if let Some(name) = &d.dynamic_anchor {
            resources[own_id.0].anchors.insert(name.clone(), Anchor::Dynamic(own_id));
        }
    }

    let child_relative_base = if is_non_anonymous { Location::root() } else { relative_location };
    let child_owner = Some(outer);

    for (segment, child) in applicator_children(descriptor) {
        let child_location = push(&child_relative_base, segment);
        walk(child, child_location, child_owner, &base_for_children, resources);
    }

    own_id
}

fn push(base: &Location, segment: OwnedSegment) -> Location {
    match segment {
        OwnedSegment::Member(name) => base.push_member(name),
        OwnedSegment::Index(i) => base.push_index(i),
    }
}

enum OwnedSegment {
    Member(String),
    Index(i64),
}

/// Enumerates every sub-schema reachable through a known applicator
/// keyword, in document order, paired with the Location segment that
/// reaches it.
fn applicator_children(descriptor: Option<&crate::model::Descriptor>) -> Vec<(OwnedSegment, &Schema)> {
    let Some(d) = descriptor else { return Vec::new() };
    let mut out = Vec::new();
    let member = |s: &str| OwnedSegment::Member(s.to_string());

    for (name, s) in &d.defs {
        out.push((member(name), s));
    }
    for (i, s) in d.all_of.iter().enumerate() {
        out.push((OwnedSegment::Index(i as i64), s));
    }
    for (i, s) in d.any_of.iter().enumerate() {
        out.push((OwnedSegment::Index(i as i64), s));
    }
    for (i, s) in d.one_of.iter().enumerate() {
        out.push((OwnedSegment::Index(i as i64), s));
    }
    if let Some(s) = &d.not {
        out.push((member("not"), s));
    }
    if let Some(s) = &d.if_ {
        out.push((member("if"), s));
    }
    if let Some(s) = &d.then {
        out.push((member("then"), s));
    }
    if let Some(s) = &d.else_ {
        out.push((member("else"), s));
    }
    for (name, s) in &d.properties {
        out.push((member(name), s));
    }
    for (pattern, s) in &d.pattern_properties {
        out.push((member(pattern), s));
    }
    if let Some(s) = &d.additional_properties {
        out.push((member("additionalProperties"), s));
    }
    if let Some(s) = &d.property_names {
        out.push((member("propertyNames"), s));
    }
    for (i, s) in d.prefix_items.iter().enumerate() {
        out.push((OwnedSegment::Index(i as i64), s));
    }
    if let Some(s) = &d.items {
        out.push((member("items"), s));
    }
    if let Some(s) = &d.contains {
        out.push((member("contains"), s));
    }
    for (name, s) in &d.dependent_schemas {
        out.push((member(name), s));
    }
    if let Some(s) = &d.unevaluated_properties {
        out.push((member("unevaluatedProperties"), s));
    }
    if let Some(s) = &d.unevaluated_items {
        out.push((member("unevaluatedItems"), s));
    }
    out
}

fn placeholder() -> Resource {
    Resource {
        id: Identifier::new(""),
        schema: Schema::Bool(true),
        outer: None,
        nested: IndexMap::new(),
        anchors: IndexMap::new(),
        self_anchor: None,
        dynamic_self_anchor: None,
        distance: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build as build_schema;
    use json::jsonv;

    fn base() -> Identifier {
        Identifier::new("https://example.com/root.json")
    }

    #[test]
    fn root_resource_gets_explicit_id() {
        let schema = build_schema(&jsonv!({"type": "object"})).unwrap();
        let arena = build(schema, &base());
        assert_eq!(arena.get(arena.root()).id.as_str(), "https://example.com/root.json");
        assert_eq!(arena.get(arena.root()).outer, None);
    }

    #[test]
    fn nested_schema_with_own_id_becomes_a_new_resource() {
        let schema = build_schema(&jsonv!({
            "$id": "https://example.com/root.json",
            "properties": {
                "a": {"$id": "other.json", "type": "string"}
            }
        }))
        .unwrap();
        let arena = build(schema, &base());
        let root = arena.root();
        assert_eq!(arena.get(root).nested.len(), 1);
        let (_, &child_id) = arena.get(root).nested.iter().next().unwrap();
        let child = arena.get(child_id);
        assert_eq!(child.id.as_str(), "https://example.com/other.json");
        assert_eq!(child.outer, Some(root));
        assert_eq!(child.distance, 0);
    }

    #[test]
    fn anonymous_nested_schema_inherits_owner_and_records_distance() {
        let schema = build_schema(&jsonv!({
            "$id": "https://example.com/root.json",
            "properties": {
                "a": {
                    "properties": {
                        "b": {"type": "string"}
                    }
                }
            }
        }))
        .unwrap();
        let arena = build(schema, &base());
        let root = arena.root();
        // root -> a (anonymous) -> b (anonymous), both owned by root.
        assert_eq!(arena.len(), 3);
        for (id, resource) in arena.iter().skip(1) {
            assert_eq!(resource.outer, Some(root), "resource {id:?} should be owned by root");
        }
    }

    #[test]
    fn anchor_without_sibling_id_hoists_to_enclosing_resource() {
        let schema = build_schema(&jsonv!({
            "$id": "https://example.com/root.json",
            "$defs": {
                "named": {"$anchor": "Named", "type": "string"}
            }
        }))
        .unwrap();
        let arena = build(schema, &base());
        let root = arena.root();
        assert!(matches!(arena.anchor(root, "Named"), Some(Anchor::Static(_))));
    }

    #[test]
    fn anchor_alongside_id_stays_on_its_own_resource() {
        let schema = build_schema(&jsonv!({
            "$id": "https://example.com/root.json",
            "$defs": {
                "named": {"$id": "named.json", "$anchor": "Named", "type": "string"}
            }
        }))
        .unwrap();
        let arena = build(schema, &base());
        let root = arena.root();
        assert_eq!(arena.get(root).anchors.get("Named"), None);
        let (_, &child_id) = arena.get(root).nested.iter().next().unwrap();
        assert_eq!(arena.get(child_id).self_anchor.as_deref(), Some("Named"));
    }
}
