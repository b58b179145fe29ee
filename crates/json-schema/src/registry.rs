//! Registry and `$ref` resolution: a monotonic, append-only table of known
//! Resources plus an ordered list of Providers consulted on a cache miss,
//! built directly against this crate's own
//! [`crate::resource::ResourceArena`] rather than an `Arc`-based index.

use crate::build::{self, BuildError};
use crate::dialect::Dialect;
use crate::identifier::Identifier;
use crate::model::Schema;
use crate::resource::{self, Anchor, ResourceArena, ResourceId};
use indexmap::IndexMap;
use json::{Location, Pointer, Value};
use thiserror::Error;
use url::Url;

/// Addresses one Resource inside a [`Registry`]: which document it came
/// from, and its id within that document's arena.
pub type ResourceRef = (usize, ResourceId);

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolveError {
    #[error("cannot resolve reference {reference:?} against {base}: {message}")]
    Identifier { reference: String, base: String, message: String },
    #[error("no Resource registered for base URI {0:?} and no Provider could materialize it")]
    UnknownBase(String),
    #[error("fragment {fragment:?} does not resolve against {base:?}")]
    UnknownFragment { base: String, fragment: String },
    #[error("no anchor named {name:?} in {base:?}")]
    UnknownAnchor { base: String, name: String },
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// A document materializer consulted on a Registry cache miss: given an
/// absolute schema URI, either returns bytes or declines. Kept
/// deliberately minimal — retrieval itself (file/network I/O) stays an
/// external concern; a `Provider` only needs to decide whether it CAN
/// produce bytes for a URI, not how the bytes eventually get there.
pub trait Provider {
    fn fetch(&self, uri: &str) -> Option<Vec<u8>>;
}

/// Maps every file under a directory to a URI by combining the file's
/// path (relative to `base_dir`) with `mount`. Byte retrieval itself is
/// delegated to an injected closure rather than this crate opening files
/// directly, keeping file/URL loading as an external `fetch(uri) -> bytes`
/// capability.
pub struct FileProvider {
    mount: Url,
    fetch: Box<dyn Fn(&str) -> Option<Vec<u8>>>,
}

impl FileProvider {
    pub fn new(mount: Url, fetch: impl Fn(&str) -> Option<Vec<u8>> + 'static) -> FileProvider {
        FileProvider { mount, fetch: Box::new(fetch) }
    }

    /// The relative filesystem path (no leading `/`) that `uri` maps to
    /// under this provider's mount point, or `None` if `uri` falls outside
    /// it.
    pub fn relative_path(&self, uri: &str) -> Option<String> {
        let parsed = Url::parse(uri).ok()?;
        if parsed.scheme() != self.mount.scheme() || parsed.host_str() != self.mount.host_str() {
            return None;
        }
        parsed.path().strip_prefix(self.mount.path())?.trim_start_matches('/').to_string().into()
    }
}

impl Provider for FileProvider {
    fn fetch(&self, uri: &str) -> Option<Vec<u8>> {
        self.relative_path(uri)?;
        (self.fetch)(uri)
    }
}

/// Builds a [`Registry`]. A dedicated `*Builder` for multi-field config
/// rather than a constructor with a long parameter list.
pub struct RegistryBuilder {
    default_dialect: Dialect,
    dialects: IndexMap<String, Dialect>,
    providers: Vec<Box<dyn Provider>>,
}

impl RegistryBuilder {
    pub fn new() -> RegistryBuilder {
        let mut dialects = IndexMap::new();
        dialects.insert(crate::dialect::DRAFT_2020_12.to_string(), Dialect::draft2020_12());
        RegistryBuilder { default_dialect: Dialect::draft2020_12(), dialects, providers: Vec::new() }
    }

    pub fn default_dialect(mut self, dialect: Dialect) -> RegistryBuilder {
        self.default_dialect = dialect;
        self
    }

    pub fn dialect(mut self, schema_uri: impl Into<String>, dialect: Dialect) -> RegistryBuilder {
        self.dialects.insert(schema_uri.into(), dialect);
        self
    }

    pub fn provider(mut self, provider: impl Provider + 'static) -> RegistryBuilder {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            default_dialect: self.default_dialect,
            dialects: self.dialects,
            providers: self.providers,
            documents: Vec::new(),
            doc_dialects: Vec::new(),
            by_base: IndexMap::new(),
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> RegistryBuilder {
        RegistryBuilder::new()
    }
}

/// The one mutable component in this crate: an append-only table of
/// Resources plus Providers consulted on a miss. Registration is
/// monotonic — entries are added, never replaced, so callers may freely
/// share `&Registry` across read-only validations once populated.
pub struct Registry {
    default_dialect: Dialect,
    dialects: IndexMap<String, Dialect>,
    providers: Vec<Box<dyn Provider>>,
    documents: Vec<ResourceArena>,
    /// The dialect each document in `documents` was registered under,
    /// chosen by matching its root `$schema` against `dialects`.
    doc_dialects: Vec<Dialect>,
    /// Absolute identifier (no fragment) of every non-anonymous Resource,
    /// across every registered document, to its `ResourceRef`.
    by_base: IndexMap<String, ResourceRef>,
}

/// The outcome of resolving a `$ref`/`$dynamicRef` string.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRef {
    pub target: ResourceRef,
    /// Set when the fragment resolved through a `$dynamicAnchor`-bearing
    /// anchor entry; the caller re-checks the active Resource stack for an
    /// overriding dynamic scope match only in that case.
    pub dynamic_anchor_name: Option<String>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn arena(&self, doc: usize) -> &ResourceArena {
        &self.documents[doc]
    }

    pub fn resource(&self, r: ResourceRef) -> &resource::Resource {
        self.arena(r.0).get(r.1)
    }

    pub fn schema(&self, r: ResourceRef) -> &Schema {
        &self.resource(r).schema
    }

    pub fn dialect_for(&self, schema_uri: Option<&str>) -> &Dialect {
        schema_uri.and_then(|uri| self.dialects.get(uri)).unwrap_or(&self.default_dialect)
    }

    pub fn dialect_of(&self, doc: usize) -> &Dialect {
        &self.doc_dialects[doc]
    }

    /// Looks up an already-registered, non-anonymous Resource by its
    /// absolute identifier (no fragment), without attempting to fetch it
    /// from a Provider on a miss. Used by the validator to re-enter the
    /// correct resource scope when a sub-schema declares its own `$id`,
    /// since the minimal relative addressing `resource::build`
    /// assigns to `nested` entries doesn't by itself tell the validator
    /// which Resource a given sub-schema's descendants should resolve
    /// `$ref`/`$dynamicRef` against.
    pub fn by_base(&self, base: &str) -> Option<ResourceRef> {
        self.by_base.get(base).copied()
    }

    /// Parses and registers `raw` as a new document rooted at
    /// `default_base`, assigning every sub-schema its own Resource and
    /// indexing every non-anonymous one by absolute identifier.
    pub fn register_document(&mut self, raw: &Value, default_base: Identifier) -> Result<ResourceRef, ResolveError> {
        let schema = build::build(raw)?;
        let dialect_uri = schema.as_descriptor().and_then(|d| d.schema_dialect.clone());
        tracing::debug!(base = %default_base, schema = dialect_uri.as_deref().unwrap_or("(default)"), "registering schema document");
        let dialect = self.dialect_for(dialect_uri.as_deref()).clone();

        let arena = resource::build(schema, &default_base);
        let doc_index = self.documents.len();
        for (id, r) in arena.iter() {
            if r.distance == 0 {
                self.by_base.entry(r.id.as_str().to_string()).or_insert((doc_index, id));
            }
        }
        let root_id = arena.root();
        self.documents.push(arena);
        self.doc_dialects.push(dialect);
        Ok((doc_index, root_id))
    }

    /// Registers a schema that exists only to answer one `$ref`, with no
    /// stable absolute identity of its own (the "raw companion" escape
    /// hatch for fragments pointing into keywords [`resource::build`]
    /// doesn't enumerate).
    fn register_ephemeral(&mut self, schema: Schema) -> ResourceRef {
        let doc_index = self.documents.len();
        self.documents.push(resource::ephemeral(schema));
        (doc_index, ResourceId(0))
    }

    fn locate_base(&mut self, base: &str) -> Result<ResourceRef, ResolveError> {
        if let Some(found) = self.by_base.get(base) {
            return Ok(*found);
        }
        for provider in &self.providers {
            if let Some(bytes) = provider.fetch(base) {
                let value: serde_json::Value = serde_json::from_slice(&bytes)
                    .map_err(|e| ResolveError::Identifier { reference: base.to_string(), base: base.to_string(), message: e.to_string() })?;
                let value: Value = value.into();
                let registered = self.register_document(&value, Identifier::new(base.to_string()))?;
                self.by_base.entry(base.to_string()).or_insert(registered);
                return Ok(registered);
            }
        }
        Err(ResolveError::UnknownBase(base.to_string()))
    }

    /// Resolves `reference` (a `$ref`/`$dynamicRef`/`$recursiveRef` value)
    /// relative to the Resource currently holding it; the dynamic-scope
    /// override is applied by the caller via
    /// [`Registry::dynamic_anchor_in`] when `dynamic_anchor_name` is set.
    pub fn resolve(&mut self, from: ResourceRef, reference: &str) -> Result<ResolvedRef, ResolveError> {
        let current = self.resource(from);
        let current_url = Url::parse(current.id.as_str()).map_err(|e| ResolveError::Identifier {
            reference: reference.to_string(),
            base: current.id.as_str().to_string(),
            message: e.to_string(),
        })?;
        let identifier = Identifier::new(reference.to_string());
        let resolved = identifier.relative(&current_url).map_err(|e| ResolveError::Identifier {
            reference: reference.to_string(),
            base: current.id.as_str().to_string(),
            message: e.to_string(),
        })?;

        let mut base_url = resolved.clone();
        base_url.set_fragment(None);
        let base_str = base_url.to_string();
        let fragment = resolved.fragment().unwrap_or("").to_string();

        let base_ref = self.locate_base(&base_str)?;
        self.resolve_fragment(base_ref, &base_str, &fragment)
    }

    fn resolve_fragment(&mut self, base_ref: ResourceRef, base_str: &str, fragment: &str) -> Result<ResolvedRef, ResolveError> {
        if fragment.is_empty() {
            return Ok(ResolvedRef { target: base_ref, dynamic_anchor_name: None });
        }
        if let Some(pointer_text) = decode_fragment(fragment) {
            if pointer_text.is_empty() || pointer_text.starts_with('/') {
                let pointer = Pointer::parse(&pointer_text).map_err(|e| ResolveError::Identifier {
                    reference: fragment.to_string(),
                    base: base_str.to_string(),
                    message: e.to_string(),
                })?;
                let location = Location::from_pointer(&pointer);
                let base_resource = self.resource(base_ref);
                if location.is_root() {
                    return Ok(ResolvedRef { target: base_ref, dynamic_anchor_name: None });
                }
                if let Some(&found) = base_resource.nested.get(&location) {
                    return Ok(ResolvedRef { target: (base_ref.0, found), dynamic_anchor_name: None });
                }
                // Raw-companion fallback: the pointer lands inside a
                // keyword this crate's resource walk doesn't enumerate.
                if let Some(value) = location.get(base_resource.schema.raw()) {
                    let schema = build::build(value)?;
                    return Ok(ResolvedRef { target: self.register_ephemeral(schema), dynamic_anchor_name: None });
                }
                return Err(ResolveError::UnknownFragment { base: base_str.to_string(), fragment: fragment.to_string() });
            }
        }

        let base_resource = self.resource(base_ref);
        if base_resource.self_anchor.as_deref() == Some(fragment) {
            return Ok(ResolvedRef { target: base_ref, dynamic_anchor_name: None });
        }
        if base_resource.dynamic_self_anchor.as_deref() == Some(fragment) {
            return Ok(ResolvedRef { target: base_ref, dynamic_anchor_name: Some(fragment.to_string()) });
        }
        match self.arena(base_ref.0).anchor(base_ref.1, fragment) {
            Some(Anchor::Static(id)) => Ok(ResolvedRef { target: (base_ref.0, id), dynamic_anchor_name: None }),
            Some(Anchor::Dynamic(id)) => {
                Ok(ResolvedRef { target: (base_ref.0, id), dynamic_anchor_name: Some(fragment.to_string()) })
            }
            None => Err(ResolveError::UnknownAnchor { base: base_str.to_string(), name: fragment.to_string() }),
        }
    }

    /// Looks for a `$dynamicAnchor` named `name` directly on `scope`
    /// (either as its own `dynamicSelfAnchor`, or hoisted into its anchor
    /// table from an anonymous descendant), without resolving anything
    /// relative to it. Used by the validator to walk the active Resource
    /// stack innermost-to-outermost.
    pub fn dynamic_anchor_in(&self, scope: ResourceRef, name: &str) -> Option<ResourceRef> {
        let resource = self.resource(scope);
        if resource.dynamic_self_anchor.as_deref() == Some(name) {
            return Some(scope);
        }
        match resource.anchors.get(name) {
            Some(Anchor::Dynamic(id)) => Some((scope.0, *id)),
            _ => None,
        }
    }
}

fn decode_fragment(fragment: &str) -> Option<String> {
    percent_encoding::percent_decode_str(fragment).decode_utf8().ok().map(|s| s.into_owned())
}
