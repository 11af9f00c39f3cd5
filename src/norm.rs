//! Structural normalization: raw notation → type graph.
//!
//! Pipeline per document:
//! 1. [`NameTable::scan`] collects every declared name (forward references).
//! 2. [`Normalizer`] walks the raw value, classifies keys into type properties
//!    and fields, and hands normalized properties to the graph builder.
//! 3. The builder constructs nodes, registers named ones and returns name
//!    references in their place.
use std::sync::Arc;
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::alias::{self, BaseKind, Prop, MARKER};
use crate::base::{Catalog, Resolver, TypeProps};
use crate::config::Config;
use crate::error::{Error, Path, Result};
use crate::ir::{Meta, Registry, Type, TypeRef};
use crate::key::{self, KeyClass};
use crate::lower::GraphBuilder;
use crate::scan::NameTable;

/// Result of parsing one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    /// Inline root, or the name of the root type when it is named.
    pub root: TypeRef,
    pub registry: Registry,
    /// References that resolved neither in the document nor externally.
    pub unresolved: IndexSet<String>,
}

impl Parsed {
    /// The root node, following a name reference through the registry.
    pub fn root_type(&self) -> Option<&Arc<Type>> {
        self.root.resolve(&self.registry)
    }

    /// Second pass: settle unresolved names through `resolver`. Settled types
    /// are registered under the referenced name. On error nothing is settled.
    pub fn settle(&mut self, resolver: &dyn Resolver) -> Result<()> {
        let mut registry = self.registry.clone();
        let mut settled = Vec::new();
        for name in &self.unresolved {
            let Some(ty) = resolver.resolve(name) else { continue };
            let mut ty = Arc::unwrap_or_clone(ty);
            if !ty.meta.declared_names().any(|n| n == name.as_str()) {
                ty.meta.name = Some(name.clone());
                ty.meta.tiny_name = None;
                ty.meta.full_name = None;
            }
            registry.insert(Arc::new(ty), &Path::root())?;
            settled.push(name.clone());
        }
        self.registry = registry;
        for name in settled {
            trace!(%name, "settled");
            self.unresolved.shift_remove(&name);
        }
        Ok(())
    }

    /// Combine with another document: registries are merged (duplicate names
    /// collide) and references either document declares are no longer unresolved.
    /// On error `self` is left as it was.
    pub fn merge(&mut self, other: Parsed) -> Result<()> {
        self.registry.merge(other.registry)?;
        self.unresolved.extend(other.unresolved);
        let registry = &self.registry;
        self.unresolved.retain(|n| !registry.contains(n));
        Ok(())
    }
}

/// Parse with the global catalog and default configuration.
pub fn parse(raw: &Value) -> Result<Parsed> {
    Parser::new(Catalog::global()).parse(raw)
}

/// Parse with an external resolver consulted before the catalog.
pub fn parse_with(raw: &Value, resolver: &dyn Resolver) -> Result<Parsed> {
    Parser::new(Catalog::global()).with_resolver(resolver).parse(raw)
}

pub struct Parser<'a> {
    catalog: &'a Catalog,
    resolver: Option<&'a dyn Resolver>,
    config: Config,
}

impl<'a> Parser<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Parser { catalog, resolver: None, config: Config::default() }
    }

    pub fn with_resolver(mut self, resolver: &'a dyn Resolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn parse(&self, raw: &Value) -> Result<Parsed> {
        self.config.validate()?;
        let names = NameTable::scan(raw, &self.config)?;
        debug!(declared = names.len(), "names scanned");

        let mut norm = Normalizer {
            names: &names,
            catalog: self.catalog,
            resolver: self.resolver,
            config: &self.config,
            builder: GraphBuilder::new(self.catalog, &self.config),
            unresolved: IndexSet::new(),
        };
        let root = norm.normalize(raw, &Path::root(), None)?;
        let Normalizer { builder, unresolved, .. } = norm;
        let registry = builder.into_registry();
        debug!(types = registry.len(), unresolved = unresolved.len(), "document normalized");
        Ok(Parsed { root, registry, unresolved })
    }
}

// ------------------------------- Normalizer ------------------------------- //

struct Normalizer<'a> {
    names: &'a NameTable,
    catalog: &'a Catalog,
    resolver: Option<&'a dyn Resolver>,
    config: &'a Config,
    builder: GraphBuilder<'a>,
    unresolved: IndexSet<String>,
}

/// Keys of one map, split by role.
#[derive(Default)]
struct Classified<'v> {
    props: IndexMap<Prop, (&'v str, &'v Value)>,
    custom: IndexMap<String, Value>,
    fields: Vec<(&'v str, &'v Value)>,
    /// `$array` or `$multi`, whichever is present
    shorthand: Option<Prop>,
}

impl<'a> Normalizer<'a> {
    /// `path` is where `v` sits; `parent` is the path of the enclosing node.
    fn normalize(&mut self, v: &Value, path: &Path, parent: Option<&Path>) -> Result<TypeRef> {
        if path.depth() > self.config.max_depth {
            return Err(Error::DepthExceeded { limit: self.config.max_depth, path: path.clone() });
        }
        match v {
            Value::String(s) => self.reference(s, path, parent),
            Value::Array(xs) => {
                let items = self.sequence(xs, path, path)?;
                let props = TypeProps { base: Some(BaseKind::Array), items: Some(items), ..TypeProps::default() };
                self.builder.build(props, path, parent)
            }
            Value::Object(m) => self.object(m, path, parent),
            other => Err(Error::malformed(format!("expected a type but got {}", describe(other)), path)),
        }
    }

    /// Items of a sequence at `at`, owned by the node at `node`.
    fn sequence(&mut self, xs: &[Value], at: &Path, node: &Path) -> Result<Vec<TypeRef>> {
        xs.iter()
            .enumerate()
            .map(|(i, x)| self.normalize(x, &at.child(i), Some(node)))
            .collect()
    }

    /// Document names first, then the external resolver, then the catalog.
    fn reference(&mut self, s: &str, path: &Path, parent: Option<&Path>) -> Result<TypeRef> {
        if s.is_empty() {
            return Err(Error::malformed("empty type reference", path));
        }
        if let Some(name) = self.names.resolve(s) {
            return Ok(TypeRef::Name(name.to_string()));
        }
        if let Some(ty) = self.lookup(s) {
            let Some(name) = ty.meta.name.clone() else {
                return Ok(TypeRef::Type(self.builder.place(ty, path, parent)));
            };
            if let Some(local) = self.names.resolve(&name) {
                return Ok(TypeRef::Name(local.to_string()));
            }
            // external named types join the document registry at first use
            if !self.builder.is_registered(&name) {
                trace!(%name, reference = s, %path, "adopted");
                let ty = self.builder.place(ty, path, parent);
                self.builder.register(ty, path)?;
            }
            return Ok(TypeRef::Name(name));
        }
        trace!(reference = s, %path, "unresolved");
        self.unresolved.insert(s.to_string());
        Ok(TypeRef::Name(s.to_string()))
    }

    fn lookup(&self, s: &str) -> Option<Arc<Type>> {
        self.resolver
            .and_then(|r| r.resolve(s))
            .or_else(|| self.catalog.resolve(s))
    }

    fn classify<'v>(&self, m: &'v Map<String, Value>, path: &Path) -> Result<Classified<'v>> {
        let mut out = Classified::default();
        for (k, v) in m {
            let Some(spelling) = k.strip_prefix(MARKER) else {
                out.fields.push((k.as_str(), v));
                continue;
            };
            if let Some(prop) = Prop::lookup(spelling) {
                if out.props.contains_key(&prop) {
                    return Err(Error::malformed(format!("property `{prop}` is given more than once"), path));
                }
                if matches!(prop, Prop::Array | Prop::Multi) {
                    if let Some(prev) = out.shorthand {
                        return Err(Error::KindConflict {
                            expected: implied_kind(prev).to_string(),
                            found: implied_kind(prop).to_string(),
                            path: path.clone(),
                        });
                    }
                    out.shorthand = Some(prop);
                }
                out.props.insert(prop, (k.as_str(), v));
            } else if let Some(canonical) = self.config.custom_property(spelling) {
                out.custom.insert(canonical.to_string(), v.clone());
            } else {
                return Err(Error::UnknownProperty { key: k.clone(), path: path.clone() });
            }
        }
        Ok(out)
    }

    fn object(&mut self, m: &Map<String, Value>, path: &Path, parent: Option<&Path>) -> Result<TypeRef> {
        let c = self.classify(m, path)?;
        if c.props.contains_key(&Prop::Type) || c.props.contains_key(&Prop::Value) {
            return self.type_value(c, path, parent);
        }

        let base = match c.props.get(&Prop::Base) {
            Some((key, v)) => {
                let s = v.as_str().ok_or_else(|| Error::malformed(format!("{key} must be a string"), path))?;
                let kind = BaseKind::lookup(s)
                    .ok_or_else(|| Error::UnknownBaseKind { base: s.to_string(), path: path.clone() })?;
                Some(kind)
            }
            None => None,
        };
        let implied = c.shorthand.map(implied_kind);
        if let (Some(base), Some(implied)) = (base, implied) {
            if base != implied {
                return Err(Error::KindConflict {
                    expected: implied.to_string(),
                    found: base.to_string(),
                    path: path.clone(),
                });
            }
        }
        let kind = implied.or(base).unwrap_or(BaseKind::Object);
        if kind != BaseKind::Object && !c.fields.is_empty() {
            return Err(Error::MixedField {
                context: format!("base `{kind}`"),
                what: "custom (non-$) fields".into(),
                path: path.clone(),
            });
        }

        let mut props = TypeProps { base: Some(kind), meta: self.meta(&c, path)?, ..TypeProps::default() };

        if let Some(shorthand) = c.shorthand {
            let (key, v) = c.props[&shorthand];
            let Value::Array(xs) = v else {
                return Err(Error::malformed(format!("{key} must be a sequence of types"), path));
            };
            let list = self.sequence(xs, &path.child(key), path)?;
            if shorthand == Prop::Array {
                props.items = Some(list);
            } else if list.is_empty() {
                return Err(Error::malformed(format!("{key} needs at least one alternative"), path));
            } else {
                props.alternatives = Some(list);
            }
        }

        for (k, v) in &c.fields {
            let t = self.normalize(v, &path.child(*k), Some(path))?;
            match key::classify(k) {
                KeyClass::Fixed => { props.fields.insert(k.to_string(), t); }
                KeyClass::Pattern => { props.pattern_fields.insert(k.to_string(), t); }
                KeyClass::MatchAll => props.match_all = Some(t),
            }
        }

        self.builder.build(props, path, parent)
    }

    /// `{$type: "type", $value: X}` stands for `X` itself.
    fn type_value(&mut self, c: Classified<'_>, path: &Path, parent: Option<&Path>) -> Result<TypeRef> {
        let Some(&(_, ty)) = c.props.get(&Prop::Type) else {
            return Err(Error::MissingCompanionProperty { missing: "type", path: path.clone() });
        };
        let Some(&(value_key, value)) = c.props.get(&Prop::Value) else {
            return Err(Error::MissingCompanionProperty { missing: "value", path: path.clone() });
        };
        if c.props.len() > 2 || !c.custom.is_empty() {
            return Err(Error::MixedField {
                context: "$type/$value form".into(),
                what: "other type properties".into(),
                path: path.clone(),
            });
        }
        if !c.fields.is_empty() {
            return Err(Error::MixedField {
                context: "$type/$value form".into(),
                what: "custom (non-$) fields".into(),
                path: path.clone(),
            });
        }
        let is_type = ty
            .as_str()
            .and_then(|s| self.lookup(s))
            .is_some_and(|t| t.base() == BaseKind::Type);
        if !is_type {
            return Err(Error::TypeMismatch { found: ty.to_string(), path: path.clone() });
        }
        self.normalize(value, &path.child(value_key), parent)
    }

    fn meta(&self, c: &Classified<'_>, path: &Path) -> Result<Meta> {
        let text = |prop: Prop| -> Result<Option<String>> {
            match c.props.get(&prop) {
                None => Ok(None),
                Some((_, Value::String(s))) if !s.is_empty() => Ok(Some(s.clone())),
                Some((key, _)) => Err(Error::malformed(format!("{key} must be a non-empty string"), path)),
            }
        };
        let meta = Meta {
            name: text(Prop::Name)?,
            tiny_name: text(Prop::TinyName)?,
            full_name: text(Prop::FullName)?,
            description: text(Prop::Description)?,
            stipulation: c.props.get(&Prop::Stipulation).map(|(_, v)| *v).filter(|v| !v.is_null()).cloned(),
            custom: c.custom.clone(),
        };
        if meta.name.is_none() {
            if meta.tiny_name.is_some() {
                return Err(Error::OrphanAlias { property: "tinyName", path: path.clone() });
            }
            if meta.full_name.is_some() {
                return Err(Error::OrphanAlias { property: "fullName", path: path.clone() });
            }
        }
        if let Some(reserved) = meta.declared_names().find(|n| alias::is_reserved(n)) {
            return Err(Error::ReservedNameReuse { name: reserved.to_string(), path: path.clone() });
        }
        Ok(meta)
    }
}

fn implied_kind(shorthand: Prop) -> BaseKind {
    if shorthand == Prop::Array { BaseKind::Array } else { BaseKind::Multi }
}

fn describe(v: &Value) -> String {
    match v {
        Value::Null => "null".into(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(_) => "an array".into(),
        Value::Object(_) => "an object".into(),
    }
}
