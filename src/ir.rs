//! Type graph.
//!
//! Named types are owned by the [`Registry`]; every other occurrence of a
//! named type is a [`TypeRef::Name`]. Inline children are shared through
//! `Arc`, so the graph never contains a memory cycle even when the schema
//! itself is recursive.
use std::sync::Arc;
use indexmap::IndexMap;
use serde_json::Value;

use crate::alias::BaseKind;
use crate::error::{Error, Path, Result};
use crate::key::PatternKey;

/// Edge from a node to a child type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// Symbolic reference, looked up in a [`Registry`] or left unresolved.
    Name(String),
    Type(Arc<Type>),
}

impl TypeRef {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            TypeRef::Name(n) => Some(n),
            TypeRef::Type(_) => None,
        }
    }

    pub fn as_type(&self) -> Option<&Arc<Type>> {
        match self {
            TypeRef::Name(_) => None,
            TypeRef::Type(t) => Some(t),
        }
    }

    /// Follow a name reference through `registry`.
    pub fn resolve<'a>(&'a self, registry: &'a Registry) -> Option<&'a Arc<Type>> {
        match self {
            TypeRef::Name(n) => registry.get(n),
            TypeRef::Type(t) => Some(t),
        }
    }

    /// True for an inline, metadata-free scalar of `kind`.
    pub fn is_bare(&self, kind: BaseKind) -> bool {
        match self {
            TypeRef::Type(t) => t.kind == TypeKind::Scalar(kind) && t.meta.is_empty(),
            TypeRef::Name(_) => false,
        }
    }
}

impl From<Arc<Type>> for TypeRef {
    fn from(t: Arc<Type>) -> Self { TypeRef::Type(t) }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Scalar(BaseKind),
    /// Items repeat cyclically; a single `any` item is the generic array.
    Array { items: Vec<TypeRef> },
    Object(ObjectShape),
    /// Empty only for the catalog's generic multi; otherwise two or more.
    Multi { alternatives: Vec<TypeRef> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectShape {
    pub fields: IndexMap<String, TypeRef>,
    pub pattern_fields: IndexMap<String, TypeRef>,
    pub match_all: Option<TypeRef>,
}

impl ObjectShape {
    pub fn is_generic(&self) -> bool {
        self.fields.is_empty()
            && self.pattern_fields.is_empty()
            && self.match_all.as_ref().is_some_and(|t| t.is_bare(BaseKind::Any))
    }

    /// The declared type governing field `key`: fixed field, then the first
    /// matching pattern field, then the match-all field.
    pub fn field_for(&self, key: &str) -> Option<&TypeRef> {
        if let Some(t) = self.fields.get(key) {
            return Some(t);
        }
        self.pattern_fields
            .iter()
            .find(|(pat, _)| PatternKey::compile(pat).is_ok_and(|p| p.matches(key)))
            .map(|(_, t)| t)
            .or(self.match_all.as_ref())
    }
}

/// Descriptive properties of a node. None of these affect its shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    pub name: Option<String>,
    pub tiny_name: Option<String>,
    pub full_name: Option<String>,
    pub description: Option<String>,
    /// Opaque payload, carried verbatim.
    pub stipulation: Option<Value>,
    /// Caller-defined properties keyed by canonical name.
    pub custom: IndexMap<String, Value>,
}

impl Meta {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.tiny_name.is_none()
            && self.full_name.is_none()
            && self.description.is_none()
            && self.stipulation.is_none()
            && self.custom.is_empty()
    }

    /// All declared names (name, tiny name, full name) that are set.
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        [&self.name, &self.tiny_name, &self.full_name]
            .into_iter()
            .filter_map(|n| n.as_deref())
    }
}

#[derive(Debug, Clone)]
pub struct Type {
    pub kind: TypeKind,
    pub meta: Meta,
    /// Path of the enclosing type node. Only set when parent links are enabled.
    pub parent: Option<Path>,
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.meta == other.meta
    }
}

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Type { kind, meta: Meta::default(), parent: None }
    }

    pub fn base(&self) -> BaseKind {
        match &self.kind {
            TypeKind::Scalar(k) => *k,
            TypeKind::Array { .. } => BaseKind::Array,
            TypeKind::Object(_) => BaseKind::Object,
            TypeKind::Multi { .. } => BaseKind::Multi,
        }
    }

    pub fn name(&self) -> Option<&str> { self.meta.name.as_deref() }

    /// Shape equals the catalog default for this kind.
    pub fn is_generic(&self) -> bool {
        match &self.kind {
            TypeKind::Scalar(_) => true,
            TypeKind::Array { items } => items.len() == 1 && items[0].is_bare(BaseKind::Any),
            TypeKind::Object(shape) => shape.is_generic(),
            TypeKind::Multi { alternatives } => alternatives.is_empty(),
        }
    }

    /// True when no inline child is a composite node.
    pub fn is_leaf(&self) -> bool {
        let flat = |t: &TypeRef| match t {
            TypeRef::Name(_) => true,
            TypeRef::Type(t) => matches!(t.kind, TypeKind::Scalar(_)),
        };
        match &self.kind {
            TypeKind::Scalar(_) => true,
            TypeKind::Array { items } => items.iter().all(flat),
            TypeKind::Object(shape) => {
                shape.fields.values().all(flat)
                    && shape.pattern_fields.values().all(flat)
                    && shape.match_all.iter().all(flat)
            }
            TypeKind::Multi { alternatives } => alternatives.iter().all(flat),
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut TypeRef> {
        match &mut self.kind {
            TypeKind::Scalar(_) => Vec::new(),
            TypeKind::Array { items } => items.iter_mut().collect(),
            TypeKind::Object(shape) => shape
                .fields
                .values_mut()
                .chain(shape.pattern_fields.values_mut())
                .chain(shape.match_all.iter_mut())
                .collect(),
            TypeKind::Multi { alternatives } => alternatives.iter_mut().collect(),
        }
    }
}

// ------------------------------- Registry --------------------------------- //

/// Named types of one document, addressable by name, tiny name or full name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    types: IndexMap<String, Arc<Type>>,
    aliases: IndexMap<String, String>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    /// Register a named type. Any of its names already in use is a collision.
    pub fn insert(&mut self, ty: Arc<Type>, path: &Path) -> Result<()> {
        let Some(name) = ty.meta.name.clone() else {
            return Err(Error::malformed("only named types can be registered", path));
        };
        for n in ty.meta.declared_names() {
            if self.contains(n) {
                return Err(Error::NameCollision { name: n.to_string(), path: path.clone() });
            }
        }
        for alias in [&ty.meta.tiny_name, &ty.meta.full_name].into_iter().flatten() {
            if *alias != name {
                self.aliases.insert(alias.clone(), name.clone());
            }
        }
        self.types.insert(name, ty);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Type>> {
        self.types.get(self.canonical_name(name)?)
    }

    /// Map a name or alias to the registered name.
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.types.contains_key(name) {
            Some(name)
        } else {
            self.aliases.get(name).map(String::as_str)
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.canonical_name(name).is_some()
    }

    pub fn len(&self) -> usize { self.types.len() }
    pub fn is_empty(&self) -> bool { self.types.is_empty() }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Move every type of `other` into `self`. Nothing moves if any name collides.
    pub fn merge(&mut self, other: Registry) -> Result<()> {
        let clash = other.types.values().flat_map(|t| t.meta.declared_names()).find(|n| self.contains(n));
        if let Some(name) = clash {
            return Err(Error::NameCollision { name: name.to_string(), path: Path::root() });
        }
        for (_, ty) in other.types {
            self.insert(ty, &Path::root())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(kind: BaseKind) -> TypeRef {
        TypeRef::Type(Arc::new(Type::new(TypeKind::Scalar(kind))))
    }

    fn named(name: &str, tiny: Option<&str>) -> Arc<Type> {
        let mut t = Type::new(TypeKind::Scalar(BaseKind::Integer));
        t.meta.name = Some(name.into());
        t.meta.tiny_name = tiny.map(String::from);
        Arc::new(t)
    }

    #[test]
    fn registry_resolves_aliases_and_rejects_collisions() {
        let mut reg = Registry::new();
        reg.insert(named("count", Some("c")), &Path::root()).unwrap();
        assert!(reg.get("c").is_some());
        assert_eq!(reg.canonical_name("c"), Some("count"));

        let err = reg.insert(named("c", None), &Path::root()).unwrap_err();
        assert!(matches!(err, Error::NameCollision { ref name, .. } if name == "c"));
    }

    #[test]
    fn field_lookup_order() {
        let mut shape = ObjectShape::default();
        shape.fields.insert("id".into(), scalar(BaseKind::Integer));
        shape.pattern_fields.insert("x_*".into(), scalar(BaseKind::String));
        shape.match_all = Some(scalar(BaseKind::Boolean));

        assert_eq!(shape.field_for("id"), Some(&scalar(BaseKind::Integer)));
        assert_eq!(shape.field_for("x_1"), Some(&scalar(BaseKind::String)));
        assert_eq!(shape.field_for("other"), Some(&scalar(BaseKind::Boolean)));
    }

    #[test]
    fn equality_ignores_parent_links() {
        let mut a = Type::new(TypeKind::Scalar(BaseKind::String));
        let b = a.clone();
        a.parent = Some(Path::root().child("x"));
        assert_eq!(a, b);
    }
}
