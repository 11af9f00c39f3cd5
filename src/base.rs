//! Base type catalog.
//!
//! One immutable node per [`BaseKind`], plus the constructor that turns
//! normalized properties into a [`Type`]. The process-wide instance is built
//! once ([`Catalog::global`]) and only ever read afterwards.
use std::sync::Arc;
use indexmap::IndexMap;
use once_cell::sync::Lazy;

use crate::alias::BaseKind;
use crate::error::{Error, Path, Result};
use crate::ir::{Meta, ObjectShape, Type, TypeKind, TypeRef};

/// Resolves a symbolic type reference that is not declared in the document.
pub trait Resolver {
    fn resolve(&self, name: &str) -> Option<Arc<Type>>;
}

impl<F> Resolver for F
where
    F: Fn(&str) -> Option<Arc<Type>>,
{
    fn resolve(&self, name: &str) -> Option<Arc<Type>> {
        self(name)
    }
}

/// Normalized type properties, ready for [`Catalog::construct`].
#[derive(Debug, Clone, Default)]
pub struct TypeProps {
    /// `None` means object.
    pub base: Option<BaseKind>,
    pub meta: Meta,
    pub items: Option<Vec<TypeRef>>,
    pub alternatives: Option<Vec<TypeRef>>,
    pub fields: IndexMap<String, TypeRef>,
    pub pattern_fields: IndexMap<String, TypeRef>,
    pub match_all: Option<TypeRef>,
}

impl TypeProps {
    fn has_fields(&self) -> bool {
        !self.fields.is_empty() || !self.pattern_fields.is_empty() || self.match_all.is_some()
    }
}

static GLOBAL: Lazy<Catalog> = Lazy::new(Catalog::new);

#[derive(Debug)]
pub struct Catalog {
    // indexed by `BaseKind as usize`
    nodes: Vec<Arc<Type>>,
}

impl Catalog {
    pub fn new() -> Self {
        let any = Arc::new(Type::new(TypeKind::Scalar(BaseKind::Any)));
        let nodes = BaseKind::ALL
            .iter()
            .map(|&kind| match kind {
                BaseKind::Any => any.clone(),
                BaseKind::Array => Arc::new(Type::new(TypeKind::Array {
                    items: vec![TypeRef::Type(any.clone())],
                })),
                BaseKind::Object => Arc::new(Type::new(TypeKind::Object(ObjectShape {
                    match_all: Some(TypeRef::Type(any.clone())),
                    ..ObjectShape::default()
                }))),
                BaseKind::Multi => Arc::new(Type::new(TypeKind::Multi { alternatives: Vec::new() })),
                scalar => Arc::new(Type::new(TypeKind::Scalar(scalar))),
            })
            .collect();
        Catalog { nodes }
    }

    pub fn global() -> &'static Catalog {
        &GLOBAL
    }

    pub fn get(&self, kind: BaseKind) -> &Arc<Type> {
        &self.nodes[kind as usize]
    }

    pub fn any(&self) -> TypeRef {
        TypeRef::Type(self.get(BaseKind::Any).clone())
    }

    /// Look up any spelling of a base kind.
    pub fn lookup(&self, spelling: &str) -> Option<&Arc<Type>> {
        BaseKind::lookup(spelling).map(|k| self.get(k))
    }

    pub fn kinds(&self) -> impl Iterator<Item = BaseKind> {
        BaseKind::ALL.into_iter()
    }

    /// The catalog node equal to `ty`, if any.
    pub fn canonical(&self, ty: &Type) -> Option<&Arc<Type>> {
        let node = self.get(ty.base());
        (**node == *ty).then_some(node)
    }

    /// Build a node from normalized properties.
    ///
    /// Applies kind defaults (`[any]` items, `matchAll = any`) and collapses
    /// a single-alternative multi into that alternative.
    pub fn construct(&self, props: TypeProps, path: &Path) -> Result<TypeRef> {
        let base = props.base.unwrap_or(BaseKind::Object);
        if props.has_fields() && base != BaseKind::Object {
            return Err(Error::MixedField {
                context: format!("base `{base}`"),
                what: "fields".into(),
                path: path.clone(),
            });
        }
        for (given, implied) in [(props.items.is_some(), BaseKind::Array), (props.alternatives.is_some(), BaseKind::Multi)] {
            if given && base != implied {
                return Err(Error::KindConflict {
                    expected: implied.to_string(),
                    found: base.to_string(),
                    path: path.clone(),
                });
            }
        }
        if props.meta.name.is_none() {
            if props.meta.tiny_name.is_some() {
                return Err(Error::OrphanAlias { property: "tinyName", path: path.clone() });
            }
            if props.meta.full_name.is_some() {
                return Err(Error::OrphanAlias { property: "fullName", path: path.clone() });
            }
        }

        let has_fields = props.has_fields();
        let TypeProps { meta, items, alternatives, fields, pattern_fields, match_all, .. } = props;
        let kind = match base {
            BaseKind::Array => TypeKind::Array {
                items: items.filter(|v| !v.is_empty()).unwrap_or_else(|| vec![self.any()]),
            },
            BaseKind::Object => TypeKind::Object(ObjectShape {
                fields,
                pattern_fields,
                match_all: if has_fields { match_all } else { Some(self.any()) },
            }),
            BaseKind::Multi => {
                let mut alternatives = alternatives.unwrap_or_default();
                if alternatives.len() == 1 {
                    return collapse(alternatives.remove(0), meta, path);
                }
                TypeKind::Multi { alternatives }
            }
            scalar => TypeKind::Scalar(scalar),
        };
        Ok(TypeRef::Type(Arc::new(Type { kind, meta, parent: None })))
    }
}

impl Default for Catalog {
    fn default() -> Self { Self::new() }
}

impl Resolver for Catalog {
    fn resolve(&self, name: &str) -> Option<Arc<Type>> {
        self.lookup(name).cloned()
    }
}

/// A single-alternative multi is the alternative itself; its metadata, if
/// any, moves onto the alternative.
fn collapse(alt: TypeRef, meta: Meta, path: &Path) -> Result<TypeRef> {
    if meta.is_empty() {
        return Ok(alt);
    }
    let inner = match alt {
        TypeRef::Type(t) if t.meta.name.is_none() => t,
        _ => {
            return Err(Error::malformed(
                "a single-alternative $multi with type properties must wrap an unnamed type",
                path,
            ));
        }
    };
    let mut ty = (*inner).clone();
    if meta.stipulation.is_some() && ty.meta.stipulation.is_some() {
        return Err(Error::malformed("stipulation merging is not supported", path));
    }
    let Meta { name, tiny_name, full_name, description, stipulation, custom } = meta;
    ty.meta.name = name;
    ty.meta.tiny_name = tiny_name;
    ty.meta.full_name = full_name;
    ty.meta.description = description.or(ty.meta.description);
    ty.meta.stipulation = stipulation.or(ty.meta.stipulation);
    ty.meta.custom.extend(custom);
    Ok(TypeRef::Type(Arc::new(ty)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(kind: BaseKind) -> TypeRef {
        TypeRef::Type(Catalog::global().get(kind).clone())
    }

    #[test]
    fn catalog_generics() {
        let cat = Catalog::global();
        assert!(cat.get(BaseKind::Array).is_generic());
        assert!(cat.get(BaseKind::Object).is_generic());
        assert!(cat.get(BaseKind::Multi).is_generic());
        assert!(Arc::ptr_eq(cat.lookup("s").unwrap(), cat.lookup("string").unwrap()));
    }

    #[test]
    fn kinds_enumerate_every_node() {
        let cat = Catalog::global();
        let kinds: Vec<BaseKind> = cat.kinds().collect();
        assert_eq!(kinds.len(), 16);
        for kind in kinds {
            assert_eq!(cat.get(kind).base(), kind);
            assert!(cat.get(kind).meta.is_empty());
        }
    }

    #[test]
    fn construct_defaults_empty_shapes() {
        let cat = Catalog::global();
        let arr = cat
            .construct(TypeProps { base: Some(BaseKind::Array), items: Some(vec![]), ..TypeProps::default() }, &Path::root())
            .unwrap();
        assert_eq!(arr.as_type().map(|t| &**t), Some(&**cat.get(BaseKind::Array)));

        let obj = cat.construct(TypeProps::default(), &Path::root()).unwrap();
        assert_eq!(obj.as_type().map(|t| &**t), Some(&**cat.get(BaseKind::Object)));
    }

    #[test]
    fn construct_collapses_single_multi() {
        let cat = Catalog::global();
        let props = TypeProps {
            base: Some(BaseKind::Multi),
            alternatives: Some(vec![scalar(BaseKind::Integer)]),
            ..TypeProps::default()
        };
        assert_eq!(cat.construct(props, &Path::root()).unwrap(), scalar(BaseKind::Integer));

        let mut named = TypeProps {
            base: Some(BaseKind::Multi),
            alternatives: Some(vec![scalar(BaseKind::Integer)]),
            ..TypeProps::default()
        };
        named.meta.name = Some("count".into());
        let t = cat.construct(named, &Path::root()).unwrap();
        let t = t.as_type().unwrap();
        assert_eq!(t.kind, TypeKind::Scalar(BaseKind::Integer));
        assert_eq!(t.name(), Some("count"));
    }

    #[test]
    fn construct_rejects_fields_on_scalars() {
        let mut props = TypeProps { base: Some(BaseKind::String), ..TypeProps::default() };
        props.fields.insert("a".into(), scalar(BaseKind::Integer));
        let err = Catalog::global().construct(props, &Path::root()).unwrap_err();
        assert!(matches!(err, Error::MixedField { .. }));
    }
}
