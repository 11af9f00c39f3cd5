//! Lowering of normalized properties into graph nodes.
//!
//! The builder owns the per-document [`Registry`] and applies the allocation
//! policy: fresh copies (optionally with parent links) or shared leaves.
use std::sync::Arc;
use tracing::trace;

use crate::base::{Catalog, TypeProps};
use crate::config::{Allocation, Config};
use crate::error::{Path, Result};
use crate::ir::{Registry, Type, TypeRef};

pub(crate) struct GraphBuilder<'a> {
    catalog: &'a Catalog,
    config: &'a Config,
    registry: Registry,
    // shared-instance mode only
    interned: Vec<Arc<Type>>,
}

impl<'a> GraphBuilder<'a> {
    pub(crate) fn new(catalog: &'a Catalog, config: &'a Config) -> Self {
        GraphBuilder { catalog, config, registry: Registry::new(), interned: Vec::new() }
    }

    /// Construct the node at `path` and return how its parent refers to it:
    /// by name when it is named, inline otherwise.
    pub(crate) fn build(&mut self, props: TypeProps, path: &Path, parent: Option<&Path>) -> Result<TypeRef> {
        match self.catalog.construct(props, path)? {
            TypeRef::Type(ty) => {
                let ty = self.place(ty, path, parent);
                match ty.meta.name.clone() {
                    Some(name) => {
                        self.register(ty, path)?;
                        Ok(TypeRef::Name(name))
                    }
                    None => Ok(TypeRef::Type(ty)),
                }
            }
            // a collapsed multi that was a bare name reference
            named => Ok(named),
        }
    }

    /// Add a named node to the document registry.
    pub(crate) fn register(&mut self, ty: Arc<Type>, path: &Path) -> Result<()> {
        trace!(name = ?ty.name(), %path, "registered");
        self.registry.insert(ty, path)
    }

    pub(crate) fn is_registered(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    /// Apply the allocation policy to a node about to be linked at `path`.
    pub(crate) fn place(&mut self, ty: Arc<Type>, path: &Path, parent: Option<&Path>) -> Arc<Type> {
        match self.config.allocation {
            Allocation::FreshCopy => detach(ty, path, parent, self.config.link_parents),
            Allocation::SharedInstance => self.share(ty),
        }
    }

    fn share(&mut self, ty: Arc<Type>) -> Arc<Type> {
        if let Some(node) = self.catalog.canonical(&ty) {
            return node.clone();
        }
        if ty.meta.name.is_some() || !ty.is_leaf() {
            return ty;
        }
        if let Some(node) = self.interned.iter().find(|n| ***n == *ty) {
            return node.clone();
        }
        self.interned.push(ty.clone());
        ty
    }

    pub(crate) fn into_registry(self) -> Registry {
        self.registry
    }
}

/// Give the node, and any inline child it shares with someone else, an
/// exclusive allocation. Children built for this node are already exclusive.
fn detach(ty: Arc<Type>, path: &Path, parent: Option<&Path>, link: bool) -> Arc<Type> {
    // moves out without copying when `ty` is already exclusive
    let mut node = Arc::unwrap_or_clone(ty);
    if link {
        node.parent = parent.cloned();
    }
    for child in node.children_mut() {
        if let TypeRef::Type(c) = child {
            if Arc::strong_count(c) > 1 {
                *c = detach(c.clone(), path, Some(path), link);
            }
        }
    }
    Arc::new(node)
}
