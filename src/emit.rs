//! Serialization: type graph → notation.
//!
//! The structural inverse of [`crate::norm`]. Defaults are elided so that
//! re-parsing the output yields the same graph:
//! - a scalar without visible properties is its bare kind spelling
//! - a generic array is `[]`, a generic object is `{}`
//! - `$base` appears only where the kind is not implied by the shape
use std::collections::HashSet;
use serde_json::{Map, Value};

use crate::alias::{BaseKind, Prop, MARKER};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ir::{Registry, Type, TypeKind, TypeRef};
use crate::key::WILDCARD;
use crate::norm::Parsed;

/// Reference transform that writes names as they are.
pub fn identity(name: &str) -> Option<Value> {
    Some(Value::String(name.to_string()))
}

/// Serialize one node. Name references go through `transform`.
pub fn serialize<F>(ty: &Type, transform: F, config: &Config) -> Result<Value>
where
    F: FnMut(&str) -> Option<Value>,
{
    config.validate()?;
    Emitter::new(config, transform).emit(ty)
}

pub fn serialize_ref<F>(r: &TypeRef, transform: F, config: &Config) -> Result<Value>
where
    F: FnMut(&str) -> Option<Value>,
{
    config.validate()?;
    Emitter::new(config, transform).emit_ref(r)
}

impl Parsed {
    /// The whole document: each named type is written out at its first
    /// reference, so parsing the result reproduces the registry.
    pub fn to_value(&self, config: &Config) -> Result<Value> {
        config.validate()?;
        let mut emitter = Emitter::new(config, identity);
        emitter.registry = Some(&self.registry);
        emitter.emit_ref(&self.root)
    }
}

struct Emitter<'a, F> {
    config: &'a Config,
    transform: F,
    // inline named types from here, once each
    registry: Option<&'a Registry>,
    emitted: HashSet<String>,
}

impl<'a, F> Emitter<'a, F>
where
    F: FnMut(&str) -> Option<Value>,
{
    fn new(config: &'a Config, transform: F) -> Self {
        Emitter { config, transform, registry: None, emitted: HashSet::new() }
    }

    fn emit_ref(&mut self, r: &TypeRef) -> Result<Value> {
        match r {
            TypeRef::Type(t) => self.emit(t),
            TypeRef::Name(n) => {
                if let Some(t) = self.registry.and_then(|reg| reg.get(n)) {
                    let name = t.name().unwrap_or(n);
                    if self.emitted.insert(name.to_string()) {
                        return self.emit(t);
                    }
                }
                (self.transform)(n).ok_or_else(|| Error::UnknownReference { name: n.clone() })
            }
        }
    }

    fn emit_all(&mut self, refs: &[TypeRef]) -> Result<Vec<Value>> {
        refs.iter().map(|r| self.emit_ref(r)).collect()
    }

    fn emit(&mut self, t: &Type) -> Result<Value> {
        let form = self.config.name_form;
        match &t.kind {
            TypeKind::Scalar(kind) => Ok(self.based(t, *kind)),
            TypeKind::Array { items } => {
                let generic = t.is_generic();
                let items = if generic { Vec::new() } else { self.emit_all(items)? };
                if !self.has_props(t) {
                    return Ok(Value::Array(items));
                }
                let mut m = Map::new();
                if generic {
                    m.insert(Prop::Base.key(form), BaseKind::Array.spelling(form).into());
                }
                self.copy_props(t, &mut m);
                if !generic {
                    m.insert(Prop::Array.key(form), Value::Array(items));
                }
                Ok(Value::Object(m))
            }
            TypeKind::Object(shape) => {
                let mut m = Map::new();
                self.copy_props(t, &mut m);
                if !shape.is_generic() {
                    for (k, v) in shape.fields.iter().chain(&shape.pattern_fields) {
                        let v = self.emit_ref(v)?;
                        m.insert(k.clone(), v);
                    }
                    if let Some(v) = &shape.match_all {
                        let v = self.emit_ref(v)?;
                        m.insert(WILDCARD.to_string(), v);
                    }
                }
                Ok(Value::Object(m))
            }
            TypeKind::Multi { alternatives } if alternatives.is_empty() => Ok(self.based(t, BaseKind::Multi)),
            TypeKind::Multi { alternatives } => {
                let alternatives = self.emit_all(alternatives)?;
                let mut m = Map::new();
                self.copy_props(t, &mut m);
                m.insert(Prop::Multi.key(form), Value::Array(alternatives));
                Ok(Value::Object(m))
            }
        }
    }

    /// Bare kind spelling, or `{$base: kind, ...props}`.
    fn based(&self, t: &Type, kind: BaseKind) -> Value {
        let form = self.config.name_form;
        if !self.has_props(t) {
            return Value::String(kind.spelling(form).to_string());
        }
        let mut m = Map::new();
        m.insert(Prop::Base.key(form), kind.spelling(form).into());
        self.copy_props(t, &mut m);
        Value::Object(m)
    }

    /// Any property that would be written. Tiny and full names ride on the name.
    fn has_props(&self, t: &Type) -> bool {
        let meta = &t.meta;
        (meta.name.is_some() && self.config.emits_prop(Prop::Name))
            || (meta.description.is_some() && self.config.emits_prop(Prop::Description))
            || (meta.stipulation.is_some() && self.config.emits_prop(Prop::Stipulation))
            || meta.custom.keys().any(|k| self.config.emits(k))
    }

    fn copy_props(&self, t: &Type, m: &mut Map<String, Value>) {
        let meta = &t.meta;
        let name_shown = self.put(m, Prop::Name, meta.name.as_ref().map(|s| Value::from(s.as_str())));
        self.put(m, Prop::Description, meta.description.as_ref().map(|s| Value::from(s.as_str())));
        if name_shown {
            for (prop, alias) in [(Prop::TinyName, &meta.tiny_name), (Prop::FullName, &meta.full_name)] {
                if alias.is_some() && *alias != meta.name {
                    self.put(m, prop, alias.as_ref().map(|s| Value::from(s.as_str())));
                }
            }
        }
        self.put(m, Prop::Stipulation, meta.stipulation.clone());
        for (k, v) in &meta.custom {
            if self.config.emits(k) {
                m.insert(format!("{MARKER}{k}"), v.clone());
            }
        }
    }

    fn put(&self, m: &mut Map<String, Value>, prop: Prop, v: Option<Value>) -> bool {
        match v {
            Some(v) if self.config.emits_prop(prop) => {
                m.insert(prop.key(self.config.name_form), v);
                true
            }
            _ => false,
        }
    }
}
