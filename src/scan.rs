//! Name pre-scan.
//!
//! A read-only pass over the raw notation that collects every declared name,
//! tiny name and full name before normalization starts, so references to a
//! type declared later in the document still resolve.
//!
//! Stipulations and custom properties are opaque and are not scanned.
use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::trace;

use crate::alias::{Prop, MARKER};
use crate::config::Config;
use crate::error::{Error, Path, Result};

/// Declared spelling → registered name.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: IndexMap<String, String>,
}

impl NameTable {
    pub fn scan(raw: &Value, config: &Config) -> Result<Self> {
        let mut table = NameTable::default();
        table.visit(raw, &Path::root(), config.max_depth)?;
        Ok(table)
    }

    /// The registered name a spelling refers to.
    pub fn resolve(&self, spelling: &str) -> Option<&str> {
        self.names.get(spelling).map(String::as_str)
    }

    pub fn len(&self) -> usize { self.names.len() }
    pub fn is_empty(&self) -> bool { self.names.is_empty() }

    fn visit(&mut self, v: &Value, path: &Path, max_depth: usize) -> Result<()> {
        if path.depth() > max_depth {
            return Err(Error::DepthExceeded { limit: max_depth, path: path.clone() });
        }
        match v {
            Value::Array(xs) => {
                for (i, x) in xs.iter().enumerate() {
                    self.visit(x, &path.child(i), max_depth)?;
                }
                Ok(())
            }
            Value::Object(m) => self.visit_object(m, path, max_depth),
            _ => Ok(()),
        }
    }

    fn visit_object(&mut self, m: &Map<String, Value>, path: &Path, max_depth: usize) -> Result<()> {
        let mut name = None;
        let mut aliases: Vec<(Prop, &str)> = Vec::new();

        for (k, v) in m {
            let Some(spelling) = k.strip_prefix(MARKER) else {
                self.visit(v, &path.child(k.as_str()), max_depth)?;
                continue;
            };
            match Prop::lookup(spelling) {
                Some(prop) if prop.declares_name() => {
                    let s = v.as_str().ok_or_else(|| {
                        Error::malformed(format!("${spelling} must be a string"), path)
                    })?;
                    if prop == Prop::Name {
                        name = Some(s);
                    } else {
                        aliases.push((prop, s));
                    }
                }
                Some(Prop::Array | Prop::Multi | Prop::Value) => {
                    self.visit(v, &path.child(k.as_str()), max_depth)?;
                }
                // opaque or unknown; the normalizer reports unknown keys
                _ => {}
            }
        }

        let Some(name) = name else {
            return match aliases.first() {
                Some((prop, _)) => Err(Error::OrphanAlias { property: prop.canonical(), path: path.clone() }),
                None => Ok(()),
            };
        };
        let mut declared = vec![name];
        declared.extend(aliases.iter().map(|(_, s)| *s).filter(|s| *s != name));
        for spelling in declared {
            if self.names.contains_key(spelling) {
                return Err(Error::NameCollision { name: spelling.to_string(), path: path.clone() });
            }
            trace!(name, spelling, %path, "declared");
            self.names.insert(spelling.to_string(), name.to_string());
        }
        Ok(())
    }
}
