//! Parse/serialize configuration.
use std::collections::BTreeSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::alias::{NameForm, Prop, MARKER};
use crate::error::{Error, Result};

/// How constructed nodes are allocated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Allocation {
    /// Every node is exclusively owned by its parent.
    #[default]
    FreshCopy,
    /// Structurally equal leaves are shared, including catalog nodes across documents.
    SharedInstance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    pub name_form: NameForm,
    /// When set, only these properties are emitted.
    pub include: Option<BTreeSet<String>>,
    /// Never emitted; wins over `include`.
    pub exclude: BTreeSet<String>,
    pub allocation: Allocation,
    /// Record the enclosing node's path on each constructed node.
    pub link_parents: bool,
    /// Extra metadata spellings (without marker) mapped to canonical names.
    pub custom_properties: IndexMap<String, String>,
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name_form: NameForm::Normal,
            include: None,
            exclude: BTreeSet::new(),
            allocation: Allocation::FreshCopy,
            link_parents: false,
            custom_properties: IndexMap::new(),
            max_depth: 256,
        }
    }
}

impl Config {
    pub fn with_name_form(mut self, form: NameForm) -> Self {
        self.name_form = form;
        self
    }

    pub fn excluding<I, S>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(props.into_iter().map(Into::into));
        self
    }

    /// Validate the configuration as a whole.
    pub fn validate(&self) -> Result<()> {
        if self.link_parents && self.allocation == Allocation::SharedInstance {
            return Err(Error::InvalidConfig(
                "linkParents requires freshCopy allocation: a shared node has no single parent".into(),
            ));
        }
        if self.max_depth == 0 {
            return Err(Error::InvalidConfig("maxDepth must be at least 1".into()));
        }
        for (spelling, canonical) in &self.custom_properties {
            let spelling = spelling.strip_prefix(MARKER).unwrap_or(spelling);
            if spelling.is_empty() || canonical.is_empty() {
                return Err(Error::InvalidConfig("custom property names must not be empty".into()));
            }
            if Prop::lookup(spelling).is_some() || Prop::parse(canonical).is_some() {
                return Err(Error::InvalidConfig(format!(
                    "custom property `{spelling}` -> `{canonical}` collides with a built-in property"
                )));
            }
        }
        let filtered = self.include.iter().flatten().chain(self.exclude.iter());
        for prop in filtered {
            if Prop::parse(prop).is_none() && !self.is_custom_canonical(prop) {
                return Err(Error::InvalidConfig(format!("unknown property `{prop}` in include/exclude")));
            }
        }
        Ok(())
    }

    /// Canonical name for a custom spelling or canonical name (marker already stripped).
    pub fn custom_property(&self, spelling: &str) -> Option<&str> {
        self.custom_properties
            .iter()
            .find(|(s, c)| s.strip_prefix(MARKER).unwrap_or(s) == spelling || *c == spelling)
            .map(|(_, c)| c.as_str())
    }

    fn is_custom_canonical(&self, name: &str) -> bool {
        self.custom_properties.values().any(|c| c == name)
    }

    /// Whether the serializer should emit property `canonical`.
    pub fn emits(&self, canonical: &str) -> bool {
        let matches = |set: &BTreeSet<String>| {
            set.iter().any(|p| p == canonical || Prop::parse(p).is_some_and(|p| p.canonical() == canonical))
        };
        if matches(&self.exclude) {
            return false;
        }
        self.include.as_ref().is_none_or(matches)
    }

    pub fn emits_prop(&self, prop: Prop) -> bool {
        self.emits(prop.canonical())
    }
}
