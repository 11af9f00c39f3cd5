//! Static spelling tables.
//!
//! Every metadata property and every base kind has three spellings (short,
//! normal, long). All of them are accepted on input; the serializer picks one
//! according to [`NameForm`].
use std::collections::HashMap;
use std::fmt;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Prefix that marks a key as a type property rather than a field.
pub const MARKER: char = '$';

/// Spelling chosen when writing a property or base kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameForm {
    Short,
    #[default]
    Normal,
    Long,
}

impl NameForm {
    fn index(self) -> usize {
        match self {
            NameForm::Short => 0,
            NameForm::Normal => 1,
            NameForm::Long => 2,
        }
    }
}

// ------------------------------ Properties -------------------------------- //

/// Built-in metadata properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Prop {
    Name,
    Description,
    Stipulation,
    Base,
    Array,
    Multi,
    Type,
    Value,
    TinyName,
    FullName,
}

impl Prop {
    pub const ALL: [Prop; 10] = [
        Prop::Name, Prop::Description, Prop::Stipulation, Prop::Base, Prop::Array,
        Prop::Multi, Prop::Type, Prop::Value, Prop::TinyName, Prop::FullName,
    ];

    /// Name used in configuration (`include` / `exclude`).
    pub fn canonical(self) -> &'static str {
        match self {
            Prop::Name => "name",
            Prop::Description => "description",
            Prop::Stipulation => "stipulation",
            Prop::Base => "base",
            Prop::Array => "array",
            Prop::Multi => "multi",
            Prop::Type => "type",
            Prop::Value => "value",
            Prop::TinyName => "tinyName",
            Prop::FullName => "fullName",
        }
    }

    /// short, normal, long
    pub fn spellings(self) -> [&'static str; 3] {
        match self {
            Prop::Name => ["n", "name", "name"],
            Prop::Description => ["d", "desc", "description"],
            Prop::Stipulation => ["s", "stip", "stipulations"],
            Prop::Base => ["b", "base", "base"],
            Prop::Array => ["a", "arr", "array"],
            Prop::Multi => ["m", "mul", "multi"],
            Prop::Type => ["t", "type", "type"],
            Prop::Value => ["v", "value", "value"],
            Prop::TinyName => ["tn", "tinyname", "tinyname"],
            Prop::FullName => ["fn", "fullname", "fullname"],
        }
    }

    pub fn spelling(self, form: NameForm) -> &'static str {
        self.spellings()[form.index()]
    }

    /// Marker-prefixed key, e.g. `$desc`.
    pub fn key(self, form: NameForm) -> String {
        format!("{MARKER}{}", self.spelling(form))
    }

    /// Look up a spelling without its marker (`n`, `name`, ...).
    pub fn lookup(spelling: &str) -> Option<Prop> {
        PROPS_BY_SPELLING.get(spelling).copied()
    }

    /// Accepts the canonical name or any spelling.
    pub fn parse(s: &str) -> Option<Prop> {
        Prop::ALL.iter().copied().find(|p| p.canonical() == s).or_else(|| Prop::lookup(s))
    }

    /// The three name-declaring properties.
    pub fn declares_name(self) -> bool {
        matches!(self, Prop::Name | Prop::TinyName | Prop::FullName)
    }
}

impl fmt::Display for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

static PROPS_BY_SPELLING: Lazy<HashMap<&'static str, Prop>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for prop in Prop::ALL {
        for s in prop.spellings() {
            map.insert(s, prop);
        }
    }
    map
});

// ------------------------------ Base kinds -------------------------------- //

/// The fixed set of built-in type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BaseKind {
    Any,
    Array,
    Blob,
    Boolean,
    Byte,
    Decimal,
    Float,
    Integer,
    Multi,
    Number,
    Object,
    String,
    Type,
    True,
    False,
    Null,
}

impl BaseKind {
    pub const ALL: [BaseKind; 16] = [
        BaseKind::Any, BaseKind::Array, BaseKind::Blob, BaseKind::Boolean, BaseKind::Byte,
        BaseKind::Decimal, BaseKind::Float, BaseKind::Integer, BaseKind::Multi, BaseKind::Number,
        BaseKind::Object, BaseKind::String, BaseKind::Type, BaseKind::True, BaseKind::False,
        BaseKind::Null,
    ];

    /// short, normal, long
    pub fn spellings(self) -> [&'static str; 3] {
        match self {
            BaseKind::Any => ["*", "*", "any"],
            BaseKind::Array => ["a", "arr", "array"],
            BaseKind::Blob => ["X", "blb", "blob"],
            BaseKind::Boolean => ["b", "boo", "boolean"],
            BaseKind::Byte => ["x", "byt", "byte"],
            BaseKind::Decimal => ["d", "dec", "decimal"],
            BaseKind::Float => ["f", "flt", "float"],
            BaseKind::Integer => ["i", "int", "integer"],
            BaseKind::Multi => ["m", "mul", "multi"],
            BaseKind::Number => ["n", "num", "number"],
            BaseKind::Object => ["o", "obj", "object"],
            BaseKind::String => ["s", "str", "string"],
            BaseKind::Type => ["t", "typ", "type"],
            BaseKind::True => ["T", "tru", "true"],
            BaseKind::False => ["F", "fal", "false"],
            BaseKind::Null => ["N", "nul", "null"],
        }
    }

    pub fn spelling(self, form: NameForm) -> &'static str {
        self.spellings()[form.index()]
    }

    /// The normal spelling doubles as the canonical name.
    pub fn canonical(self) -> &'static str {
        self.spelling(NameForm::Normal)
    }

    pub fn lookup(spelling: &str) -> Option<BaseKind> {
        KINDS_BY_SPELLING.get(spelling).copied()
    }

    /// Kinds without structural children.
    pub fn is_scalar(self) -> bool {
        !matches!(self, BaseKind::Array | BaseKind::Object | BaseKind::Multi)
    }
}

impl fmt::Display for BaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

static KINDS_BY_SPELLING: Lazy<HashMap<&'static str, BaseKind>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for kind in BaseKind::ALL {
        for s in kind.spellings() {
            map.insert(s, kind);
        }
    }
    map
});

/// True if `name` is any spelling of a base kind.
pub fn is_reserved(name: &str) -> bool {
    BaseKind::lookup(name).is_some()
}
