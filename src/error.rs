//! Error taxonomy for the notation compiler.
//!
//! Every input error carries the structural [`Path`] from the document root to
//! the offending node. Unresolved references are not errors; they are reported
//! in [`crate::Parsed::unresolved`].
use std::fmt;
use thiserror::Error;

/// One step from a parent value into a child value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => f.write_str(k),
            Segment::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Segment {
    fn from(k: &str) -> Self { Segment::Key(k.to_string()) }
}

impl From<usize> for Segment {
    fn from(i: usize) -> Self { Segment::Index(i) }
}

/// Structural location inside a raw notation value, rendered as `a/b/0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn root() -> Self { Self::default() }

    /// A new path one step below `self`.
    pub fn child(&self, seg: impl Into<Segment>) -> Self {
        let mut segs = self.0.clone();
        segs.push(seg.into());
        Path(segs)
    }

    pub fn segments(&self) -> &[Segment] { &self.0 }
    pub fn depth(&self) -> usize { self.0.len() }
    pub fn is_root(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 { f.write_str("/")?; }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// `$type` without `$value` or the other way round.
    #[error("missing ${missing} property for $type/$value at {path}")]
    MissingCompanionProperty { missing: &'static str, path: Path },

    #[error("unknown property `{key}` at {path}")]
    UnknownProperty { key: String, path: Path },

    #[error("unknown base type `{base}` at {path}")]
    UnknownBaseKind { base: String, path: Path },

    #[error("mismatched base: expected {expected} but got {found} at {path}")]
    KindConflict { expected: String, found: String, path: Path },

    /// Fields or extra properties next to an array/multi shorthand or a type/value wrapper.
    #[error("{context} does not allow {what} at {path}")]
    MixedField { context: String, what: String, path: Path },

    #[error("name `{name}` is declared more than once at {path}")]
    NameCollision { name: String, path: Path },

    #[error("property `{property}` requires a companion $name at {path}")]
    OrphanAlias { property: &'static str, path: Path },

    #[error("name `{name}` is reserved for a base type at {path}")]
    ReservedNameReuse { name: String, path: Path },

    #[error("expected type \"type\" for $type/$value but got `{found}` at {path}")]
    TypeMismatch { found: String, path: Path },

    #[error("malformed value at {path}: {reason}")]
    MalformedValue { reason: String, path: Path },

    #[error("nesting deeper than {limit} levels at {path}")]
    DepthExceeded { limit: usize, path: Path },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The serializer's reference transform could not render a name.
    #[error("unknown type reference `{name}`")]
    UnknownReference { name: String },
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>, path: &Path) -> Self {
        Error::MalformedValue { reason: reason.into(), path: path.clone() }
    }

    /// Location of the error in the input, when it has one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Error::MissingCompanionProperty { path, .. }
            | Error::UnknownProperty { path, .. }
            | Error::UnknownBaseKind { path, .. }
            | Error::KindConflict { path, .. }
            | Error::MixedField { path, .. }
            | Error::NameCollision { path, .. }
            | Error::OrphanAlias { path, .. }
            | Error::ReservedNameReuse { path, .. }
            | Error::TypeMismatch { path, .. }
            | Error::MalformedValue { path, .. }
            | Error::DepthExceeded { path, .. } => Some(path),
            Error::InvalidConfig(_) | Error::UnknownReference { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
