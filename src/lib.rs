//! Compact JSON type notation: parse raw notation into a type graph and
//! serialize it back.
//!
//! ```
//! use schema_notation::{parse, Config};
//! use serde_json::json;
//!
//! let doc = parse(&json!({ "$name": "point", "x": "flt", "y": "f" })).unwrap();
//! assert_eq!(
//!     doc.to_value(&Config::default()).unwrap(),
//!     json!({ "$name": "point", "x": "flt", "y": "flt" }),
//! );
//! ```
pub mod alias;
pub mod base;
pub mod config;
pub mod emit;
pub mod error;
pub mod ir;
pub mod key;
pub mod norm;
pub mod path_de;
pub mod scan;
mod lower;

pub use alias::{BaseKind, NameForm, Prop};
pub use base::{Catalog, Resolver, TypeProps};
pub use config::{Allocation, Config};
pub use emit::{identity, serialize, serialize_ref};
pub use error::{Error, Path, Result, Segment};
pub use ir::{Meta, ObjectShape, Registry, Type, TypeKind, TypeRef};
pub use norm::{parse, parse_with, Parsed, Parser};
