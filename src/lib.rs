//! Schema-driven, two-way JSON casting.
//!
//! A [`SchemaRegistry`] holds named [`Ty`] graphs. [`cast`] parses wire JSON
//! and validates it against a named schema, renaming wire keys to internal
//! keys; [`uncast`] goes the other way and renders indented JSON. Any mismatch
//! aborts the call with a single [`Error`].
pub mod ir;
pub mod path;
pub mod error;
pub mod registry;
pub mod transform;
pub mod path_de;
pub mod cast;
pub mod schema_doc;
pub mod flight;
pub mod jq_exec;

pub use cast::{cast, cast_into, cast_value, uncast, uncast_from, uncast_value};
pub use error::{Error, SchemaError, ValidationError, ValidationErrorKind};
pub use ir::{Additional, Direction, FieldSpec, ObjectTy, PrimitiveKind, Ty};
pub use path::JsonPath;
pub use registry::{FieldIndex, SchemaRegistry};
pub use transform::Transformer;
